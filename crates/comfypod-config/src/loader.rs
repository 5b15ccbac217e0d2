//! Environment parsing for [`PodConfig`].

use std::path::PathBuf;

use url::Url;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    CivitaiSettings, LogSettings, PodConfig, PodLayout, ServerCommand, SetupSettings,
};

/// Environment variable names read by the loader.
pub mod env_keys {
    /// Bearer credential for CivitAI lookups and downloads.
    pub const CIVITAI_TOKEN: &str = "CIVITAI_TOKEN";
    /// CivitAI API base URL.
    pub const CIVITAI_API_URL: &str = "CIVITAI_API_URL";
    /// HTTP timeout in seconds.
    pub const HTTP_TIMEOUT_SECS: &str = "COMFYPOD_HTTP_TIMEOUT_SECS";
    /// ComfyUI checkout directory.
    pub const COMFYUI_DIR: &str = "COMFYUI_DIR";
    /// LoRA destination directory.
    pub const LORA_DIR: &str = "COMFYPOD_LORA_DIR";
    /// PID record path.
    pub const PID_FILE: &str = "COMFYPOD_PID_FILE";
    /// Server log path.
    pub const LOG_FILE: &str = "COMFYPOD_LOG_FILE";
    /// Interpreter used to launch the server.
    pub const PYTHON: &str = "COMFYPOD_PYTHON";
    /// Whitespace-separated server arguments.
    pub const SERVER_ARGS: &str = "COMFYPOD_SERVER_ARGS";
    /// Comma-separated identifiers downloaded during setup.
    pub const LORA_IDS: &str = "LORA_IDS";
    /// Advisory wait after launching the server.
    pub const START_GRACE_SECS: &str = "COMFYPOD_START_GRACE_SECS";
    /// Log filter directive.
    pub const LOG_LEVEL: &str = "COMFYPOD_LOG_LEVEL";
    /// Log output format.
    pub const LOG_FORMAT: &str = "COMFYPOD_LOG_FORMAT";
}

impl PodConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a numeric or URL setting
    /// cannot be parsed.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a numeric or URL setting
    /// cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let comfyui_dir = get(env_keys::COMFYUI_DIR)
            .map_or_else(|| PathBuf::from(defaults::COMFYUI_DIR), PathBuf::from);
        let lora_dir = get(env_keys::LORA_DIR)
            .map_or_else(|| comfyui_dir.join(defaults::LORA_SUBDIR), PathBuf::from);
        let layout = PodLayout {
            lora_dir,
            pid_file: PathBuf::from(
                get(env_keys::PID_FILE).unwrap_or_else(|| defaults::PID_FILE.to_string()),
            ),
            log_file: PathBuf::from(
                get(env_keys::LOG_FILE).unwrap_or_else(|| defaults::LOG_FILE.to_string()),
            ),
            comfyui_dir,
        };

        let args = get(env_keys::SERVER_ARGS).map_or_else(
            || defaults::SERVER_ARGS.iter().map(ToString::to_string).collect(),
            |raw| raw.split_whitespace().map(str::to_string).collect(),
        );
        let server = ServerCommand {
            program: get(env_keys::PYTHON).unwrap_or_else(|| defaults::PYTHON.to_string()),
            args,
            working_dir: layout.comfyui_dir.clone(),
        };

        let api_raw =
            get(env_keys::CIVITAI_API_URL).unwrap_or_else(|| defaults::CIVITAI_API_URL.to_string());
        let api_url = parse_api_url(&api_raw)?;
        let civitai = CivitaiSettings {
            api_url,
            token: get(env_keys::CIVITAI_TOKEN),
            timeout_secs: parse_secs(
                env_keys::HTTP_TIMEOUT_SECS,
                get(env_keys::HTTP_TIMEOUT_SECS),
                defaults::HTTP_TIMEOUT_SECS,
            )?,
        };

        let setup = SetupSettings {
            lora_ids: get(env_keys::LORA_IDS),
            start_grace_secs: parse_secs(
                env_keys::START_GRACE_SECS,
                get(env_keys::START_GRACE_SECS),
                defaults::START_GRACE_SECS,
            )?,
        };

        let log = LogSettings {
            level: get(env_keys::LOG_LEVEL)
                .unwrap_or_else(|| defaults::LOG_LEVEL.to_string()),
            format: get(env_keys::LOG_FORMAT),
        };

        Ok(Self {
            layout,
            server,
            civitai,
            setup,
            log,
        })
    }
}

fn parse_secs(field: &'static str, raw: Option<String>, default: u64) -> ConfigResult<u64> {
    raw.map_or(Ok(default), |value| {
        value
            .parse::<u64>()
            .map_err(|_| ConfigError::invalid(field, "expected a non-negative integer", &value))
    })
}

// A trailing slash keeps `Url::join` from dropping the last path segment.
fn parse_api_url(raw: &str) -> ConfigResult<Url> {
    let normalised = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&normalised)
        .map_err(|_| ConfigError::invalid(env_keys::CIVITAI_API_URL, "invalid URL", raw))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::invalid(
            env_keys::CIVITAI_API_URL,
            "URL cannot be used as a base",
            raw,
        ));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> ConfigResult<PodConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        PodConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() -> ConfigResult<()> {
        let config = load(&[])?;
        assert_eq!(config.layout.comfyui_dir, PathBuf::from("/workspace/ComfyUI"));
        assert_eq!(
            config.layout.lora_dir,
            PathBuf::from("/workspace/ComfyUI/models/loras")
        );
        assert_eq!(config.layout.pid_file, PathBuf::from(defaults::PID_FILE));
        assert_eq!(config.layout.log_file, PathBuf::from(defaults::LOG_FILE));
        assert_eq!(config.server.program, "python3");
        assert_eq!(
            config.server.args,
            vec!["main.py", "--listen", "--use-sage-attention"]
        );
        assert_eq!(config.server.working_dir, config.layout.comfyui_dir);
        assert_eq!(config.civitai.api_url.as_str(), "https://civitai.com/api/v1/");
        assert_eq!(config.civitai.token, None);
        assert_eq!(config.civitai.timeout_secs, defaults::HTTP_TIMEOUT_SECS);
        assert_eq!(config.setup.lora_ids, None);
        assert_eq!(config.setup.start_grace_secs, defaults::START_GRACE_SECS);
        assert_eq!(config.log.level, "warn");
        Ok(())
    }

    #[test]
    fn lora_dir_follows_comfyui_dir_unless_overridden() -> ConfigResult<()> {
        let config = load(&[("COMFYUI_DIR", "/opt/comfy")])?;
        assert_eq!(config.layout.lora_dir, PathBuf::from("/opt/comfy/models/loras"));

        let config = load(&[("COMFYUI_DIR", "/opt/comfy"), ("COMFYPOD_LORA_DIR", "/data/loras")])?;
        assert_eq!(config.layout.lora_dir, PathBuf::from("/data/loras"));
        Ok(())
    }

    #[test]
    fn blank_token_is_treated_as_missing() -> ConfigResult<()> {
        let config = load(&[("CIVITAI_TOKEN", "   ")])?;
        assert_eq!(config.civitai.token, None);

        let config = load(&[("CIVITAI_TOKEN", " abc ")])?;
        assert_eq!(config.civitai.token.as_deref(), Some("abc"));
        Ok(())
    }

    #[test]
    fn server_args_split_on_whitespace() -> ConfigResult<()> {
        let config = load(&[("COMFYPOD_SERVER_ARGS", "main.py  --port 8189\t--listen")])?;
        assert_eq!(config.server.args, vec!["main.py", "--port", "8189", "--listen"]);
        Ok(())
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = load(&[("COMFYPOD_HTTP_TIMEOUT_SECS", "soon")]).expect_err("invalid timeout");
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                field: env_keys::HTTP_TIMEOUT_SECS,
                reason: "expected a non-negative integer",
                value: "soon".to_string(),
            }
        );
        assert!(err.detail().contains("COMFYPOD_HTTP_TIMEOUT_SECS"));
    }

    #[test]
    fn api_url_gains_trailing_slash() -> ConfigResult<()> {
        let config = load(&[("CIVITAI_API_URL", "http://127.0.0.1:9000/api/v1")])?;
        assert_eq!(config.civitai.api_url.as_str(), "http://127.0.0.1:9000/api/v1/");
        let joined = config
            .civitai
            .api_url
            .join("models/12")
            .map_err(|_| ConfigError::invalid("test", "join", "models/12"))?;
        assert_eq!(joined.as_str(), "http://127.0.0.1:9000/api/v1/models/12");
        Ok(())
    }

    #[test]
    fn invalid_api_url_is_rejected() {
        let err = load(&[("CIVITAI_API_URL", "not a url")]).expect_err("invalid URL");
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "CIVITAI_API_URL"));
    }

    #[test]
    fn serialised_config_redacts_token() -> Result<(), serde_json::Error> {
        let config = load(&[("CIVITAI_TOKEN", "secret-token")]).expect("valid config");
        let rendered = serde_json::to_string(&config)?;
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
        Ok(())
    }

    #[test]
    fn serialised_config_renders_api_url_as_string() -> Result<(), serde_json::Error> {
        let config = load(&[("CIVITAI_API_URL", "https://mirror.example/api/v1")])
            .expect("valid config");
        let value = serde_json::to_value(&config)?;
        assert_eq!(
            value["civitai"]["api_url"],
            "https://mirror.example/api/v1/"
        );
        Ok(())
    }
}
