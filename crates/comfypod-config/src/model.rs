//! Typed settings assembled from the environment.

use std::path::PathBuf;

use serde::{Serialize, Serializer};
use url::Url;

/// Fully resolved pod configuration.
#[derive(Debug, Clone, Serialize)]
pub struct PodConfig {
    /// Filesystem layout of the pod.
    pub layout: PodLayout,
    /// How the inference server is launched.
    pub server: ServerCommand,
    /// CivitAI access settings.
    pub civitai: CivitaiSettings,
    /// Setup routine inputs.
    pub setup: SetupSettings,
    /// Logging settings.
    pub log: LogSettings,
}

/// Filesystem locations used by the supervisor and the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodLayout {
    /// ComfyUI checkout; the server runs from here.
    pub comfyui_dir: PathBuf,
    /// Destination for downloaded LoRA weights.
    pub lora_dir: PathBuf,
    /// PID record of the supervised server.
    pub pid_file: PathBuf,
    /// Append-only server log.
    pub log_file: PathBuf,
}

/// Command line used to start the inference server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory of the launched process.
    pub working_dir: PathBuf,
}

/// CivitAI API access.
#[derive(Debug, Clone, Serialize)]
pub struct CivitaiSettings {
    /// API base, e.g. `https://civitai.com/api/v1`.
    pub api_url: Url,
    /// Bearer credential; `None` when unset or blank.
    #[serde(serialize_with = "redact")]
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Inputs for the provisioning routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupSettings {
    /// Raw comma-separated identifier list (`LORA_IDS`).
    pub lora_ids: Option<String>,
    /// Advisory wait after launching the server.
    pub start_grace_secs: u64,
}

/// Logging settings; `RUST_LOG` still overrides `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogSettings {
    /// Filter directive.
    pub level: String,
    /// `pretty` or `json`; `None` lets the build decide.
    pub format: Option<String>,
}

#[allow(clippy::ref_option)]
fn redact<S: Serializer>(token: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match token {
        Some(_) => serializer.serialize_str("<redacted>"),
        None => serializer.serialize_none(),
    }
}
