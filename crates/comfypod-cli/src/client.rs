//! Shared error type, configuration loading, and logging wiring for the CLIs.

use std::fmt::{self, Display, Formatter};
use std::future::Future;

use anyhow::anyhow;
use comfypod_config::{LogSettings, PodConfig};
use comfypod_fetcher::{AssetStore, CivitaiClient, FetchError, Fetcher};
use comfypod_telemetry::{LogFormat, LoggingConfig, command_span, init_logging};
use tracing::Instrument;

pub(crate) const MISSING_TOKEN: &str = "CivitAI token is required (set CIVITAI_TOKEN)";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::MissingCredential => Self::validation(MISSING_TOKEN),
            other => Self::failure(anyhow!(other.detail())),
        }
    }
}

/// Load configuration; malformed settings are a usage problem.
pub(crate) fn load_config() -> CliResult<PodConfig> {
    PodConfig::from_env().map_err(|err| CliError::validation(err.detail()))
}

/// Install the tracing subscriber described by `settings`.
///
/// A subscriber that cannot be installed leaves the command running without
/// logs rather than failing it.
pub(crate) fn init_telemetry(settings: &LogSettings) {
    let format = settings
        .format
        .as_deref()
        .and_then(LogFormat::parse)
        .unwrap_or_else(LogFormat::infer);
    let config = LoggingConfig {
        level: &settings.level,
        format,
    };
    if let Err(err) = init_logging(&config) {
        eprintln!("warning: logging unavailable: {err:#}");
    }
}

/// Fetcher for the configured API endpoint and LoRA directory.
pub(crate) fn build_fetcher(config: &PodConfig) -> CliResult<Fetcher> {
    let client = CivitaiClient::from_settings(&config.civitai)?;
    Ok(Fetcher::new(
        client,
        AssetStore::new(config.layout.lora_dir.clone()),
    ))
}

/// Load configuration, initialise logging, and run `handler` inside a command
/// span. Returns the process exit code.
pub(crate) async fn execute<F, Fut>(command: &'static str, handler: F) -> i32
where
    F: FnOnce(PodConfig) -> Fut,
    Fut: Future<Output = CliResult<()>>,
{
    let result = match load_config() {
        Ok(config) => {
            init_telemetry(&config.log);
            handler(config).instrument(command_span(command)).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}
