//! Pod bootstrap: LoRA directory, configured downloads, optional server start.

use std::time::Duration;

use comfypod_config::PodConfig;
use comfypod_fetcher::{Batch, Fetcher};
use comfypod_supervisor::{Launcher, ProcessTable, RecordStore, StartOutcome, Supervisor};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::cli::{OutputFormat, SetupArgs};
use crate::client::CliResult;
use crate::commands::control::supervisor_failure;
use crate::output::{describe_start, describe_status, render_batch_report};

/// Failed downloads are reported but do not stop the server from starting.
pub(crate) async fn handle_setup<S, P, L>(
    config: &PodConfig,
    fetcher: &Fetcher,
    supervisor: &Supervisor<S, P, L>,
    args: SetupArgs,
) -> CliResult<()>
where
    S: RecordStore,
    P: ProcessTable,
    L: Launcher,
{
    fetcher.store().ensure_dir()?;
    println!("LoRA directory: {}", fetcher.store().root().display());

    download_configured(config, fetcher).await?;

    if args.start {
        let outcome = supervisor.start().map_err(supervisor_failure)?;
        println!("{}", describe_start(&outcome));
        if matches!(outcome, StartOutcome::Started { .. }) {
            let grace = Duration::from_secs(config.setup.start_grace_secs);
            info!(grace_secs = grace.as_secs(), "waiting for server to settle");
            sleep(grace).await;
        }
        let status = supervisor.status().map_err(supervisor_failure)?;
        println!("{}", describe_status(&status));
    }
    Ok(())
}

async fn download_configured(config: &PodConfig, fetcher: &Fetcher) -> CliResult<()> {
    let batch = config
        .setup
        .lora_ids
        .as_deref()
        .map(Batch::parse)
        .unwrap_or_default();
    if batch.is_empty() {
        info!("no LORA_IDS configured; skipping downloads");
        return Ok(());
    }
    let Some(token) = config.civitai.token.as_deref() else {
        warn!(count = batch.len(), "CIVITAI_TOKEN not set; skipping LoRA downloads");
        println!("CIVITAI_TOKEN not set; skipped {} LoRA downloads", batch.len());
        return Ok(());
    };

    let report = fetcher.download_batch(&batch, token).await?;
    render_batch_report(&report, OutputFormat::Table)?;
    if !report.all_succeeded() {
        warn!(failed = report.failed(), "some LoRA downloads failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use comfypod_config::env_keys;
    use comfypod_fetcher::{AssetStore, CivitaiClient};
    use comfypod_supervisor::{
        CommandLauncher, FileRecordStore, ServerStatus, SystemProcessTable, SystemSupervisor,
    };
    use comfypod_test_support::civitai::model_body;
    use comfypod_test_support::fixtures::scratch_dir;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    fn config(dir: &Path, server: &MockServer, extra: &[(&str, &str)]) -> Result<PodConfig> {
        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert(env_keys::COMFYUI_DIR.into(), dir.display().to_string());
        vars.insert(
            env_keys::PID_FILE.into(),
            dir.join("comfyui.pid").display().to_string(),
        );
        vars.insert(
            env_keys::LOG_FILE.into(),
            dir.join("comfyui.log").display().to_string(),
        );
        vars.insert(
            env_keys::CIVITAI_API_URL.into(),
            format!("{}/api/v1", server.base_url()),
        );
        vars.insert(env_keys::PYTHON.into(), "sleep".into());
        vars.insert(env_keys::SERVER_ARGS.into(), "30".into());
        vars.insert(env_keys::START_GRACE_SECS.into(), "0".into());
        for (key, value) in extra {
            vars.insert((*key).to_string(), (*value).to_string());
        }
        Ok(PodConfig::from_lookup(|key| vars.get(key).cloned())?)
    }

    fn parts(config: &PodConfig) -> Result<(Fetcher, SystemSupervisor)> {
        let client = CivitaiClient::new(config.civitai.api_url.clone(), Duration::from_secs(5))?;
        let fetcher = Fetcher::new(client, AssetStore::new(config.layout.lora_dir.clone()));
        let supervisor = Supervisor::new(
            FileRecordStore::new(config.layout.pid_file.clone()),
            SystemProcessTable,
            CommandLauncher::from_config(&config.layout, &config.server),
        );
        Ok((fetcher, supervisor))
    }

    #[tokio::test]
    async fn setup_creates_lora_dir_without_downloads() -> Result<()> {
        let server = MockServer::start_async().await;
        let dir = scratch_dir("comfypod-setup-")?;
        let config = config(dir.path(), &server, &[])?;
        let (fetcher, supervisor) = parts(&config)?;

        handle_setup(&config, &fetcher, &supervisor, SetupArgs::default()).await?;
        assert!(dir.path().join("models/loras").is_dir());
        assert!(!dir.path().join("comfyui.pid").exists());
        Ok(())
    }

    #[tokio::test]
    async fn missing_token_skips_downloads() -> Result<()> {
        let server = MockServer::start_async().await;
        let any = server.mock(|when, then| {
            when.method(GET);
            then.status(200);
        });
        let dir = scratch_dir("comfypod-setup-")?;
        let config = config(dir.path(), &server, &[(env_keys::LORA_IDS, "1,2")])?;
        let (fetcher, supervisor) = parts(&config)?;

        handle_setup(&config, &fetcher, &supervisor, SetupArgs::default()).await?;
        assert_eq!(any.hits(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn configured_ids_are_downloaded() -> Result<()> {
        let server = MockServer::start_async().await;
        let file_url = server.url("/files/3");
        server.mock(move |when, then| {
            when.method(GET)
                .path("/api/v1/models/3")
                .header("authorization", "Bearer pod-token");
            then.status(200)
                .json_body(model_body(3, Some(&file_url), Some("three.safetensors")));
        });
        server.mock(|when, then| {
            when.method(GET).path("/files/3");
            then.status(200).body("three");
        });
        let dir = scratch_dir("comfypod-setup-")?;
        let config = config(
            dir.path(),
            &server,
            &[
                (env_keys::LORA_IDS, " 3 "),
                (env_keys::CIVITAI_TOKEN, "pod-token"),
            ],
        )?;
        let (fetcher, supervisor) = parts(&config)?;

        handle_setup(&config, &fetcher, &supervisor, SetupArgs::default()).await?;
        let installed = dir.path().join("models/loras/three.safetensors");
        assert_eq!(fs::read_to_string(installed)?, "three");
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn start_flag_launches_and_records_server() -> Result<()> {
        let server = MockServer::start_async().await;
        let dir = scratch_dir("comfypod-setup-")?;
        let config = config(dir.path(), &server, &[])?;
        let (fetcher, supervisor) = parts(&config)?;

        handle_setup(&config, &fetcher, &supervisor, SetupArgs { start: true }).await?;
        assert!(matches!(supervisor.status()?, ServerStatus::Running(_)));

        handle_setup(&config, &fetcher, &supervisor, SetupArgs { start: true }).await?;
        supervisor.stop()?;
        assert!(!dir.path().join("comfyui.pid").exists());
        Ok(())
    }
}
