use anyhow::anyhow;
use comfypod_supervisor::{Launcher, ProcessTable, RecordStore, Supervisor, SupervisorError};

use crate::cli::ControlCommand;
use crate::client::{CliError, CliResult};
use crate::output::{describe_start, describe_status, describe_stop};

/// Every idempotent outcome (already running, not running, stale) succeeds.
pub(crate) fn handle_control<S, P, L>(
    supervisor: &Supervisor<S, P, L>,
    command: ControlCommand,
) -> CliResult<()>
where
    S: RecordStore,
    P: ProcessTable,
    L: Launcher,
{
    let line = match command {
        ControlCommand::Start => describe_start(&supervisor.start().map_err(supervisor_failure)?),
        ControlCommand::Stop => describe_stop(&supervisor.stop().map_err(supervisor_failure)?),
        ControlCommand::Status => {
            describe_status(&supervisor.status().map_err(supervisor_failure)?)
        }
    };
    println!("{line}");
    Ok(())
}

pub(crate) fn supervisor_failure(err: SupervisorError) -> CliError {
    CliError::failure(anyhow!(err.detail()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use comfypod_supervisor::{
        CommandLauncher, FileRecordStore, ServerStatus, SystemProcessTable, SystemSupervisor,
    };
    use comfypod_test_support::fixtures::scratch_dir;
    use std::fs;
    use std::path::Path;

    fn supervisor(dir: &Path, program: &str, args: &[&str]) -> SystemSupervisor {
        Supervisor::new(
            FileRecordStore::new(dir.join("comfyui.pid")),
            SystemProcessTable,
            CommandLauncher::new(
                program,
                args.iter().map(ToString::to_string).collect(),
                dir,
                dir.join("comfyui.log"),
            ),
        )
    }

    #[test]
    fn stop_and_status_without_record_succeed() -> Result<()> {
        let dir = scratch_dir("comfypod-control-")?;
        let supervisor = supervisor(dir.path(), "sleep", &["30"]);

        assert!(handle_control(&supervisor, ControlCommand::Status).is_ok());
        assert!(handle_control(&supervisor, ControlCommand::Stop).is_ok());
        assert!(!dir.path().join("comfyui.pid").exists());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn start_twice_then_stop() -> Result<()> {
        let dir = scratch_dir("comfypod-control-")?;
        let supervisor = supervisor(dir.path(), "sleep", &["30"]);

        assert!(handle_control(&supervisor, ControlCommand::Start).is_ok());
        let recorded = fs::read_to_string(dir.path().join("comfyui.pid"))?;
        assert!(handle_control(&supervisor, ControlCommand::Start).is_ok());
        assert_eq!(fs::read_to_string(dir.path().join("comfyui.pid"))?, recorded);
        assert!(matches!(supervisor.status()?, ServerStatus::Running(_)));

        assert!(handle_control(&supervisor, ControlCommand::Stop).is_ok());
        assert!(!dir.path().join("comfyui.pid").exists());
        Ok(())
    }

    #[test]
    fn launch_failure_is_an_operational_error() -> Result<()> {
        let dir = scratch_dir("comfypod-control-")?;
        let supervisor = supervisor(dir.path(), "comfypod-definitely-missing-binary", &[]);

        let err = handle_control(&supervisor, ControlCommand::Start)
            .err()
            .expect("launch must fail");
        assert_eq!(err.exit_code(), 3);
        assert!(!dir.path().join("comfyui.pid").exists());
        Ok(())
    }
}
