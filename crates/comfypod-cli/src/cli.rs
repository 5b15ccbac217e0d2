//! Argument parsing and dispatch for the `control`, `lora-manager`, and
//! `comfypod` binaries.

use clap::{Args, Parser, Subcommand, ValueEnum};
use comfypod_supervisor::SystemSupervisor;

use crate::client::{build_fetcher, execute};
use crate::commands::control::handle_control;
use crate::commands::lora::{handle_download, handle_list, handle_popular, handle_search};
use crate::commands::setup::handle_setup;

pub(crate) const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Parses `control` arguments and runs the requested supervisor action.
/// Returns the process exit code.
pub async fn run_control() -> i32 {
    let cli = ControlCli::parse();
    let command = cli.command;
    execute(command.label(), move |config| async move {
        let supervisor = SystemSupervisor::from_config(&config.layout, &config.server);
        handle_control(&supervisor, command)
    })
    .await
}

/// Parses `lora-manager` arguments and runs the requested asset command.
/// Returns the process exit code.
pub async fn run_lora_manager() -> i32 {
    let cli = LoraCli::parse();
    let label = cli.command.label();
    execute(label, move |config| async move {
        let fetcher = build_fetcher(&config)?;
        let token = config.civitai.token.as_deref();
        match cli.command {
            LoraCommand::Download(args) => handle_download(&fetcher, token, &args, cli.output).await,
            LoraCommand::List => handle_list(&fetcher, cli.output),
            LoraCommand::Search(args) => handle_search(&fetcher, token, &args, cli.output).await,
            LoraCommand::Popular => handle_popular(&fetcher, token, cli.output).await,
        }
    })
    .await
}

/// Parses `comfypod` arguments and runs pod bootstrap commands.
/// Returns the process exit code.
pub async fn run_comfypod() -> i32 {
    let cli = PodCli::parse();
    match cli.command {
        PodCommand::Version => {
            println!("comfypod {}", env!("CARGO_PKG_VERSION"));
            0
        }
        PodCommand::Setup(args) => {
            execute("setup", move |config| async move {
                let fetcher = build_fetcher(&config)?;
                let supervisor = SystemSupervisor::from_config(&config.layout, &config.server);
                handle_setup(&config, &fetcher, &supervisor, args).await
            })
            .await
        }
    }
}

#[derive(Parser)]
#[command(name = "control", about = "Start, stop, or inspect the ComfyUI server")]
pub(crate) struct ControlCli {
    #[command(subcommand)]
    pub(crate) command: ControlCommand,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlCommand {
    /// Launch the server unless one is already running.
    Start,
    /// Stop the recorded server.
    Stop,
    /// Report whether the recorded server is running.
    Status,
}

impl ControlCommand {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Start => "control.start",
            Self::Stop => "control.stop",
            Self::Status => "control.status",
        }
    }
}

#[derive(Parser)]
#[command(name = "lora-manager", about = "Download and browse CivitAI LoRA weights")]
pub(crate) struct LoraCli {
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: LoraCommand,
}

#[derive(Subcommand)]
pub(crate) enum LoraCommand {
    /// Download a comma-separated list of model identifiers.
    Download(DownloadArgs),
    /// List installed LoRA files.
    List,
    /// Search CivitAI for LoRA models.
    Search(SearchArgs),
    /// Show the best rated portrait and photography LoRAs.
    Popular,
}

impl LoraCommand {
    const fn label(&self) -> &'static str {
        match self {
            Self::Download(_) => "lora.download",
            Self::List => "lora.list",
            Self::Search(_) => "lora.search",
            Self::Popular => "lora.popular",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct DownloadArgs {
    /// Model identifiers, e.g. `12345,67890`.
    pub(crate) ids: String,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct SearchArgs {
    /// Free-text query.
    pub(crate) query: String,
    /// Maximum number of results.
    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub(crate) limit: u32,
}

#[derive(Parser)]
#[command(name = "comfypod", about = "Bootstrap a ComfyUI pod", version)]
pub(crate) struct PodCli {
    #[command(subcommand)]
    pub(crate) command: PodCommand,
}

#[derive(Subcommand)]
pub(crate) enum PodCommand {
    /// Prepare the LoRA directory, fetch `LORA_IDS`, optionally start the server.
    Setup(SetupArgs),
    /// Print the version.
    Version,
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub(crate) struct SetupArgs {
    /// Start the server once downloads finish.
    #[arg(long)]
    pub(crate) start: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}
