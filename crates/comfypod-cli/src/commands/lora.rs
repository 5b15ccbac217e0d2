use anyhow::anyhow;
use comfypod_fetcher::{Batch, Fetcher};

use crate::cli::{DownloadArgs, OutputFormat, SearchArgs};
use crate::client::{CliError, CliResult};
use crate::output::{render_batch_report, render_installed, render_search};

/// Exit status reflects the whole batch: any failed item is a failure.
pub(crate) async fn handle_download(
    fetcher: &Fetcher,
    token: Option<&str>,
    args: &DownloadArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let batch = Batch::parse(&args.ids);
    let report = fetcher
        .download_batch(&batch, token.unwrap_or_default())
        .await?;
    render_batch_report(&report, format)?;

    if report.all_succeeded() {
        Ok(())
    } else {
        Err(CliError::failure(anyhow!(
            "{} of {} downloads failed",
            report.failed(),
            report.outcomes.len()
        )))
    }
}

pub(crate) fn handle_list(fetcher: &Fetcher, format: OutputFormat) -> CliResult<()> {
    let assets = fetcher.list_installed()?;
    render_installed(&assets, format)
}

pub(crate) async fn handle_search(
    fetcher: &Fetcher,
    token: Option<&str>,
    args: &SearchArgs,
    format: OutputFormat,
) -> CliResult<()> {
    if args.query.trim().is_empty() {
        return Err(CliError::validation("search query cannot be empty"));
    }
    let hits = fetcher
        .client()
        .search(args.query.trim(), args.limit, token)
        .await?;
    render_search(&hits, format)
}

pub(crate) async fn handle_popular(
    fetcher: &Fetcher,
    token: Option<&str>,
    format: OutputFormat,
) -> CliResult<()> {
    let hits = fetcher.client().popular(token).await?;
    render_search(&hits, format)
}
