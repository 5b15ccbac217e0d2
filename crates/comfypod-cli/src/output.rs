//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use comfypod_fetcher::{BatchReport, InstalledAsset, ItemOutcome, ModelSummary};
use comfypod_supervisor::{ServerStatus, StartOutcome, StopOutcome};
use serde_json::{Value, json};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const TRIGGER_PREVIEW: usize = 3;
const TAG_PREVIEW: usize = 5;

#[must_use]
pub(crate) fn describe_start(outcome: &StartOutcome) -> String {
    match outcome {
        StartOutcome::Started {
            handle,
            replaced_stale: Some(stale),
        } => format!(
            "ComfyUI started (pid {}); replaced stale pid {stale}",
            handle.pid
        ),
        StartOutcome::Started { handle, .. } => format!("ComfyUI started (pid {})", handle.pid),
        StartOutcome::AlreadyRunning(handle) => {
            format!("ComfyUI already running (pid {})", handle.pid)
        }
    }
}

#[must_use]
pub(crate) fn describe_stop(outcome: &StopOutcome) -> String {
    match outcome {
        StopOutcome::Stopped {
            pid,
            signalled: true,
        } => format!("ComfyUI stopped (pid {pid})"),
        StopOutcome::Stopped { pid, .. } => {
            format!("ComfyUI was not running; cleared record for pid {pid}")
        }
        StopOutcome::NotRunning => "ComfyUI not running".to_string(),
    }
}

#[must_use]
pub(crate) fn describe_status(status: &ServerStatus) -> String {
    match status {
        ServerStatus::Running(handle) => format!("ComfyUI running (pid {})", handle.pid),
        ServerStatus::Stale { pid } => format!("ComfyUI not running (stale pid {pid})"),
        ServerStatus::NotRunning => "ComfyUI not running".to_string(),
    }
}

pub(crate) fn render_batch_report(report: &BatchReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&batch_report_json(report))?,
        OutputFormat::Table => {
            for outcome in &report.outcomes {
                match outcome {
                    ItemOutcome::Downloaded { id, path, .. } => {
                        println!("downloaded {id} -> {}", path.display());
                    }
                    ItemOutcome::Failed { id, reason } => println!("failed {id}: {reason}"),
                }
            }
            println!(
                "{} downloaded, {} failed",
                report.succeeded(),
                report.failed()
            );
        }
    }
    Ok(())
}

pub(crate) fn render_installed(assets: &[InstalledAsset], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let items: Vec<Value> = assets.iter().map(installed_json).collect();
            print_json(&Value::Array(items))?;
        }
        OutputFormat::Table => {
            if assets.is_empty() {
                println!("no LoRAs installed");
                return Ok(());
            }
            println!("{:<48} {:>12} NAME", "FILE", "SIZE");
            for asset in assets {
                let metadata = asset.metadata.as_ref();
                let name = metadata
                    .and_then(|meta| meta.name.as_deref())
                    .unwrap_or("-");
                println!(
                    "{:<48} {:>12} {}",
                    asset.file_name,
                    format_bytes(asset.size_bytes),
                    name
                );
                if let Some(meta) = metadata.filter(|meta| !meta.trigger_words.is_empty()) {
                    println!("    triggers: {}", preview(&meta.trigger_words, TRIGGER_PREVIEW));
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn render_search(hits: &[ModelSummary], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let items: Vec<Value> = hits
                .iter()
                .map(|hit| {
                    json!({
                        "id": hit.id,
                        "name": hit.name,
                        "rating": hit.rating,
                        "download_count": hit.download_count,
                        "tags": hit.tags,
                    })
                })
                .collect();
            print_json(&Value::Array(items))?;
        }
        OutputFormat::Table => {
            if hits.is_empty() {
                println!("no models found");
                return Ok(());
            }
            println!("{:>10} {:>6} {:>10} NAME", "ID", "RATING", "DOWNLOADS");
            for hit in hits {
                let rating = hit
                    .rating
                    .map_or_else(|| "-".to_string(), |rating| format!("{rating:.1}"));
                let downloads = hit
                    .download_count
                    .map_or_else(|| "-".to_string(), |count| count.to_string());
                println!("{:>10} {:>6} {:>10} {}", hit.id, rating, downloads, hit.name);
                if !hit.tags.is_empty() {
                    println!("    tags: {}", preview(&hit.tags, TAG_PREVIEW));
                }
            }
        }
    }
    Ok(())
}

fn batch_report_json(report: &BatchReport) -> Value {
    let outcomes: Vec<Value> = report
        .outcomes
        .iter()
        .map(|outcome| match outcome {
            ItemOutcome::Downloaded {
                id,
                file_name,
                path,
            } => json!({
                "id": id,
                "status": "downloaded",
                "file_name": file_name,
                "path": path.display().to_string(),
            }),
            ItemOutcome::Failed { id, reason } => json!({
                "id": id,
                "status": "failed",
                "reason": reason.to_string(),
            }),
        })
        .collect();
    json!({
        "succeeded": report.succeeded(),
        "failed": report.failed(),
        "outcomes": outcomes,
    })
}

fn installed_json(asset: &InstalledAsset) -> Value {
    json!({
        "file_name": asset.file_name,
        "path": asset.path.display().to_string(),
        "size_bytes": asset.size_bytes,
        "metadata": asset.metadata,
    })
}

fn print_json(value: &Value) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

fn preview(items: &[String], limit: usize) -> String {
    let shown: Vec<&str> = items.iter().take(limit).map(String::as_str).collect();
    let mut text = shown.join(", ");
    if items.len() > limit {
        text.push_str(", ...");
    }
    text
}

#[must_use]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use comfypod_fetcher::FailureReason;
    use comfypod_supervisor::ServerHandle;
    use std::path::PathBuf;

    fn handle(pid: u32) -> ServerHandle {
        ServerHandle {
            pid,
            record_path: PathBuf::from("/workspace/comfyui.pid"),
        }
    }

    #[test]
    fn lifecycle_messages_name_the_pid() {
        assert_eq!(
            describe_start(&StartOutcome::Started {
                handle: handle(10),
                replaced_stale: None
            }),
            "ComfyUI started (pid 10)"
        );
        assert_eq!(
            describe_start(&StartOutcome::Started {
                handle: handle(11),
                replaced_stale: Some(9)
            }),
            "ComfyUI started (pid 11); replaced stale pid 9"
        );
        assert_eq!(
            describe_start(&StartOutcome::AlreadyRunning(handle(10))),
            "ComfyUI already running (pid 10)"
        );
        assert_eq!(
            describe_stop(&StopOutcome::Stopped {
                pid: 10,
                signalled: true
            }),
            "ComfyUI stopped (pid 10)"
        );
        assert_eq!(describe_stop(&StopOutcome::NotRunning), "ComfyUI not running");
        assert_eq!(
            describe_status(&ServerStatus::Stale { pid: 7 }),
            "ComfyUI not running (stale pid 7)"
        );
        assert_eq!(
            describe_status(&ServerStatus::Running(handle(10))),
            "ComfyUI running (pid 10)"
        );
    }

    #[test]
    fn batch_report_json_lists_outcomes_in_order() {
        let report = BatchReport {
            outcomes: vec![
                ItemOutcome::Downloaded {
                    id: "1".into(),
                    file_name: "a.safetensors".into(),
                    path: PathBuf::from("/loras/a.safetensors"),
                },
                ItemOutcome::Failed {
                    id: "2".into(),
                    reason: FailureReason::NoDownloadUrl,
                },
            ],
        };
        let value = batch_report_json(&report);
        assert_eq!(value["succeeded"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["outcomes"][0]["status"], "downloaded");
        assert_eq!(value["outcomes"][1]["reason"], "no download URL found");
    }

    #[test]
    fn preview_truncates_long_lists() {
        let words: Vec<String> = ["a", "b", "c", "d"].iter().map(ToString::to_string).collect();
        assert_eq!(preview(&words, 3), "a, b, c, ...");
        assert_eq!(preview(&words[..2], 3), "a, b");
    }

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GiB");
    }
}
