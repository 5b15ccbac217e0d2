//! Fallback values used when the environment leaves a setting unset.
//!
//! # Design
//! - Paths match the layout of a rented GPU pod with a `/workspace` volume.
//! - Keep every default in one place so the CLI help and docs stay in sync.

/// ComfyUI checkout location.
pub const COMFYUI_DIR: &str = "/workspace/ComfyUI";
/// LoRA directory relative to the ComfyUI checkout.
pub const LORA_SUBDIR: &str = "models/loras";
/// PID record path.
pub const PID_FILE: &str = "/workspace/comfyui.pid";
/// Server log path; output is appended.
pub const LOG_FILE: &str = "/workspace/comfyui.log";
/// Interpreter used to launch the server.
pub const PYTHON: &str = "python3";
/// Arguments passed to the interpreter.
pub const SERVER_ARGS: &[&str] = &["main.py", "--listen", "--use-sage-attention"];
/// CivitAI REST API base.
pub const CIVITAI_API_URL: &str = "https://civitai.com/api/v1";
/// HTTP timeout in seconds; covers multi-gigabyte weight downloads.
pub const HTTP_TIMEOUT_SECS: u64 = 300;
/// Advisory wait after launching the server during setup.
pub const START_GRACE_SECS: u64 = 5;
/// Log filter when neither `RUST_LOG` nor `COMFYPOD_LOG_LEVEL` is set.
pub const LOG_LEVEL: &str = "warn";
