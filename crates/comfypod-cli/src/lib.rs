#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Command-line entrypoints for a ComfyUI pod.
//!
//! Layout:
//! - `cli.rs`: argument parsing and command dispatch for each binary
//! - `commands/`: command handlers grouped by concern
//! - `client.rs`: shared errors, configuration loading, and logging wiring
//! - `output.rs`: renderers and formatting helpers
//! - `bin/`: thin entrypoints delegating to the `run_*` functions

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod output;

pub use cli::{run_comfypod, run_control, run_lora_manager};
