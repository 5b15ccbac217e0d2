#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub)]

//! Environment-driven configuration for a ComfyUI pod.
//!
//! Layout: `defaults.rs` (fallback paths and values), `model.rs` (typed
//! settings), `loader.rs` (environment parsing), `error.rs` (typed failures).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use loader::env_keys;
pub use model::{CivitaiSettings, LogSettings, PodConfig, PodLayout, ServerCommand, SetupSettings};
