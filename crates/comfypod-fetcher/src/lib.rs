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
#![allow(clippy::module_name_repetitions)]

//! Resolve CivitAI model identifiers and install their weight files.
//!
//! Layout: `batch.rs` (identifier lists and per-item outcomes), `civitai.rs`
//! (API client and response models), `naming.rs` (file name sanitising),
//! `store.rs` (atomic installs, sidecars, catalogue), `fetcher.rs` (batch
//! workflow), `error.rs` (typed failures).

pub mod batch;
pub mod civitai;
pub mod error;
pub mod fetcher;
pub mod naming;
pub mod store;

pub use batch::{Batch, BatchReport, FailureReason, ItemOutcome};
pub use civitai::{AssetRecord, CivitaiClient, ModelSummary, POPULAR_LIMIT, POPULAR_QUERIES};
pub use error::{FetchError, FetchResult};
pub use fetcher::Fetcher;
pub use naming::{DEFAULT_FILE_NAME, sanitize_file_name};
pub use store::{AssetMetadata, AssetStore, InstalledAsset, PendingAsset};
