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

//! Shared test helpers used across the workspace.
//! Layout: fixtures.rs (scratch directories), civitai.rs (API payload builders).

pub mod civitai;
pub mod fixtures;
