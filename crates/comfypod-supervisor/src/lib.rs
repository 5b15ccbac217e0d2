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

//! Single-instance supervision of the inference server via a PID record.
//!
//! Layout: `record.rs` (persisted PID record and its lock), `process.rs`
//! (liveness and termination), `launch.rs` (detached spawn), `supervisor.rs`
//! (start/stop/status state machine), `error.rs` (typed failures).

pub mod error;
pub mod launch;
pub mod process;
pub mod record;
pub mod supervisor;

pub use error::{SupervisorError, SupervisorResult};
pub use launch::{CommandLauncher, Launcher};
pub use process::{ProcessTable, SystemProcessTable};
pub use record::{FileRecordStore, RecordGuard, RecordStore};
pub use supervisor::{
    ServerHandle, ServerStatus, StartOutcome, StopOutcome, Supervisor, SystemSupervisor,
};
