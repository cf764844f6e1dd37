//! Session recording module
//!
//! This module owns a single experiment run's on-disk record: subject
//! info captured at intake, trial rows accumulated in memory and flushed
//! incrementally to CSV, and periodic crash-recovery snapshots. File
//! naming is collision-safe, so a run can never silently destroy another
//! session's data.
//!
//! # Features
//!
//! - Append-only in-memory data log with a forward-only flush cursor
//! - Incremental CSV flushing; repeated flushes write nothing new
//! - Plain-text info file and JSON snapshot file per run
//! - Overwrite confirmation with numeric-suffix collision fallback

pub mod naming;
pub mod recorder;
pub mod types;

pub use naming::{AlwaysOverwrite, NeverOverwrite, OverwritePolicy, OverwritePrompt};
pub use recorder::SessionRecorder;
pub use types::{SessionInfo, SessionState, Snapshot, TrialRow, TrialValue};
