//! # labrec-rs: Experiment Session Recorder
//!
//! A library for running psychology-experiment sessions: it owns the
//! on-disk record of a run (subject info, incrementally flushed CSV trial
//! data, crash-recovery snapshots) and exposes capability interfaces for
//! the lab devices a session composes (EEG amplifier remote control, eye
//! tracker).
//!
//! ## Architecture
//!
//! - **Session**: append-only trial log with a forward-only flush cursor,
//!   collision-safe file naming, and periodic JSON snapshots
//! - **Devices**: one capability trait per device with a live and a no-op
//!   implementation, composed by [`Experiment`] instead of inherited
//! - **Config**: TOML experiment configs defining the field schema and
//!   display parameters
//!
//! ## Example
//!
//! ```ignore
//! use labrec_rs::{
//!     config::ExperimentConfig,
//!     session::{AlwaysOverwrite, SessionInfo, SessionRecorder},
//! };
//!
//! fn main() -> labrec_rs::Result<()> {
//!     let config = ExperimentConfig::new("change_detection", ["Trial", "RT", "Correct"]);
//!     let mut recorder = SessionRecorder::new(&config, Box::new(AlwaysOverwrite));
//!
//!     recorder.capture_info(SessionInfo::with_default_fields())?;
//!     recorder.write_session_info(None)?;
//!     recorder.open_data_file(None)?;
//!
//!     // per block:
//!     //   recorder.append_rows(block_rows)?;
//!     //   recorder.flush()?;
//!     //   recorder.snapshot(None)?;
//!
//!     recorder.close()
//! }
//! ```

pub mod color;
pub mod config;
pub mod device;
pub mod error;
pub mod experiment;
pub mod session;

// Re-export commonly used types
pub use config::ExperimentConfig;
pub use error::{LabRecError, Result};
pub use experiment::Experiment;
pub use session::{SessionInfo, SessionRecorder, SessionState, Snapshot, TrialRow, TrialValue};
