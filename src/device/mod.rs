//! Device adapters for lab hardware
//!
//! Each device is exposed through a small capability trait with a live
//! implementation and a no-op fallback, so an experiment can run without
//! hardware attached. Sessions compose adapters; no adapter knows about
//! any other.

pub mod eeg;
pub mod eye;

pub use eeg::{connect_or_noop, EegControl, EegMode, NoopEegRemote, TcpEegRemote};
pub use eye::{
    EdfName, EyeSample, EyeTracker, GazeSample, NoopEyeTracker, TrackedEye, TrackerSample,
    TrackingSettings,
};
