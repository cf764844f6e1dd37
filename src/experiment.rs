//! Experiment composition
//!
//! An [`Experiment`] ties one session recorder to whatever device
//! adapters the study uses. Devices are independent capabilities added
//! with builder methods; an EEG-plus-eye-tracking study attaches both, a
//! behavioral pilot attaches neither and everything else still works.

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::color::contrast_text_color;
use crate::config::ExperimentConfig;
use crate::device::{EegControl, EyeTracker};
use crate::error::Result;
use crate::session::{OverwritePrompt, SessionRecorder};

/// A configured experiment: one session recorder plus attached devices
pub struct Experiment {
    config: ExperimentConfig,
    recorder: SessionRecorder,
    eye_tracker: Option<Box<dyn EyeTracker>>,
    eeg: Option<Box<dyn EegControl>>,
}

impl Experiment {
    /// Create an experiment with no devices attached
    pub fn new(config: ExperimentConfig, prompt: Box<dyn OverwritePrompt>) -> Self {
        let recorder = SessionRecorder::new(&config, prompt);
        Self {
            config,
            recorder,
            eye_tracker: None,
            eeg: None,
        }
    }

    /// Attach an eye tracker
    pub fn with_eye_tracker(mut self, tracker: Box<dyn EyeTracker>) -> Self {
        self.eye_tracker = Some(tracker);
        self
    }

    /// Attach an EEG remote
    pub fn with_eeg(mut self, eeg: Box<dyn EegControl>) -> Self {
        self.eeg = Some(eeg);
        self
    }

    /// The experiment configuration
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// The session recorder
    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    /// Mutable access to the session recorder
    pub fn recorder_mut(&mut self) -> &mut SessionRecorder {
        &mut self.recorder
    }

    /// The attached eye tracker, if any
    pub fn eye_tracker_mut(&mut self) -> Option<&mut (dyn EyeTracker + '_)> {
        match self.eye_tracker.as_mut() {
            Some(tracker) => Some(tracker.as_mut()),
            None => None,
        }
    }

    /// The attached EEG remote, if any
    pub fn eeg_mut(&mut self) -> Option<&mut (dyn EegControl + '_)> {
        match self.eeg.as_mut() {
            Some(eeg) => Some(eeg.as_mut()),
            None => None,
        }
    }

    /// Background color in the renderer's unit range
    pub fn background_color(&self) -> [f64; 3] {
        self.config.bg_color_unit()
    }

    /// Text color contrasting with the background
    pub fn text_color(&self) -> [f64; 3] {
        contrast_text_color(self.background_color())
    }

    /// Start recording on every attached device
    pub fn begin_run(&mut self) -> Result<()> {
        if let Some(eeg) = self.eeg.as_deref_mut() {
            eeg.start_recording()?;
        }
        if let Some(tracker) = self.eye_tracker.as_deref_mut() {
            tracker.start_recording()?;
        }
        Ok(())
    }

    /// Stop every attached device and close the session recorder
    pub fn end_run(&mut self) -> Result<()> {
        if let Some(tracker) = self.eye_tracker.as_deref_mut() {
            tracker.stop_recording()?;
        }
        if let Some(eeg) = self.eeg.as_deref_mut() {
            eeg.stop_recording(false)?;
        }
        self.recorder.close()
    }

    /// Checkpoint the session; see [`SessionRecorder::snapshot`]
    pub fn checkpoint(
        &mut self,
        extras: Option<&IndexMap<String, serde_json::Value>>,
    ) -> Result<PathBuf> {
        self.recorder.snapshot(extras)
    }
}
