//! Eye tracker capability interface
//!
//! The vendor SDK owns calibration rendering, the link protocol and the
//! sample wire format; this module defines the surface a session consumes
//! from it. A real adapter wraps the SDK behind [`EyeTracker`];
//! [`NoopEyeTracker`] satisfies the same trait for runs without hardware.

use crate::error::{LabRecError, Result};

/// Host-side limit on tracker data filenames, extension included
pub const MAX_EDF_NAME_LEN: usize = 12;

/// Status lines longer than this are truncated on the tracker display
const STATUS_DISPLAY_WIDTH: usize = 80;

/// A validated tracker-side data filename
///
/// The tracker's host filesystem allows at most 12 characters including
/// the mandatory `.edf` extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdfName(String);

impl EdfName {
    /// Validate a tracker-side filename
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        if !name.ends_with(".edf") {
            return Err(LabRecError::EdfName(format!(
                "'{}' must include the .edf extension",
                name
            )));
        }
        if name.len() > MAX_EDF_NAME_LEN {
            return Err(LabRecError::EdfName(format!(
                "'{}' is longer than {} characters including the extension",
                name, MAX_EDF_NAME_LEN
            )));
        }

        Ok(Self(name))
    }

    /// The filename as sent to the tracker
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EdfName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which eye(s) the tracker records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedEye {
    Left,
    Right,
    Both,
}

impl TrackedEye {
    /// The tracker's name for this selection
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedEye::Left => "LEFT",
            TrackedEye::Right => "RIGHT",
            TrackedEye::Both => "BOTH",
        }
    }

    /// Whether both eyes are recorded
    pub fn is_binocular(&self) -> bool {
        matches!(self, TrackedEye::Both)
    }
}

/// Gaze position in screen pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
}

/// One eye's data in a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeSample {
    pub gaze: GazeSample,
    /// Pupil size, area or diameter per the tracker settings
    pub pupil_size: f64,
}

/// The newest sample from the tracker
///
/// Eyes that are not being tracked are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackerSample {
    pub left: Option<EyeSample>,
    pub right: Option<EyeSample>,
}

/// Tracker settings sent as command strings during setup
///
/// The defaults are the lab's standard table; individual fields can be
/// overridden before [`TrackingSettings::command_lines`] renders them.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSettings {
    pub automatic_calibration_pacing: u32,
    pub calibration_area_proportion: (f64, f64),
    pub calibration_type: String,
    pub elcl_configuration: String,
    pub enable_automatic_calibration: bool,
    /// Text stamped into the data file preamble, if any
    pub preamble_text: Option<String>,
    /// Report pupil diameter instead of area
    pub pupil_size_diameter: bool,
    pub saccade_acceleration_threshold: u32,
    pub saccade_motion_threshold: f64,
    pub saccade_pursuit_fixup: u32,
    pub saccade_velocity_threshold: u32,
    pub sample_rate: u32,
    pub validation_area_proportion: (f64, f64),
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            automatic_calibration_pacing: 1000,
            calibration_area_proportion: (0.5, 0.5),
            calibration_type: "HV9".to_string(),
            elcl_configuration: "BTABLER".to_string(),
            enable_automatic_calibration: true,
            preamble_text: None,
            pupil_size_diameter: false,
            saccade_acceleration_threshold: 9500,
            saccade_motion_threshold: 0.15,
            saccade_pursuit_fixup: 60,
            saccade_velocity_threshold: 30,
            sample_rate: 1000,
            validation_area_proportion: (0.5, 0.5),
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "YES"
    } else {
        "NO"
    }
}

impl TrackingSettings {
    /// Render the settings as the command strings the tracker accepts
    pub fn command_lines(&self, eye: TrackedEye) -> Vec<String> {
        let mut lines = vec![format!(
            "elcl_select_configuration = {}",
            self.elcl_configuration
        )];

        if !eye.is_binocular() {
            lines.push(format!("active_eye = {}", eye.as_str()));
        }

        lines.push(format!(
            "automatic_calibration_pacing = {}",
            self.automatic_calibration_pacing
        ));
        lines.push(format!("binocular_enabled = {}", yes_no(eye.is_binocular())));
        lines.push(format!(
            "calibration_area_proportion {:.6} {:.6}",
            self.calibration_area_proportion.0, self.calibration_area_proportion.1
        ));
        lines.push(format!("calibration_type = {}", self.calibration_type));
        lines.push(format!(
            "enable_automatic_calibration = {}",
            yes_no(self.enable_automatic_calibration)
        ));
        if let Some(ref preamble) = self.preamble_text {
            lines.push(format!("add_file_preamble_text \"{}\"", preamble));
        }
        lines.push(format!(
            "pupil_size_diameter = {}",
            yes_no(self.pupil_size_diameter)
        ));
        lines.push(format!(
            "saccade_acceleration_threshold = {}",
            self.saccade_acceleration_threshold
        ));
        lines.push(format!(
            "saccade_motion_threshold = {}",
            self.saccade_motion_threshold
        ));
        lines.push(format!(
            "saccade_pursuit_fixup = {}",
            self.saccade_pursuit_fixup
        ));
        lines.push(format!(
            "saccade_velocity_threshold = {}",
            self.saccade_velocity_threshold
        ));
        lines.push(format!("sample_rate = {}", self.sample_rate));
        lines.push(format!(
            "validation_area_proportion {:.6} {:.6}",
            self.validation_area_proportion.0, self.validation_area_proportion.1
        ));

        lines
    }
}

/// Capability interface for an eye tracker
///
/// Implementations must leave timing-sensitive experiment phases alone:
/// recording start/stop carry vendor-mandated settle delays.
pub trait EyeTracker {
    /// Which eye(s) this tracker was configured for
    fn eye(&self) -> TrackedEye;

    /// Open the tracker-side data file
    fn open_data_file(&mut self) -> Result<()>;

    /// Close the tracker-side data file
    fn close_data_file(&mut self) -> Result<()>;

    /// Pull the tracker-side data file to the experiment machine
    fn transfer_data_file(&mut self, new_name: Option<&EdfName>) -> Result<()>;

    /// Start recording gaze data
    fn start_recording(&mut self) -> Result<()>;

    /// Stop recording gaze data
    fn stop_recording(&mut self) -> Result<()>;

    /// Send a raw command string
    fn send_command(&mut self, command: &str) -> Result<()>;

    /// Stamp a message into the tracker data file (e.g. trial markers)
    fn send_message(&mut self, message: &str) -> Result<()>;

    /// The most recent sample, if one is available
    fn newest_sample(&mut self) -> Result<Option<TrackerSample>>;

    /// Put the tracker into offline mode
    fn set_offline_mode(&mut self) -> Result<()>;

    /// Enter the tracker's calibration/setup screen
    fn enter_calibration(&mut self) -> Result<()>;

    /// Run drift correction at `position`, defaulting to screen center
    fn drift_correct(&mut self, position: Option<(u32, u32)>) -> Result<()>;

    /// Close the link to the tracker
    fn close_connection(&mut self) -> Result<()>;

    /// Show a status line on the tracker host display
    fn send_status(&mut self, status: &str) -> Result<()> {
        if status.len() >= STATUS_DISPLAY_WIDTH {
            tracing::warn!(
                "Status line is {} characters; the tracker display shows {}",
                status.len(),
                STATUS_DISPLAY_WIDTH
            );
        }
        self.send_command(&format!("record_status_message '{}'", status))
    }

    /// Send a full settings table as individual commands
    fn apply_settings(&mut self, settings: &TrackingSettings) -> Result<()> {
        for line in settings.command_lines(self.eye()) {
            self.send_command(&line)?;
        }
        Ok(())
    }
}

/// Debug fallback when no tracker is reachable
///
/// Every operation succeeds; commands are remembered so dry runs can be
/// inspected. Gaze data is not recorded.
#[derive(Debug)]
pub struct NoopEyeTracker {
    eye: TrackedEye,
    edf_name: EdfName,
    recording: bool,
    data_file_open: bool,
    commands: Vec<String>,
}

impl NoopEyeTracker {
    /// Create a no-op tracker
    pub fn new(edf_name: EdfName, eye: TrackedEye) -> Self {
        Self {
            eye,
            edf_name,
            recording: false,
            data_file_open: false,
            commands: Vec::new(),
        }
    }

    /// The filename the tracker would have recorded to
    pub fn edf_name(&self) -> &EdfName {
        &self.edf_name
    }

    /// Whether a recording is nominally in progress
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// The command strings swallowed so far
    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

impl EyeTracker for NoopEyeTracker {
    fn eye(&self) -> TrackedEye {
        self.eye
    }

    fn open_data_file(&mut self) -> Result<()> {
        tracing::debug!("No-op tracker: open_data_file {}", self.edf_name);
        self.data_file_open = true;
        Ok(())
    }

    fn close_data_file(&mut self) -> Result<()> {
        tracing::debug!("No-op tracker: close_data_file");
        self.data_file_open = false;
        Ok(())
    }

    fn transfer_data_file(&mut self, new_name: Option<&EdfName>) -> Result<()> {
        let target = new_name.unwrap_or(&self.edf_name);
        tracing::debug!("No-op tracker: transfer_data_file -> {}", target);
        Ok(())
    }

    fn start_recording(&mut self) -> Result<()> {
        tracing::debug!("No-op tracker: start_recording");
        self.recording = true;
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        tracing::debug!("No-op tracker: stop_recording");
        self.recording = false;
        Ok(())
    }

    fn send_command(&mut self, command: &str) -> Result<()> {
        self.commands.push(command.to_string());
        Ok(())
    }

    fn send_message(&mut self, message: &str) -> Result<()> {
        tracing::debug!("No-op tracker: message '{}'", message);
        Ok(())
    }

    fn newest_sample(&mut self) -> Result<Option<TrackerSample>> {
        Ok(None)
    }

    fn set_offline_mode(&mut self) -> Result<()> {
        Ok(())
    }

    fn enter_calibration(&mut self) -> Result<()> {
        tracing::debug!("No-op tracker: enter_calibration");
        Ok(())
    }

    fn drift_correct(&mut self, _position: Option<(u32, u32)>) -> Result<()> {
        Ok(())
    }

    fn close_connection(&mut self) -> Result<()> {
        tracing::debug!("No-op tracker: close_connection");
        Ok(())
    }
}
