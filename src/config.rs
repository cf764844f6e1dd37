//! Experiment configuration
//!
//! This module handles the per-experiment configuration that a session is
//! created from: the experiment name, the data fields every trial row is
//! written against, display colors, monitor geometry and the file-naming
//! policy. Configs are TOML files saved alongside the experiment scripts.
//!
//! # Example
//!
//! ```ignore
//! use labrec_rs::config::ExperimentConfig;
//!
//! let config = ExperimentConfig::load_or_default("change_detection.toml");
//! let recorder = SessionRecorder::new(&config, Box::new(NeverOverwrite));
//! ```

use crate::error::{LabRecError, Result};
use crate::session::naming::OverwritePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default background color (0-255 per channel)
pub const DEFAULT_BG_COLOR: [u8; 3] = [128, 128, 128];

/// Physical description of the display monitor
///
/// Width and viewing distance are in centimeters; stimulus code uses them
/// to convert between pixels and degrees of visual angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Monitor name as registered with the render toolkit
    #[serde(default = "default_monitor_name")]
    pub name: String,

    /// Display width in cm
    #[serde(default = "default_monitor_width")]
    pub width_cm: u32,

    /// Participant viewing distance in cm
    #[serde(default = "default_monitor_distance")]
    pub distance_cm: u32,

    /// Resolution in pixels (x, y)
    #[serde(default = "default_monitor_resolution")]
    pub resolution: [u32; 2],
}

fn default_monitor_name() -> String {
    "Experiment Monitor".to_string()
}

fn default_monitor_width() -> u32 {
    53
}

fn default_monitor_distance() -> u32 {
    70
}

fn default_monitor_resolution() -> [u32; 2] {
    [1920, 1080]
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            name: default_monitor_name(),
            width_cm: default_monitor_width(),
            distance_cm: default_monitor_distance(),
            resolution: default_monitor_resolution(),
        }
    }
}

/// Configuration for a single experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Experiment title, also the stem of every output filename
    pub experiment_name: String,

    /// Ordered list of data fields written to the CSV, fixed for the run
    pub data_fields: Vec<String>,

    /// Background color as a 0-255 triple
    #[serde(default = "default_bg_color")]
    pub bg_color: [u8; 3],

    /// Monitor geometry
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// What to do when an output filename already exists
    #[serde(default)]
    pub overwrite_policy: OverwritePolicy,

    /// Directory session files are written into
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_bg_color() -> [u8; 3] {
    DEFAULT_BG_COLOR
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            experiment_name: "experiment".to_string(),
            data_fields: Vec::new(),
            bg_color: DEFAULT_BG_COLOR,
            monitor: MonitorConfig::default(),
            overwrite_policy: OverwritePolicy::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl ExperimentConfig {
    /// Create a config with a name and field schema, defaults elsewhere
    pub fn new(
        experiment_name: impl Into<String>,
        data_fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            data_fields: data_fields.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LabRecError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            LabRecError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load a config, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load experiment config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LabRecError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content).map_err(|e| {
            LabRecError::Config(format!(
                "Failed to write {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Background color in the renderer's [-1, 1] unit range
    pub fn bg_color_unit(&self) -> [f64; 3] {
        crate::color::color_triple_to_unit_range(self.bg_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExperimentConfig::default();
        assert_eq!(config.bg_color, [128, 128, 128]);
        assert_eq!(config.monitor.width_cm, 53);
        assert_eq!(config.monitor.distance_cm, 70);
        assert_eq!(config.monitor.resolution, [1920, 1080]);
        assert_eq!(config.overwrite_policy, OverwritePolicy::AskOnce);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExperimentConfig::new("change_detection", ["Trial", "RT", "Correct"]);
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ExperimentConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: ExperimentConfig = toml::from_str(
            r#"
            experiment_name = "oddball"
            data_fields = ["Trial", "Response"]
            "#,
        )
        .unwrap();
        assert_eq!(parsed.experiment_name, "oddball");
        assert_eq!(parsed.bg_color, [128, 128, 128]);
        assert_eq!(parsed.monitor, MonitorConfig::default());
    }

    #[test]
    fn test_bg_color_unit() {
        let config = ExperimentConfig::default();
        assert_eq!(config.bg_color_unit(), [0.0, 0.0, 0.0]);
    }
}
