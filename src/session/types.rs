//! Session data types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Info field holding the participant identifier; every session has it
pub const SUBJECT_NUMBER_FIELD: &str = "Subject Number";

/// Lifecycle state of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Session created, subject info not yet captured
    #[default]
    Uninitialized,
    /// Subject info captured, data file not yet open
    InfoCaptured,
    /// Data file open with header written, no rows appended yet
    DataFileOpen,
    /// Rows are being appended and flushed
    Recording,
    /// Session ended, file handle released
    Closed,
}

impl SessionState {
    /// Check if the data file is open for writing
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::DataFileOpen | SessionState::Recording)
    }

    /// Check if the session has ended
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    /// Check if subject info has been captured
    pub fn has_info(&self) -> bool {
        !matches!(self, SessionState::Uninitialized)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "Uninitialized",
            SessionState::InfoCaptured => "InfoCaptured",
            SessionState::DataFileOpen => "DataFileOpen",
            SessionState::Recording => "Recording",
            SessionState::Closed => "Closed",
        }
    }
}

/// A single cell value in a trial row
///
/// Values keep their natural type in memory and in snapshots; the CSV
/// writer stringifies them with their default display form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrialValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for TrialValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialValue::Bool(v) => write!(f, "{}", v),
            TrialValue::Int(v) => write!(f, "{}", v),
            TrialValue::Float(v) => write!(f, "{}", v),
            TrialValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for TrialValue {
    fn from(v: bool) -> Self {
        TrialValue::Bool(v)
    }
}

impl From<i64> for TrialValue {
    fn from(v: i64) -> Self {
        TrialValue::Int(v)
    }
}

impl From<i32> for TrialValue {
    fn from(v: i32) -> Self {
        TrialValue::Int(v.into())
    }
}

impl From<f64> for TrialValue {
    fn from(v: f64) -> Self {
        TrialValue::Float(v)
    }
}

impl From<&str> for TrialValue {
    fn from(v: &str) -> Self {
        TrialValue::Text(v.to_string())
    }
}

impl From<String> for TrialValue {
    fn from(v: String) -> Self {
        TrialValue::Text(v)
    }
}

/// One trial's worth of data, keyed by field name
///
/// Keys should be a subset of the session's field schema; anything else is
/// ignored at flush time and missing fields are written as `NA`.
pub type TrialRow = IndexMap<String, TrialValue>;

/// Subject and session metadata captured once at session start
///
/// Field order is preserved so the info file reads the way the intake
/// dialog presented it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionInfo {
    fields: IndexMap<String, String>,
}

impl SessionInfo {
    /// Create an empty info record
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard intake fields with their default values
    pub fn with_default_fields() -> Self {
        let mut info = Self::new();
        info.set(SUBJECT_NUMBER_FIELD, "0");
        info.set("Age", "0");
        info.set("Experimenter Initials", "");
        info.set("Unique Subject Identifier", "000000");
        info
    }

    /// Set a field, preserving first-insertion order
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`SessionInfo::set`]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The participant identifier, `"0"` if never set
    pub fn subject_number(&self) -> &str {
        self.get(SUBJECT_NUMBER_FIELD).unwrap_or("0")
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if no fields have been captured
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A point-in-time serialization of session state for crash recovery
///
/// Written periodically (typically after each trial block) so a crash
/// loses at most the rows appended since the last snapshot. Restoring is
/// an explicit caller action; nothing loads snapshots automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Experiment title
    pub experiment_name: String,
    /// Column order the CSV is written in
    pub field_schema: Vec<String>,
    /// All rows accumulated so far, flushed or not
    pub rows: Vec<TrialRow>,
    /// How many of `rows` have been durably written to the CSV
    pub lines_written: usize,
    /// Subject info captured at session start
    pub session_info: SessionInfo,
    /// Path of the open data file, if any
    pub data_filename: Option<PathBuf>,
    /// When this snapshot was taken
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Snapshot {
    /// Serialize to pretty JSON, merging in caller-supplied extra fields.
    ///
    /// Extra fields win on key collision, so callers can stamp snapshots
    /// with block counters or device state under any name they like.
    pub fn to_json_with_extras(
        &self,
        extras: &IndexMap<String, serde_json::Value>,
    ) -> Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(ref mut map) = value {
            for (key, extra) in extras {
                map.insert(key.clone(), extra.clone());
            }
        }
        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// Write the snapshot file, overwriting any previous checkpoint
    pub fn write_to_file(
        &self,
        path: &Path,
        extras: &IndexMap<String, serde_json::Value>,
    ) -> Result<()> {
        let json = self.to_json_with_extras(extras)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a snapshot for manual crash recovery
    ///
    /// Extra fields that are not part of [`Snapshot`] are dropped; callers
    /// needing them should parse the file as plain JSON instead.
    pub fn read_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn test_session_state() {
        assert!(SessionState::DataFileOpen.is_open());
        assert!(SessionState::Recording.is_open());
        assert!(!SessionState::Closed.is_open());
        assert!(SessionState::InfoCaptured.has_info());
        assert!(!SessionState::Uninitialized.has_info());
    }

    #[test]
    fn test_trial_value_display() {
        assert_eq!(TrialValue::from(4).to_string(), "4");
        assert_eq!(TrialValue::from(4.5).to_string(), "4.5");
        assert_eq!(TrialValue::from(true).to_string(), "true");
        assert_eq!(TrialValue::from("left").to_string(), "left");
    }

    #[test]
    fn test_session_info_order_and_subject() {
        let info = SessionInfo::with_default_fields().with_field("Condition", "A");
        assert_eq!(info.subject_number(), "0");

        let keys: Vec<&str> = info.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "Subject Number",
                "Age",
                "Experimenter Initials",
                "Unique Subject Identifier",
                "Condition"
            ]
        );
    }

    #[test]
    fn test_snapshot_extras_take_precedence() {
        let snapshot = Snapshot {
            experiment_name: "test".to_string(),
            field_schema: vec!["Trial".to_string()],
            rows: vec![indexmap! {"Trial".to_string() => TrialValue::from(1)}],
            lines_written: 0,
            session_info: SessionInfo::with_default_fields(),
            data_filename: None,
            created_at: chrono::Utc::now(),
        };

        let extras = indexmap! {
            "block".to_string() => serde_json::json!(3),
            "lines_written".to_string() => serde_json::json!(99),
        };

        let json = snapshot.to_json_with_extras(&extras).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["block"], 3);
        assert_eq!(parsed["lines_written"], 99);
        assert_eq!(parsed["experiment_name"], "test");
    }
}
