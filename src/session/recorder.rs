//! Session recorder: durable CSV output plus crash-recovery snapshots
//!
//! The recorder owns one experiment run's on-disk record: the info file
//! written once after intake, the CSV data file rows are flushed to
//! incrementally, and the snapshot file overwritten at each checkpoint.
//! Rows accumulate in memory and `flush` appends only what the cursor has
//! not yet written, so checkpointing during a long run never rewrites
//! already-durable data.
//!
//! The CSV dialect is deliberately plain: every cell is double-quoted,
//! missing fields become `"NA"`, and embedded quotes or commas are not
//! escaped. Decades of analysis scripts parse exactly this form.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::config::ExperimentConfig;
use crate::error::{LabRecError, Result, ResultExt};

use super::naming::{pad_subject_number, strip_extension, OverwritePrompt, OverwriteResolver};
use super::types::{SessionInfo, SessionState, Snapshot, TrialRow};

/// Token written for a field a row does not contain
const MISSING_TOKEN: &str = "NA";

/// Manages a single experiment run's on-disk record
///
/// State advances `Uninitialized -> InfoCaptured -> DataFileOpen ->
/// Recording -> Closed`; operations called out of order return
/// [`LabRecError::InvalidState`]. Reopening the data file is an error,
/// never a silent truncate.
pub struct SessionRecorder {
    experiment_name: String,
    field_schema: Vec<String>,
    data_dir: PathBuf,
    overwrite: OverwriteResolver,
    info: SessionInfo,
    rows: Vec<TrialRow>,
    /// Flush cursor: rows below this index are durably on disk
    lines_written: usize,
    writer: Option<BufWriter<File>>,
    data_path: Option<PathBuf>,
    state: SessionState,
}

impl SessionRecorder {
    /// Create a recorder for one run of the configured experiment
    pub fn new(config: &ExperimentConfig, prompt: Box<dyn OverwritePrompt>) -> Self {
        Self {
            experiment_name: config.experiment_name.clone(),
            field_schema: config.data_fields.clone(),
            data_dir: config.data_dir.clone(),
            overwrite: OverwriteResolver::new(config.overwrite_policy, prompt),
            info: SessionInfo::new(),
            rows: Vec::new(),
            lines_written: 0,
            writer: None,
            data_path: None,
            state: SessionState::Uninitialized,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Experiment title the output filenames are derived from
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    /// Column order the CSV is written in
    pub fn field_schema(&self) -> &[String] {
        &self.field_schema
    }

    /// Subject info captured for this run
    pub fn session_info(&self) -> &SessionInfo {
        &self.info
    }

    /// Rows accumulated in memory, flushed or not
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows durably written to the data file
    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    /// Path of the open data file, if any
    pub fn data_path(&self) -> Option<&Path> {
        self.data_path.as_deref()
    }

    fn invalid_state(&self, operation: &'static str) -> LabRecError {
        LabRecError::InvalidState {
            operation,
            state: self.state.display_name(),
        }
    }

    /// Capture subject info for the run
    ///
    /// Valid exactly once, before the data file is opened. The info is
    /// read-only afterwards.
    pub fn capture_info(&mut self, info: SessionInfo) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            return Err(self.invalid_state("capture_info"));
        }
        self.info = info;
        self.state = SessionState::InfoCaptured;
        Ok(())
    }

    /// Write the info file: one `key:value` line per field, then a blank line.
    ///
    /// The default filename is `{experiment}_{subject}_info.txt` with the
    /// subject number zero-padded to three digits. Collisions follow the
    /// session's overwrite policy, sharing the ask-once cache with the
    /// data file.
    pub fn write_session_info(&mut self, filename: Option<&str>) -> Result<PathBuf> {
        if !self.state.has_info() || self.state.is_closed() {
            return Err(self.invalid_state("write_session_info"));
        }

        let base = match filename {
            Some(name) => strip_extension(name, "txt").to_string(),
            None => format!(
                "{}_{}_info",
                self.experiment_name,
                pad_subject_number(self.info.subject_number())
            ),
        };

        let path = self.overwrite.resolve(&self.data_dir, &base, "txt");

        let file = File::create(&path)
            .with_context(|| format!("Failed to create info file {}", path.display()))?;
        let mut file = BufWriter::new(file);
        for (key, value) in self.info.iter() {
            writeln!(file, "{}:{}", key, value)?;
        }
        writeln!(file)?;
        file.flush()?;

        tracing::info!("Wrote session info to {}", path.display());
        Ok(path)
    }

    /// Open the CSV data file and write the header line.
    ///
    /// The default base name is `{experiment}_{subject}` with the subject
    /// number zero-padded to three digits; a supplied name has any
    /// trailing `.csv` stripped first. Collisions follow the session's
    /// overwrite policy. The handle stays with the recorder until
    /// [`SessionRecorder::close`].
    pub fn open_data_file(&mut self, base_name: Option<&str>) -> Result<PathBuf> {
        if self.state != SessionState::InfoCaptured {
            return Err(self.invalid_state("open_data_file"));
        }

        let base = match base_name {
            Some(name) => strip_extension(name, "csv").to_string(),
            None => format!(
                "{}_{}",
                self.experiment_name,
                pad_subject_number(self.info.subject_number())
            ),
        };

        let path = self.overwrite.resolve(&self.data_dir, &base, "csv");

        let file = File::create(&path)
            .with_context(|| format!("Failed to create data file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        let header: Vec<String> = self
            .field_schema
            .iter()
            .map(|field| format!("\"{}\"", field))
            .collect();
        writeln!(writer, "{}", header.join(","))?;
        writer.flush()?;

        tracing::info!("Opened data file {}", path.display());

        self.writer = Some(writer);
        self.data_path = Some(path.clone());
        self.state = SessionState::DataFileOpen;
        Ok(path)
    }

    /// Extend the in-memory data log. Does not touch disk.
    ///
    /// Row keys are not validated: unknown keys are ignored at flush time
    /// and missing schema fields are flushed as `NA`.
    pub fn append_rows(&mut self, rows: impl IntoIterator<Item = TrialRow>) -> Result<()> {
        if !self.state.is_open() {
            return Err(self.invalid_state("append_rows"));
        }
        self.rows.extend(rows);
        self.state = SessionState::Recording;
        Ok(())
    }

    /// Append a single row; see [`SessionRecorder::append_rows`]
    pub fn append_row(&mut self, row: TrialRow) -> Result<()> {
        self.append_rows(std::iter::once(row))
    }

    /// Append every row past the flush cursor to the data file.
    ///
    /// Returns the number of lines written. Calling flush again with no
    /// new rows writes nothing; the cursor only moves forward. The OS
    /// handle is flushed before returning, so the file can be inspected
    /// externally between calls.
    pub fn flush(&mut self) -> Result<usize> {
        if !self.state.is_open() {
            return Err(self.invalid_state("flush"));
        }
        let state = self.state.display_name();
        let writer = self.writer.as_mut().ok_or(LabRecError::InvalidState {
            operation: "flush",
            state,
        })?;

        let pending = &self.rows[self.lines_written..];
        for row in pending {
            let line: Vec<String> = self
                .field_schema
                .iter()
                .map(|field| match row.get(field) {
                    Some(value) => format!("\"{}\"", value),
                    None => format!("\"{}\"", MISSING_TOKEN),
                })
                .collect();
            writeln!(writer, "{}", line.join(","))?;
        }
        writer.flush()?;

        let written = pending.len();
        self.lines_written = self.rows.len();
        tracing::debug!(
            "Flushed {} rows ({} total on disk)",
            written,
            self.lines_written
        );
        Ok(written)
    }

    /// Write the crash-recovery snapshot, overwriting the previous one.
    ///
    /// The snapshot file is `{experiment}_{subject}.snapshot` in the data
    /// directory. Extra fields are merged on top of the session state and
    /// win on key collision. Intended to be called after each trial block;
    /// a crash then loses at most the rows since the last call.
    pub fn snapshot(
        &mut self,
        extras: Option<&IndexMap<String, serde_json::Value>>,
    ) -> Result<PathBuf> {
        if !self.state.is_open() {
            return Err(self.invalid_state("snapshot"));
        }

        let path = self.data_dir.join(format!(
            "{}_{}.snapshot",
            self.experiment_name,
            pad_subject_number(self.info.subject_number())
        ));

        let snapshot = Snapshot {
            experiment_name: self.experiment_name.clone(),
            field_schema: self.field_schema.clone(),
            rows: self.rows.clone(),
            lines_written: self.lines_written,
            session_info: self.info.clone(),
            data_filename: self.data_path.clone(),
            created_at: chrono::Utc::now(),
        };

        let empty = IndexMap::new();
        snapshot.write_to_file(&path, extras.unwrap_or(&empty))?;

        tracing::debug!("Snapshot written to {}", path.display());
        Ok(path)
    }

    /// End the session: flush outstanding rows and release the file handle.
    ///
    /// Valid once, from any open state. Further appends or flushes return
    /// a state error.
    pub fn close(&mut self) -> Result<()> {
        if !self.state.is_open() {
            return Err(self.invalid_state("close"));
        }

        self.flush()?;
        // flush() drained the buffer; dropping the writer releases the handle.
        self.writer = None;
        self.state = SessionState::Closed;

        tracing::info!(
            "Session closed after {} rows in {}",
            self.lines_written,
            self.data_path
                .as_deref()
                .unwrap_or_else(|| Path::new("?"))
                .display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::naming::NeverOverwrite;
    use crate::session::types::TrialValue;
    use indexmap::indexmap;

    fn test_config(dir: &Path) -> ExperimentConfig {
        let mut config = ExperimentConfig::new("test_exp", ["Trial", "RT"]);
        config.data_dir = dir.to_path_buf();
        config
    }

    fn recorder_with_info(dir: &Path) -> SessionRecorder {
        let mut recorder = SessionRecorder::new(&test_config(dir), Box::new(NeverOverwrite));
        recorder
            .capture_info(SessionInfo::with_default_fields())
            .unwrap();
        recorder
    }

    #[test]
    fn test_lifecycle_states() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = SessionRecorder::new(&test_config(dir.path()), Box::new(NeverOverwrite));
        assert_eq!(recorder.state(), SessionState::Uninitialized);

        recorder
            .capture_info(SessionInfo::with_default_fields())
            .unwrap();
        assert_eq!(recorder.state(), SessionState::InfoCaptured);

        recorder.open_data_file(None).unwrap();
        assert_eq!(recorder.state(), SessionState::DataFileOpen);

        recorder
            .append_row(indexmap! {"Trial".to_string() => TrialValue::from(1)})
            .unwrap();
        assert_eq!(recorder.state(), SessionState::Recording);

        recorder.close().unwrap();
        assert_eq!(recorder.state(), SessionState::Closed);
    }

    #[test]
    fn test_operations_rejected_before_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = SessionRecorder::new(&test_config(dir.path()), Box::new(NeverOverwrite));

        assert!(matches!(
            recorder.flush(),
            Err(LabRecError::InvalidState { operation: "flush", .. })
        ));
        assert!(matches!(
            recorder.append_row(TrialRow::new()),
            Err(LabRecError::InvalidState { .. })
        ));
        assert!(matches!(
            recorder.open_data_file(None),
            Err(LabRecError::InvalidState { .. })
        ));
        assert!(matches!(
            recorder.snapshot(None),
            Err(LabRecError::InvalidState { .. })
        ));
        assert!(matches!(
            recorder.write_session_info(None),
            Err(LabRecError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_operations_rejected_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_info(dir.path());
        recorder.open_data_file(None).unwrap();
        recorder.close().unwrap();

        assert!(matches!(
            recorder.append_row(TrialRow::new()),
            Err(LabRecError::InvalidState { .. })
        ));
        assert!(matches!(
            recorder.flush(),
            Err(LabRecError::InvalidState { .. })
        ));
        assert!(matches!(
            recorder.write_session_info(None),
            Err(LabRecError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_reopen_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_info(dir.path());
        recorder.open_data_file(None).unwrap();

        assert!(matches!(
            recorder.open_data_file(None),
            Err(LabRecError::InvalidState { operation: "open_data_file", .. })
        ));
    }

    #[test]
    fn test_capture_info_valid_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_info(dir.path());
        assert!(matches!(
            recorder.capture_info(SessionInfo::new()),
            Err(LabRecError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_default_data_filename_pads_subject() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = SessionRecorder::new(&test_config(dir.path()), Box::new(NeverOverwrite));
        recorder
            .capture_info(SessionInfo::with_default_fields().with_field("Subject Number", "7"))
            .unwrap();

        let path = recorder.open_data_file(None).unwrap();
        assert_eq!(path, dir.path().join("test_exp_007.csv"));
    }

    #[test]
    fn test_header_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_info(dir.path());
        let path = recorder.open_data_file(None).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "\"Trial\",\"RT\"\n");
    }

    #[test]
    fn test_flush_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_info(dir.path());
        let path = recorder.open_data_file(None).unwrap();

        recorder
            .append_rows(vec![
                indexmap! {
                    "Trial".to_string() => TrialValue::from(1),
                    "RT".to_string() => TrialValue::from(350),
                },
                indexmap! {
                    "Trial".to_string() => TrialValue::from(2),
                    "RT".to_string() => TrialValue::from(512),
                },
            ])
            .unwrap();

        assert_eq!(recorder.flush().unwrap(), 2);
        assert_eq!(recorder.flush().unwrap(), 0);
        assert_eq!(recorder.lines_written(), 2);

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 3); // header + 2 rows
    }

    #[test]
    fn test_missing_field_written_as_na() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_info(dir.path());
        let path = recorder.open_data_file(None).unwrap();

        recorder
            .append_row(indexmap! {"Trial".to_string() => TrialValue::from(1)})
            .unwrap();
        recorder.flush().unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().nth(1).unwrap(), "\"1\",\"NA\"");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_info(dir.path());
        let path = recorder.open_data_file(None).unwrap();

        recorder
            .append_row(indexmap! {
                "Trial".to_string() => TrialValue::from(1),
                "RT".to_string() => TrialValue::from(420),
                "Scratch".to_string() => TrialValue::from("ignored"),
            })
            .unwrap();
        recorder.flush().unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().nth(1).unwrap(), "\"1\",\"420\"");
    }

    #[test]
    fn test_close_flushes_pending_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_info(dir.path());
        let path = recorder.open_data_file(None).unwrap();

        recorder
            .append_row(indexmap! {"Trial".to_string() => TrialValue::from(1)})
            .unwrap();
        recorder.close().unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(matches!(
            recorder.close(),
            Err(LabRecError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_snapshot_written_and_restorable() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_info(dir.path());
        recorder.open_data_file(None).unwrap();
        recorder
            .append_row(indexmap! {"Trial".to_string() => TrialValue::from(1)})
            .unwrap();
        recorder.flush().unwrap();
        recorder
            .append_row(indexmap! {"Trial".to_string() => TrialValue::from(2)})
            .unwrap();

        let path = recorder.snapshot(None).unwrap();
        assert_eq!(path, dir.path().join("test_exp_000.snapshot"));

        let restored = Snapshot::read_from_file(&path).unwrap();
        assert_eq!(restored.experiment_name, "test_exp");
        assert_eq!(restored.rows.len(), 2);
        assert_eq!(restored.lines_written, 1);
    }

    #[test]
    fn test_snapshot_overwrites_previous_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_info(dir.path());
        recorder.open_data_file(None).unwrap();

        recorder.snapshot(None).unwrap();
        recorder
            .append_row(indexmap! {"Trial".to_string() => TrialValue::from(1)})
            .unwrap();
        let path = recorder.snapshot(None).unwrap();

        let restored = Snapshot::read_from_file(&path).unwrap();
        assert_eq!(restored.rows.len(), 1);
    }
}
