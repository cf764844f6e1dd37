//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use labrec_rs::config::ExperimentConfig;
use labrec_rs::session::{OverwritePrompt, TrialRow, TrialValue};

/// Build a trial row from field/value pairs
pub fn row(fields: &[(&str, TrialValue)]) -> TrialRow {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// A config writing into `dir` with the given schema
pub fn config_in(dir: &Path, name: &str, fields: &[&str]) -> ExperimentConfig {
    let mut config = ExperimentConfig::new(name, fields.iter().copied());
    config.data_dir = dir.to_path_buf();
    config
}

/// Overwrite prompt that pops queued answers and counts invocations
pub struct QueuedPrompt {
    answers: Vec<bool>,
    asked: Arc<AtomicUsize>,
}

impl QueuedPrompt {
    pub fn new(answers: Vec<bool>) -> (Self, Arc<AtomicUsize>) {
        let asked = Arc::new(AtomicUsize::new(0));
        (
            Self {
                answers,
                asked: asked.clone(),
            },
            asked,
        )
    }
}

impl OverwritePrompt for QueuedPrompt {
    fn confirm_overwrite(&mut self, _path: &Path) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answers.remove(0)
    }
}
