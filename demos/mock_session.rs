//! Runs a complete mock session with no hardware attached.
//!
//! ```bash
//! cargo run --example mock_session
//! ```
//!
//! Writes a CSV data file, an info file and a snapshot into a temporary
//! directory, printing the paths as it goes.

use anyhow::Result;
use labrec_rs::config::ExperimentConfig;
use labrec_rs::device::{EdfName, NoopEegRemote, NoopEyeTracker, TrackedEye};
use labrec_rs::session::{AlwaysOverwrite, SessionInfo, TrialValue};
use labrec_rs::Experiment;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,labrec_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let out_dir = tempfile::tempdir()?;
    tracing::info!("Writing session files into {}", out_dir.path().display());

    let mut config = ExperimentConfig::new("mock_study", ["Trial", "Condition", "RT", "Correct"]);
    config.data_dir = out_dir.path().to_path_buf();

    let mut experiment = Experiment::new(config, Box::new(AlwaysOverwrite))
        .with_eye_tracker(Box::new(NoopEyeTracker::new(
            EdfName::new("m001.edf").unwrap(),
            TrackedEye::Both,
        )))
        .with_eeg(Box::new(NoopEegRemote::new()));

    let info = SessionInfo::with_default_fields()
        .with_field("Subject Number", "1")
        .with_field("Condition Order", "ABBA");
    experiment.recorder_mut().capture_info(info)?;

    let info_path = experiment.recorder_mut().write_session_info(None)?;
    let data_path = experiment.recorder_mut().open_data_file(None)?;

    experiment.begin_run()?;

    for block in 0..2 {
        let rows: Vec<_> = (0..5)
            .map(|i| {
                let trial = block * 5 + i;
                [
                    ("Trial".to_string(), TrialValue::from(trial + 1)),
                    (
                        "Condition".to_string(),
                        TrialValue::from(if block == 0 { "A" } else { "B" }),
                    ),
                    ("RT".to_string(), TrialValue::from(300 + 17 * trial)),
                    ("Correct".to_string(), TrialValue::from(trial % 4 != 3)),
                ]
                .into_iter()
                .collect::<labrec_rs::TrialRow>()
            })
            .collect();

        experiment.recorder_mut().append_rows(rows)?;
        experiment.recorder_mut().flush()?;

        let extras = indexmap::indexmap! {
            "block".to_string() => serde_json::json!(block),
        };
        experiment.checkpoint(Some(&extras))?;
    }

    experiment.end_run()?;

    println!("info file: {}", info_path.display());
    println!("data file: {}", data_path.display());
    println!("--- data file contents ---");
    print!("{}", std::fs::read_to_string(&data_path)?);

    Ok(())
}
