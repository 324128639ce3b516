//! Startup run tracking.
//!
//! Records which model the service loaded, once, at startup. Tracking has no
//! read path and never affects serving: a tracker failure is logged and
//! startup continues.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ForestModel;

/// Experiment every startup run is filed under.
pub const EXPERIMENT_NAME: &str = "Titanic Survival Prediction API";

/// File the [`FileTracker`] appends to, inside its directory.
pub const RUNS_FILE_NAME: &str = "runs.jsonl";

/// The three static parameters logged per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParams {
    pub model_name: String,
    pub model_version: String,
    pub loaded_from: String,
}

impl RunParams {
    pub fn for_model(model: &ForestModel, path: &Path) -> Self {
        Self {
            model_name: model.model_name.clone(),
            model_version: model.model_version.clone(),
            loaded_from: path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub experiment: String,
    pub started_at: DateTime<Utc>,
    pub params: RunParams,
}

impl RunRecord {
    pub fn new(params: RunParams) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            experiment: EXPERIMENT_NAME.to_string(),
            started_at: Utc::now(),
            params,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Tracking I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tracking serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination for run records.
pub trait RunTracker: Send + Sync {
    fn record_run(&self, record: &RunRecord) -> Result<(), TrackingError>;
}

/// Emits each run as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTracker;

impl RunTracker for TracingTracker {
    fn record_run(&self, record: &RunRecord) -> Result<(), TrackingError> {
        tracing::info!(
            run_id = %record.run_id,
            experiment = %record.experiment,
            model_name = %record.params.model_name,
            model_version = %record.params.model_version,
            loaded_from = %record.params.loaded_from,
            "Recorded model run",
        );
        Ok(())
    }
}

/// Appends each run as one JSON line to `<dir>/runs.jsonl`.
#[derive(Debug, Clone)]
pub struct FileTracker {
    dir: PathBuf,
}

impl FileTracker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn runs_path(&self) -> PathBuf {
        self.dir.join(RUNS_FILE_NAME)
    }
}

impl RunTracker for FileTracker {
    fn record_run(&self, record: &RunRecord) -> Result<(), TrackingError> {
        std::fs::create_dir_all(&self.dir)?;
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.runs_path())?;
        file.write_all(&line)?;

        tracing::debug!(run_id = %record.run_id, path = %self.runs_path().display(), "Run appended");
        Ok(())
    }
}

/// Record the startup run. Failures are logged at warn and swallowed.
pub fn record_startup_run(tracker: &dyn RunTracker, params: RunParams) -> Option<RunRecord> {
    let record = RunRecord::new(params);
    match tracker.record_run(&record) {
        Ok(()) => Some(record),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to record model run, continuing startup");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingTracker;

    impl RunTracker for FailingTracker {
        fn record_run(&self, _record: &RunRecord) -> Result<(), TrackingError> {
            Err(TrackingError::Io(std::io::Error::other("disk full")))
        }
    }

    fn params() -> RunParams {
        RunParams {
            model_name: "RandomForestClassifier".to_string(),
            model_version: "1.0".to_string(),
            loaded_from: "/srv/titanic_model.json".to_string(),
        }
    }

    #[test]
    fn new_record_uses_fixed_experiment() {
        let record = RunRecord::new(params());
        assert_eq!(record.experiment, EXPERIMENT_NAME);
        assert_eq!(record.params, params());
    }

    #[test]
    fn file_tracker_creates_directory_and_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FileTracker::new(dir.path().join("tracking"));

        let first = record_startup_run(&tracker, params()).unwrap();
        let second = record_startup_run(&tracker, params()).unwrap();
        assert_ne!(first.run_id, second.run_id);

        let contents = std::fs::read_to_string(tracker.runs_path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: RunRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, first);
    }

    #[test]
    fn tracing_tracker_always_succeeds() {
        assert!(record_startup_run(&TracingTracker, params()).is_some());
    }

    #[test]
    fn tracker_failure_does_not_propagate() {
        assert!(record_startup_run(&FailingTracker, params()).is_none());
    }
}
