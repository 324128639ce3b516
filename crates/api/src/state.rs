use std::sync::Arc;

use titanic_core::error::CoreError;
use titanic_core::model::{self, SharedPredictor};
use titanic_core::tracking::{self, RunParams, RunTracker};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The loaded classifier. Read-only for the life of the process.
    pub model: SharedPredictor,
}

impl AppState {
    /// Load the model artifact named by `config` and record the startup run.
    ///
    /// Fails with [`CoreError::ModelNotFound`] or [`CoreError::ModelFormat`]
    /// when the artifact cannot be used; the caller must not start serving.
    pub fn load(config: ServerConfig, tracker: &dyn RunTracker) -> Result<Self, CoreError> {
        let forest = model::load_model(&config.model_path)?;
        tracking::record_startup_run(tracker, RunParams::for_model(&forest, &config.model_path));

        Ok(Self {
            config: Arc::new(config),
            model: Arc::new(forest),
        })
    }
}
