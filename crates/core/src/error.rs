use std::path::PathBuf;

use crate::passenger::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(
        "Model artifact not found at {}. Run the model-creation procedure to produce it.",
        .path.display()
    )]
    ModelNotFound { path: PathBuf },

    #[error("Model artifact at {} is invalid: {reason}", .path.display())]
    ModelFormat { path: PathBuf, reason: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Prediction failed: {0}")]
    Prediction(String),
}
