//! Handler for `POST /predict`.
//!
//! The body is taken as raw bytes so that malformed JSON, missing fields and
//! mistyped fields all go through the same schema validation and produce the
//! same 422 shape. The model is only reached with a fully validated request.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use titanic_core::model::{self, SurvivalLabel};
use titanic_core::passenger;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: SurvivalLabel,
}

/// Validate the passenger, predict, and map the class to its label.
pub async fn predict_survival(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<PredictionResponse>> {
    let request = passenger::parse_request(&body)?;

    let row = request.feature_row();
    let label = model::predict_label(state.model.as_ref(), row)?;

    tracing::debug!(?row, prediction = label.as_str(), "Prediction served");

    Ok(Json(PredictionResponse { prediction: label }))
}
