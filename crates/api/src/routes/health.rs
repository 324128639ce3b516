use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Liveness message returned by `GET /`.
pub const RUNNING_MESSAGE: &str = "Titanic Survival Prediction API is running!";

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// GET / -- constant liveness response; does not touch the model.
async fn read_root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: RUNNING_MESSAGE,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(read_root))
}
