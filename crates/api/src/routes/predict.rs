use axum::routing::post;
use axum::Router;

use crate::handlers::predict;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/predict", post(predict::predict_survival))
}
