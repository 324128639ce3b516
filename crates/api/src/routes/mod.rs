pub mod health;
pub mod predict;

use axum::Router;

use crate::state::AppState;

/// Build the route tree.
///
/// ```text
/// /            GET   liveness message
/// /predict     POST  survival prediction
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(predict::router())
}
