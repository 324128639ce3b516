#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderValue, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use titanic_api::config::{install_root, LogFormat, ServerConfig};
use titanic_api::router::build_app_router;
use titanic_api::state::AppState;
use titanic_core::error::CoreError;
use titanic_core::model::{self, Predictor, SharedPredictor};
use titanic_core::passenger::FeatureRow;

/// Path of the pinned reference artifact shipped at the workspace root.
pub fn reference_model_path() -> PathBuf {
    model::default_model_path(&install_root())
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(model_path: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![HeaderValue::from_static("http://localhost:5173")],
        model_path,
        tracking_dir: None,
        log_format: LogFormat::Text,
    }
}

/// Build the full application router around the given predictor.
pub fn build_test_app(model: SharedPredictor) -> Router {
    let config = test_config(reference_model_path());
    let state = AppState {
        config: Arc::new(config.clone()),
        model,
    };
    build_app_router(state, &config)
}

/// Build the router around the reference artifact, loaded the same way the
/// binary loads it.
pub fn build_reference_app() -> Router {
    let forest = model::load_model(&reference_model_path()).expect("reference artifact loads");
    build_test_app(Arc::new(forest))
}

// ---------------------------------------------------------------------------
// Substitute predictors
// ---------------------------------------------------------------------------

/// Returns a fixed class and records every row it is asked about.
pub struct RecordingPredictor {
    class: i64,
    calls: AtomicUsize,
    rows: Mutex<Vec<FeatureRow>>,
}

impl RecordingPredictor {
    pub fn new(class: i64) -> Arc<Self> {
        Arc::new(Self {
            class,
            calls: AtomicUsize::new(0),
            rows: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<FeatureRow> {
        self.rows.lock().unwrap().clone()
    }
}

impl Predictor for RecordingPredictor {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<i64>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().unwrap().extend_from_slice(rows);
        Ok(vec![self.class; rows.len()])
    }
}

/// Blocks for a fixed delay before answering with class 1.
pub struct SlowPredictor(pub Duration);

impl Predictor for SlowPredictor {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<i64>, CoreError> {
        std::thread::sleep(self.0);
        Ok(vec![1; rows.len()])
    }
}

/// Always fails, standing in for an unexpected error inside the model.
pub struct FailingPredictor;

impl Predictor for FailingPredictor {
    fn predict(&self, _rows: &[FeatureRow]) -> Result<Vec<i64>, CoreError> {
        Err(CoreError::Prediction(
            "estimator exploded: secret internals".to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response {
    post_raw(app, uri, serde_json::to_vec(&json).unwrap()).await
}

pub async fn post_raw(app: Router, uri: &str, body: impl Into<Body>) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
