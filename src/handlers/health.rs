use axum::{Json, http::Uri};
use serde_json::{Value, json};

use crate::LandwatchError;

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /
pub async fn index() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn not_found(uri: Uri) -> LandwatchError {
    LandwatchError::NotFound(format!("no route for {}", uri.path()))
}
