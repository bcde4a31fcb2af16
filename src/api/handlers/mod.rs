//! API request handlers.

/// Chat and session handlers.
pub mod chat;
/// Index rebuild and statistics handlers.
pub mod index;

use axum::Json;
use serde_json::{Value, json};

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
