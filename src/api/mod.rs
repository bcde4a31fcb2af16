//! HTTP API built on axum.
//!
//! # Endpoints
//!
//! - `GET /health` - liveness probe
//! - `POST /api/chat` - ask a question (`{message, session_id?}`)
//! - `DELETE /api/sessions/{id}` - forget a session's memory
//! - `POST /api/index/rebuild` - rebuild the index from the corpus
//! - `GET /api/index/stats` - index size, metric and generation

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
