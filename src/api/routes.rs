use crate::AppState;
use crate::api::handlers;
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Routes mounted under `/api`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/chat", post(handlers::chat::chat))
        .route(
            "/sessions/{session_id}",
            delete(handlers::chat::reset_session),
        )
        .route("/index/rebuild", post(handlers::index::rebuild))
        .route("/index/stats", get(handlers::index::stats))
}

/// The full application with middleware.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", create_router())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMClient;
    use crate::rag::embeddings::HashEmbedder;
    use crate::rag::indexer::IndexManager;
    use crate::tools::search::WebRetriever;
    use crate::types::Result;
    use crate::utils::toml_config::{ConfigManager, SubotConfig};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct EchoLLM;

    #[async_trait]
    impl LLMClient for EchoLLM {
        async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }
        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn app() -> Router {
        let config = SubotConfig::default();
        let embedder = Arc::new(HashEmbedder::new(config.embedding.dimensions).unwrap());
        let index_manager = IndexManager::in_memory(&config, embedder).unwrap();
        let state = AppState::with_parts(
            ConfigManager::from_config(config),
            index_manager,
            WebRetriever::new(None, 5, Duration::from_secs(1)),
            Arc::new(EchoLLM),
        );
        create_app(state)
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let message = "a".repeat(MAX_BODY_BYTES + 1);
        let payload = serde_json::json!({ "message": message }).to_string();
        let response = app()
            .oneshot(
                Request::post("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let response = app()
            .oneshot(
                Request::delete("/api/sessions/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
