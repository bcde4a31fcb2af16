//! Shared fixtures for the integration tests.

#![allow(dead_code)]

pub mod mocks;

use mocks::{MockLLMClient, MockWebSearch};
use std::sync::Arc;
use std::time::Duration;
use subot::rag::embeddings::{Embedder, HashEmbedder};
use subot::tools::search::WebRetriever;
use subot::types::Document;
use subot::{Assistant, ConfigManager, IndexManager, SubotConfig};

pub const DIMENSIONS: usize = 1024;

/// Web search timeout used by [`web_retriever`].
pub const WEB_TIMEOUT: Duration = Duration::from_millis(200);

/// Config tuned for the hash embedder: short documents sharing most
/// query words clear `high_confidence`.
pub fn test_config() -> SubotConfig {
    let mut config = SubotConfig::default();
    config.embedding.dimensions = DIMENSIONS;
    config.chunking.max_chars = 400;
    config.chunking.overlap_chars = 50;
    config.retrieval.min_score = 0.0;
    config.router.high_confidence = 0.4;
    config.router.low_confidence = 0.2;
    config.synthesizer.retry_backoff_ms = 1;
    config.web_search.timeout_ms = WEB_TIMEOUT.as_millis() as u64;
    config
}

pub fn hash_embedder() -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(DIMENSIONS).expect("dimensions > 0"))
}

pub fn campus_documents() -> Vec<Document> {
    vec![
        Document::new("it_faculty", "Dr. Vivaksha Jariwala is HOD of IT")
            .with_source_url("https://www.scet.ac.in/departments/it/faculty"),
        Document::new("admissions", "Admission to SCET opens in June every year"),
    ]
}

pub fn web_retriever(search: MockWebSearch) -> WebRetriever {
    WebRetriever::new(Some(Arc::new(search)), 5, WEB_TIMEOUT)
}

/// In-memory index built from `documents`.
pub async fn index_manager(config: &SubotConfig, documents: &[Document]) -> IndexManager {
    let manager = IndexManager::in_memory(config, hash_embedder()).expect("index manager");
    if !documents.is_empty() {
        manager
            .rebuild_from(documents)
            .await
            .expect("rebuild from documents");
    }
    manager
}

/// Full pipeline over an in-memory index.
pub async fn assistant(
    documents: &[Document],
    search: MockWebSearch,
    llm: MockLLMClient,
) -> Assistant {
    let config = test_config();
    let manager = index_manager(&config, documents).await;
    Assistant::from_config(
        &config,
        manager.index().clone(),
        manager.embedder().clone(),
        web_retriever(search),
        Arc::new(llm),
    )
}

/// Shared app state over an in-memory index.
pub async fn app_state(
    config: SubotConfig,
    documents: &[Document],
    search: MockWebSearch,
    llm: MockLLMClient,
) -> subot::AppState {
    let manager = index_manager(&config, documents).await;
    subot::AppState::with_parts(
        ConfigManager::from_config(config),
        manager,
        web_retriever(search),
        Arc::new(llm),
    )
}
