//! # SU_BOT
//!
//! A retrieval-augmented campus assistant. Questions are answered from a
//! local index of the college's documents, from live web search, or both,
//! depending on how well the local index matches.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use subot::{AppState, ConfigManager};
//!
//! let config = ConfigManager::load_or_default("subot.toml")?;
//! let state = AppState::from_config(config)?;
//! state.index_manager.load_or_rebuild(true).await;
//!
//! let (session, answer) = state.assistant.ask(None, "Who is the HOD of IT?").await?;
//! println!("{}", answer.text);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama chat models (default) |
//! | `openai` | OpenAI API and compatible endpoints |
//! | `local-embeddings` | fastembed ONNX embedding models |
//!
//! ## Modules
//!
//! - [`rag`] - corpus loading, chunking, embeddings, indexing, local retrieval
//! - [`db`] - segment index on top of `subot-vector`
//! - [`tools`] - web search providers and the web retriever
//! - [`agents`] - router, context assembler, answer synthesizer
//! - [`memory`] - per-session conversation memory
//! - [`llm`] - LLM client implementations
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - command-line interface
//! - [`types`] - common types and error handling

#![warn(rustdoc::missing_crate_level_docs)]

/// Query pipeline: routing, assembly, synthesis.
pub mod agents;
/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Segment index storage.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Conversation memory.
pub mod memory;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Web search.
pub mod tools;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

pub use agents::Assistant;
pub use llm::{LLMClient, LLMClientFactory, Provider};
pub use rag::indexer::{IndexManager, StartupOutcome};
pub use types::{AppError, Result};
pub use utils::toml_config::{ConfigManager, SubotConfig};

use crate::rag::embeddings::create_embedder;
use crate::tools::search::WebRetriever;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML configuration
    pub config_manager: Arc<ConfigManager>,
    /// Owns the segment index and rebuilds it
    pub index_manager: Arc<IndexManager>,
    /// The query pipeline
    pub assistant: Arc<Assistant>,
}

impl AppState {
    /// Build every component from configuration.
    ///
    /// The index starts empty; call
    /// [`IndexManager::load_or_rebuild`] before serving.
    pub fn from_config(config_manager: ConfigManager) -> Result<Self> {
        let config = config_manager.config();
        let embedder = create_embedder(&config.embedding)?;
        let index_manager = IndexManager::new(&config, embedder)?;
        let web = WebRetriever::from_config(&config.web_search)?;
        let llm = LLMClientFactory::from_config(&config.llm)?.create_default()?;
        Ok(Self::with_parts(config_manager, index_manager, web, llm))
    }

    /// Assemble state from already-built parts.
    pub fn with_parts(
        config_manager: ConfigManager,
        index_manager: IndexManager,
        web: WebRetriever,
        llm: Arc<dyn LLMClient>,
    ) -> Self {
        let config = config_manager.config();
        let assistant = Assistant::from_config(
            &config,
            index_manager.index().clone(),
            index_manager.embedder().clone(),
            web,
            llm,
        );
        Self {
            config_manager: Arc::new(config_manager),
            index_manager: Arc::new(index_manager),
            assistant: Arc::new(assistant),
        }
    }
}
