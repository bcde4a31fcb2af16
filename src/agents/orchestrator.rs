use crate::{
    agents::{
        assembler::ContextAssembler,
        router::QueryRouter,
        synthesizer::{AnswerSynthesizer, CANNOT_ANSWER_MESSAGE},
    },
    db::segment_index::SegmentIndex,
    llm::LLMClient,
    memory::{MemoryBuffer, SessionStore},
    rag::{embeddings::Embedder, retriever::LocalRetriever},
    tools::search::WebRetriever,
    types::{Answer, AppError, Result, Route},
    utils::toml_config::SubotConfig,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Runs the full pipeline for one query: route, assemble, synthesize,
/// remember.
pub struct Assistant {
    router: QueryRouter,
    assembler: ContextAssembler,
    synthesizer: AnswerSynthesizer,
    sessions: Arc<SessionStore>,
}

impl Assistant {
    pub fn new(
        router: QueryRouter,
        assembler: ContextAssembler,
        synthesizer: AnswerSynthesizer,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            router,
            assembler,
            synthesizer,
            sessions,
        }
    }

    /// Wire the pipeline from configuration and its collaborators.
    pub fn from_config(
        config: &SubotConfig,
        index: SegmentIndex,
        embedder: Arc<dyn Embedder>,
        web: WebRetriever,
        llm: Arc<dyn LLMClient>,
    ) -> Self {
        let local = LocalRetriever::new(embedder, index, config.retrieval.clone());
        Self::new(
            QueryRouter::new(local, web, config.router.clone()),
            ContextAssembler::from_config(&config.assembler),
            AnswerSynthesizer::new(llm, config.synthesizer.clone()),
            Arc::new(SessionStore::new(config.memory.clone())),
        )
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Answer `query` within a session, creating one when `session_id`
    /// is `None`. Returns the session id with the answer.
    #[instrument(skip(self, query), fields(session = session_id.unwrap_or("new")))]
    pub async fn ask(&self, session_id: Option<&str>, query: &str) -> Result<(String, Answer)> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput("message must not be empty".to_string()));
        }

        let (id, memory) = self.sessions.get_or_create(session_id);
        let mut memory = memory.lock().await;
        let answer = self.answer(&mut memory, query).await;
        Ok((id, answer))
    }

    /// Pipeline over an explicit memory buffer.
    pub async fn answer(&self, memory: &mut MemoryBuffer, query: &str) -> Answer {
        let outcome = self.router.route(query, memory.last()).await;

        if outcome.route == Route::None {
            info!(degraded = ?outcome.degraded, "No retrieval path available");
            return Answer {
                text: CANNOT_ANSWER_MESSAGE.to_string(),
                citations: Vec::new(),
                route: Route::None,
                degraded: outcome.degraded,
                grounded: false,
            };
        }

        let context = self.assembler.assemble(outcome.items);
        let synthesis = self.synthesizer.answer(query, &context, memory).await;

        info!(
            route = %outcome.route,
            citations = context.citations.len(),
            generated = synthesis.generated,
            "Query answered"
        );

        let grounded = synthesis.generated && !context.is_empty();
        Answer {
            text: synthesis.text,
            citations: if synthesis.generated {
                context.citations
            } else {
                Vec::new()
            },
            route: outcome.route,
            degraded: outcome.degraded,
            grounded,
        }
    }
}
