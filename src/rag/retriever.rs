//! Local retrieval over the segment index.

use crate::db::segment_index::SegmentIndex;
use crate::rag::embeddings::Embedder;
use crate::types::{RetrievedItem, Result};
use crate::utils::toml_config::RetrievalConfig;
use crate::utils::truncate_chars;
use std::sync::Arc;
use tracing::debug;

const QUESTION_WORDS: &[&str] = &[
    "what", "who", "where", "when", "why", "how", "is", "are", "do", "does", "did", "can",
    "could",
];

/// Drop question words so the embedding reflects the subject of the query.
///
/// Returns the query unchanged if nothing else would remain.
pub fn strip_question_words(query: &str) -> String {
    let kept: Vec<&str> = query
        .split_whitespace()
        .filter(|word| {
            let bare = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            !QUESTION_WORDS.contains(&bare.as_str())
        })
        .collect();

    if kept.is_empty() {
        query.trim().to_string()
    } else {
        kept.join(" ")
    }
}

/// Best score among `items`, if any.
pub fn top_score(items: &[RetrievedItem]) -> Option<f32> {
    items.iter().map(|item| item.score).reduce(f32::max)
}

/// Embeds queries and looks them up in the segment index.
#[derive(Clone)]
pub struct LocalRetriever {
    embedder: Arc<dyn Embedder>,
    index: SegmentIndex,
    config: RetrievalConfig,
}

impl LocalRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: SegmentIndex, config: RetrievalConfig) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Top-k segments for `query`, best first.
    ///
    /// An empty index returns no items without calling the embedder.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedItem>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let text = if self.config.strip_question_words {
            strip_question_words(query)
        } else {
            query.trim().to_string()
        };

        let vector = self.embedder.embed(&text).await?;
        let hits = self
            .index
            .search(&vector, self.config.top_k, self.config.min_score)?;

        debug!(query = %text, hits = hits.len(), "Local retrieval");

        Ok(hits
            .into_iter()
            .map(|(segment, score)| {
                let mut item = RetrievedItem::local(&segment, score);
                let capped = truncate_chars(&item.text, self.config.max_snippet_chars);
                if capped.len() < item.text.len() {
                    item.text = capped.to_string();
                }
                item
            })
            .collect())
    }
}
