//! Index lifecycle.
//!
//! [`IndexManager`] owns the process-wide [`SegmentIndex`]. It builds the
//! index from the corpus (chunk, embed, swap), persists it, and restores
//! it at startup. Rebuilds are serialized; searches keep running against
//! the previous snapshot until the new one is swapped in.

use crate::db::segment_index::SegmentIndex;
use crate::rag::chunker::TextChunker;
use crate::rag::corpus::load_corpus;
use crate::rag::embeddings::Embedder;
use crate::types::{AppError, Document, RebuildResponse, Result, Segment};
use crate::utils::toml_config::{CorpusConfig, SubotConfig};
use std::sync::Arc;
use std::time::Instant;
use subot_vector::IndexStats;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// How the index came to be at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum StartupOutcome {
    /// Loaded from disk with this many segments.
    Loaded(usize),
    /// Built from the corpus.
    Rebuilt(RebuildResponse),
    /// Nothing usable; serving with an empty index.
    Empty,
}

pub struct IndexManager {
    corpus: CorpusConfig,
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    index: SegmentIndex,
    batch_size: usize,
    rebuild_lock: Mutex<()>,
}

impl IndexManager {
    /// Manager whose index is persisted under `config.index.data_path`.
    pub fn new(config: &SubotConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let index = SegmentIndex::persistent(
            &config.index.data_path,
            embedder.dimensions(),
            config.metric(),
        )?;
        Self::with_index(config, embedder, index)
    }

    /// Manager with a memory-only index.
    pub fn in_memory(config: &SubotConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let index = SegmentIndex::in_memory(embedder.dimensions(), config.metric())?;
        Self::with_index(config, embedder, index)
    }

    fn with_index(
        config: &SubotConfig,
        embedder: Arc<dyn Embedder>,
        index: SegmentIndex,
    ) -> Result<Self> {
        Ok(Self {
            corpus: config.corpus.clone(),
            chunker: TextChunker::from_config(&config.chunking)?,
            embedder,
            index,
            batch_size: config.embedding.batch_size.max(1),
            rebuild_lock: Mutex::new(()),
        })
    }

    pub fn index(&self) -> &SegmentIndex {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    /// Rebuild from the configured corpus directory and persist the result.
    #[instrument(skip(self))]
    pub async fn rebuild(&self) -> Result<RebuildResponse> {
        let _guard = self.rebuild_lock.lock().await;
        let started = Instant::now();

        let corpus = load_corpus(&self.corpus.dir, &self.corpus.manifest).await?;
        let mut report = self.build_locked(&corpus.documents, started).await?;
        report.skipped += corpus.skipped.len();

        if let Err(e) = self.index.persist().await {
            error!(error = %e, "Index rebuilt but could not be persisted");
        }
        Ok(report)
    }

    /// Rebuild from documents supplied by the caller. Not persisted.
    pub async fn rebuild_from(&self, documents: &[Document]) -> Result<RebuildResponse> {
        let _guard = self.rebuild_lock.lock().await;
        self.build_locked(documents, Instant::now()).await
    }

    async fn build_locked(&self, documents: &[Document], started: Instant) -> Result<RebuildResponse> {
        let mut segments: Vec<Segment> = Vec::new();
        let mut indexed = 0;
        let mut skipped = 0;

        for doc in documents {
            match self.chunker.segments(doc) {
                Ok(iter) => {
                    segments.extend(iter);
                    indexed += 1;
                }
                Err(e) => {
                    warn!(doc_id = %doc.id, error = %e, "Skipping document");
                    skipped += 1;
                }
            }
        }

        let vectors = self.embed_segments(&segments).await?;
        let segment_count = segments.len();
        self.index.build(segments, vectors)?;

        let report = RebuildResponse {
            documents: indexed,
            skipped,
            segments: segment_count,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            documents = report.documents,
            skipped = report.skipped,
            segments = report.segments,
            elapsed_ms = report.elapsed_ms,
            "Index rebuilt"
        );
        Ok(report)
    }

    async fn embed_segments(&self, segments: &[Segment]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(segments.len());
        for batch in segments.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|s| s.text.clone()).collect();
            let embedded = self.embedder.embed_batch(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(AppError::Embedding(format!(
                    "expected {} vectors, got {}",
                    texts.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    /// Load the persisted index without touching the corpus or the files.
    ///
    /// `Ok(None)` when nothing has been persisted yet.
    pub async fn load(&self) -> Result<Option<usize>> {
        if !self.index.has_persisted() {
            return Ok(None);
        }
        self.index.load().await.map(Some)
    }

    /// Restore the index at startup.
    ///
    /// A persisted index is loaded when present. A corrupt one, or none
    /// at all when `rebuild_on_start` is set, triggers a rebuild from the
    /// corpus. If that fails too the index stays empty and queries route
    /// to the web.
    pub async fn load_or_rebuild(&self, rebuild_on_start: bool) -> StartupOutcome {
        if self.index.has_persisted() {
            match self.index.load().await {
                Ok(count) => {
                    info!(count, "Loaded persisted index");
                    return StartupOutcome::Loaded(count);
                }
                Err(e) => warn!(error = %e, "Persisted index unusable, rebuilding from corpus"),
            }
        } else if !rebuild_on_start {
            info!("No persisted index; starting empty");
            return StartupOutcome::Empty;
        }

        match self.rebuild().await {
            Ok(report) => StartupOutcome::Rebuilt(report),
            Err(e) => {
                error!(error = %e, "Rebuild failed; serving with an empty index");
                StartupOutcome::Empty
            }
        }
    }
}
