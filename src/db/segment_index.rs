//! Segment index backed by `subot-vector`.
//!
//! Maps [`Segment`]s to vector entries and back. The vector crate stores
//! the segment fields as metadata, so a persisted index can be loaded and
//! searched without the corpus being present.

use crate::types::{AppError, Result, Segment};
use std::path::PathBuf;
use subot_vector::{
    BuildStats, Config, DistanceMetric, IndexStats, VectorEntry, VectorMetadata, VectorStore,
};
use tracing::instrument;

const KEY_DOC_ID: &str = "doc_id";
const KEY_ORDINAL: &str = "ordinal";
const KEY_START: &str = "start";
const KEY_END: &str = "end";
const KEY_TEXT: &str = "text";
const KEY_SOURCE_URL: &str = "source_url";

/// Process-wide index of embedded segments.
#[derive(Clone, Debug)]
pub struct SegmentIndex {
    store: VectorStore,
}

impl SegmentIndex {
    /// In-memory index; nothing is written to disk.
    pub fn in_memory(dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        let store = VectorStore::new(Config::memory(dimensions).with_metric(metric))?;
        Ok(Self { store })
    }

    /// Index persisted under `path`. Starts empty; call [`load`](Self::load).
    pub fn persistent(path: impl Into<PathBuf>, dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        let store = VectorStore::new(Config::persistent(path, dimensions).with_metric(metric))?;
        Ok(Self { store })
    }

    /// Atomically replace the index with `segments`.
    ///
    /// `vectors[i]` must be the embedding of `segments[i]`.
    #[instrument(skip(self, segments, vectors), fields(count = segments.len()))]
    pub fn build(&self, segments: Vec<Segment>, vectors: Vec<Vec<f32>>) -> Result<BuildStats> {
        if segments.len() != vectors.len() {
            return Err(AppError::Embedding(format!(
                "{} segments but {} vectors",
                segments.len(),
                vectors.len()
            )));
        }

        let entries = segments
            .into_iter()
            .zip(vectors)
            .map(|(segment, vector)| segment_to_entry(segment, vector));

        Ok(self.store.build(entries)?)
    }

    /// Top-`k` segments for `query`, dropping hits below `min_score`.
    pub fn search(&self, query: &[f32], k: usize, min_score: f32) -> Result<Vec<(Segment, f32)>> {
        let hits = self.store.search_with_threshold(query, k, min_score)?;
        hits.into_iter()
            .map(|hit| {
                let segment = metadata_to_segment(&hit.id, &hit.metadata)?;
                Ok((segment, hit.score))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.store.dimensions()
    }

    pub fn stats(&self) -> IndexStats {
        self.store.stats()
    }

    pub async fn persist(&self) -> Result<()> {
        Ok(self.store.persist().await?)
    }

    /// Load the persisted index, returning the number of segments.
    pub async fn load(&self) -> Result<usize> {
        Ok(self.store.load().await?)
    }

    /// Whether a persisted file pair exists.
    pub fn has_persisted(&self) -> bool {
        self.store
            .config()
            .data_path
            .as_deref()
            .is_some_and(subot_vector::persistence::exists)
    }
}

fn segment_to_entry(segment: Segment, vector: Vec<f32>) -> VectorEntry {
    let mut metadata = VectorMetadata::new()
        .with(KEY_DOC_ID, segment.doc_id)
        .with(KEY_ORDINAL, segment.ordinal)
        .with(KEY_START, segment.start)
        .with(KEY_END, segment.end)
        .with(KEY_TEXT, segment.text);
    if let Some(url) = segment.source_url {
        metadata.insert(KEY_SOURCE_URL, url);
    }
    VectorEntry::new(segment.id, vector, metadata)
}

fn metadata_to_segment(id: &str, metadata: &VectorMetadata) -> Result<Segment> {
    let missing = |key: &str| AppError::IndexCorrupt(format!("segment '{}' lacks '{}'", id, key));
    let int = |key: &str| {
        metadata
            .get_int(key)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| missing(key))
    };

    Ok(Segment {
        id: id.to_string(),
        doc_id: metadata
            .get_string(KEY_DOC_ID)
            .ok_or_else(|| missing(KEY_DOC_ID))?
            .to_string(),
        ordinal: int(KEY_ORDINAL)?,
        text: metadata
            .get_string(KEY_TEXT)
            .ok_or_else(|| missing(KEY_TEXT))?
            .to_string(),
        start: int(KEY_START)?,
        end: int(KEY_END)?,
        source_url: metadata.get_string(KEY_SOURCE_URL).map(str::to_string),
    })
}
