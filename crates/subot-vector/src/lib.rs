//! # subot-vector
//!
//! An embedded vector index for SU_BOT's local retriever.
//!
//! The index is a flat, exact-scan structure. Readers take a snapshot
//! through [`VectorStore::snapshot`] or [`VectorStore::search`]; a rebuild
//! builds a complete new [`FlatIndex`] off to the side and swaps it in,
//! so a search always sees either the old index or the new one.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use subot_vector::{Config, VectorEntry, VectorMetadata, VectorStore};
//!
//! let store = VectorStore::new(Config::memory(3))?;
//! store.build(vec![
//!     VectorEntry::new("doc#0", vec![1.0, 0.0, 0.0], VectorMetadata::new()),
//! ])?;
//! let hits = store.search(&[1.0, 0.0, 0.0], 5)?;
//! ```
//!
//! ## Persistence
//!
//! A persistent store writes `vectors.bin` and `metadata.jsonl` into its
//! data directory on [`VectorStore::persist`] and reads them back with
//! [`VectorStore::load`]. See [`persistence`] for the format.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod distance;
pub mod error;
pub mod index;
pub mod persistence;
pub mod types;

pub use config::Config;
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use index::FlatIndex;
pub use types::{MetadataValue, SearchResult, VectorEntry, VectorId, VectorMetadata};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Handle to the process-wide vector index.
///
/// Cloning is cheap; all clones share the same index.
#[derive(Clone)]
pub struct VectorStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    config: Config,
    current: ArcSwap<FlatIndex>,
    /// Serializes builds and loads so swaps happen one at a time.
    build_lock: Mutex<()>,
    generation: AtomicU64,
}

/// Outcome of a successful build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BuildStats {
    /// Number of vectors in the new index.
    pub count: usize,
    /// Time spent validating and assembling the index.
    pub elapsed_ms: u64,
    /// Generation number of the new index.
    pub generation: u64,
}

/// Point-in-time description of the live index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    /// Number of vectors.
    pub count: usize,
    /// Vector dimensionality.
    pub dimensions: usize,
    /// Similarity metric name.
    pub metric: String,
    /// Approximate memory held by the vectors, in bytes.
    pub memory_bytes: usize,
    /// Incremented on every swap; 0 means never built or loaded.
    pub generation: u64,
    /// Whether the store writes to disk.
    pub persistent: bool,
}

impl VectorStore {
    /// Create a store holding an empty index.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let empty = FlatIndex::new(config.dimensions, config.metric);
        Ok(Self {
            inner: Arc::new(StoreInner {
                config,
                current: ArcSwap::from_pointee(empty),
                build_lock: Mutex::new(()),
                generation: AtomicU64::new(0),
            }),
        })
    }

    /// Create a store and load the persisted index if one exists.
    ///
    /// A missing index is not an error; the store starts empty. A corrupt
    /// one is returned as [`Error::Corrupt`] so the caller can rebuild.
    #[instrument(skip(config), fields(persistent = config.data_path.is_some()))]
    pub async fn open(config: Config) -> Result<Self> {
        let store = Self::new(config)?;
        if store.inner.config.data_path.is_some() {
            match store.load().await {
                Ok(count) => info!(count, "Opened persisted vector index"),
                Err(Error::NotPersisted(path)) => {
                    debug!(path, "No persisted vector index, starting empty")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(store)
    }

    /// Configuration this store was created with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The current index. The snapshot stays valid across later swaps.
    pub fn snapshot(&self) -> Arc<FlatIndex> {
        self.inner.current.load_full()
    }

    /// Replace the whole index with `entries`.
    ///
    /// Validation happens before the swap; on error the previous index
    /// stays live and untouched.
    #[instrument(skip(self, entries))]
    pub fn build<I>(&self, entries: I) -> Result<BuildStats>
    where
        I: IntoIterator<Item = VectorEntry>,
    {
        let _guard = self.inner.build_lock.lock();
        let started = Instant::now();

        let index =
            FlatIndex::from_entries(self.inner.config.dimensions, self.inner.config.metric, entries)?;

        let max = self.inner.config.max_vectors;
        if max > 0 && index.len() > max {
            return Err(Error::Configuration(format!(
                "index would hold {} vectors, limit is {}",
                index.len(),
                max
            )));
        }

        let count = index.len();
        let generation = self.swap(index);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(count, generation, elapsed_ms, "Vector index built");
        Ok(BuildStats {
            count,
            elapsed_ms,
            generation,
        })
    }

    /// Search the current index.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.inner.current.load().search(query, limit)
    }

    /// Search the current index, dropping hits below `threshold`.
    pub fn search_with_threshold(
        &self,
        query: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        self.inner
            .current
            .load()
            .search_with_threshold(query, limit, threshold)
    }

    /// Number of vectors in the current index.
    pub fn len(&self) -> usize {
        self.inner.current.load().len()
    }

    /// Whether the current index is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.current.load().is_empty()
    }

    /// Dimensionality every vector must have.
    pub fn dimensions(&self) -> usize {
        self.inner.config.dimensions
    }

    /// Describe the current index.
    pub fn stats(&self) -> IndexStats {
        let index = self.inner.current.load();
        IndexStats {
            count: index.len(),
            dimensions: index.dimensions(),
            metric: index.metric().name().to_string(),
            memory_bytes: index.memory_usage(),
            generation: self.inner.generation.load(Ordering::SeqCst),
            persistent: self.inner.config.data_path.is_some(),
        }
    }

    /// Write the current index to the data directory.
    ///
    /// A no-op for in-memory stores.
    #[instrument(skip(self))]
    pub async fn persist(&self) -> Result<()> {
        let Some(path) = self.inner.config.data_path.as_deref() else {
            debug!("In-memory store, skipping persist");
            return Ok(());
        };
        let snapshot = self.snapshot();
        persistence::save_index(path, &snapshot).await
    }

    /// Replace the current index with the one persisted on disk.
    ///
    /// Returns the number of vectors loaded.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<usize> {
        let path = self.inner.config.data_path.as_deref().ok_or_else(|| {
            Error::Configuration("store has no data path to load from".to_string())
        })?;

        let index = persistence::load_index(path).await?;
        if index.dimensions() != self.inner.config.dimensions {
            warn!(
                stored = index.dimensions(),
                configured = self.inner.config.dimensions,
                "Persisted index has different dimensions"
            );
            return Err(Error::DimensionMismatch {
                expected: self.inner.config.dimensions,
                actual: index.dimensions(),
            });
        }

        let _guard = self.inner.build_lock.lock();
        let count = index.len();
        self.swap(index);
        Ok(count)
    }

    fn swap(&self, index: FlatIndex) -> u64 {
        self.inner.current.store(Arc::new(index));
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("dimensions", &self.inner.config.dimensions)
            .field("metric", &self.inner.config.metric)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use tempfile::TempDir;

    fn entries(n: usize, dim: usize) -> Vec<VectorEntry> {
        let mut rng = rand::rng();
        (0..n)
            .map(|i| {
                let vector: Vec<f32> = (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect();
                VectorEntry::new(
                    format!("doc#{}", i),
                    vector,
                    VectorMetadata::new().with("ordinal", i),
                )
            })
            .collect()
    }

    #[test]
    fn test_build_and_search() {
        let store = VectorStore::new(Config::memory(8)).unwrap();
        assert!(store.is_empty());

        let data = entries(50, 8);
        let query = data[7].vector.clone();
        let stats = store.build(data).unwrap();
        assert_eq!(stats.count, 50);
        assert_eq!(stats.generation, 1);

        let results = store.search(&query, 5).unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].id, "doc#7");
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_failed_build_keeps_old_index() {
        let store = VectorStore::new(Config::memory(4)).unwrap();
        store.build(entries(10, 4)).unwrap();

        let mut bad = entries(5, 4);
        bad.push(VectorEntry::new("short", vec![1.0], VectorMetadata::new()));
        assert!(store.build(bad).is_err());

        assert_eq!(store.len(), 10);
        assert_eq!(store.stats().generation, 1);
    }

    #[test]
    fn test_max_vectors_enforced() {
        let store = VectorStore::new(Config::memory(4).with_max_vectors(3)).unwrap();
        assert!(matches!(
            store.build(entries(4, 4)),
            Err(Error::Configuration(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_survives_swap() {
        let store = VectorStore::new(Config::memory(4)).unwrap();
        store.build(entries(3, 4)).unwrap();
        let old = store.snapshot();

        store.build(entries(9, 4)).unwrap();
        assert_eq!(old.len(), 3);
        assert_eq!(store.len(), 9);
    }

    #[tokio::test]
    async fn test_persist_load_identical_results() {
        let dir = TempDir::new().unwrap();
        let config = Config::persistent(dir.path(), 16);

        let store = VectorStore::new(config.clone()).unwrap();
        let data = entries(40, 16);
        let query = data[3].vector.clone();
        store.build(data).unwrap();
        let before = store.search(&query, 10).unwrap();
        store.persist().await.unwrap();

        let reopened = VectorStore::open(config).await.unwrap();
        let after = reopened.search(&query, 10).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_open_without_files_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = VectorStore::open(Config::persistent(dir.path().join("idx"), 4))
            .await
            .unwrap();
        assert!(store.is_empty());
        assert_eq!(store.stats().generation, 0);
    }

    #[tokio::test]
    async fn test_load_rejects_other_dimensions() {
        let dir = TempDir::new().unwrap();
        let store = VectorStore::new(Config::persistent(dir.path(), 4)).unwrap();
        store.build(entries(2, 4)).unwrap();
        store.persist().await.unwrap();

        let other = VectorStore::new(Config::persistent(dir.path(), 8)).unwrap();
        assert!(matches!(
            other.load().await,
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_search_during_rebuild() {
        let store = VectorStore::new(Config::memory(8)).unwrap();
        store.build(entries(100, 8)).unwrap();
        let query = vec![0.5f32; 8];

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let query = query.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    if i % 4 == 0 {
                        store.build(entries(100 + i, 8)).unwrap();
                    } else {
                        let results = store.search(&query, 10).unwrap();
                        assert_eq!(results.len(), 10);
                        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(store.len() >= 100);
    }
}
