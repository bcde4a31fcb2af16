//! Configuration for subot-vector.

use crate::distance::DistanceMetric;
use std::path::PathBuf;

/// Configuration for a [`VectorStore`](crate::VectorStore).
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the persisted file pair. If None, the index lives in memory only.
    pub data_path: Option<PathBuf>,

    /// Dimensionality every stored vector must have.
    pub dimensions: usize,

    /// Similarity metric used by `search`.
    pub metric: DistanceMetric,

    /// Maximum number of vectors accepted by a single build (0 = unlimited).
    pub max_vectors: usize,
}

impl Config {
    /// Create an in-memory configuration.
    ///
    /// Data will not be persisted and will be lost when the process exits.
    pub fn memory(dimensions: usize) -> Self {
        Self {
            data_path: None,
            dimensions,
            metric: DistanceMetric::default(),
            max_vectors: 0,
        }
    }

    /// Create a persistent configuration rooted at `path`.
    pub fn persistent<P: Into<PathBuf>>(path: P, dimensions: usize) -> Self {
        Self {
            data_path: Some(path.into()),
            ..Self::memory(dimensions)
        }
    }

    /// Set the similarity metric.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the maximum number of vectors per build.
    pub fn with_max_vectors(mut self, max: usize) -> Self {
        self.max_vectors = max;
        self
    }

    /// Check the configuration for values the index cannot work with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.dimensions == 0 {
            return Err(crate::Error::Configuration(
                "dimensions must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
