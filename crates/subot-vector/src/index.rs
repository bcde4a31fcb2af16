//! Exact flat index.
//!
//! A `FlatIndex` is immutable once built: the store swaps whole indexes
//! instead of mutating one that readers may be scanning.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::{SearchResult, VectorEntry, VectorId};
use std::collections::HashMap;
use tracing::trace;

/// Brute-force index over a fixed set of vectors.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    metric: DistanceMetric,
    /// Entries in insertion order.
    entries: Vec<VectorEntry>,
    /// Mapping from id to position in `entries`.
    positions: HashMap<VectorId, usize>,
}

impl FlatIndex {
    /// Create an empty index.
    pub fn new(dimensions: usize, metric: DistanceMetric) -> Self {
        Self {
            dimensions,
            metric,
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Build an index from `entries`, validating every vector.
    ///
    /// Any invalid entry rejects the whole batch.
    pub fn from_entries<I>(dimensions: usize, metric: DistanceMetric, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = VectorEntry>,
    {
        let mut index = Self::new(dimensions, metric);
        for entry in entries {
            index.push(entry)?;
        }
        Ok(index)
    }

    /// Append one entry.
    pub fn push(&mut self, entry: VectorEntry) -> Result<()> {
        validate_vector(&entry.vector, self.dimensions)?;
        if self.positions.contains_key(&entry.id) {
            return Err(Error::DuplicateId(entry.id));
        }

        self.positions.insert(entry.id.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Get the dimensions of this index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Get the metric of this index.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &str) -> Option<&VectorEntry> {
        self.positions.get(id).map(|&pos| &self.entries[pos])
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[VectorEntry] {
        &self.entries
    }

    /// Top-`limit` entries by similarity, best first.
    ///
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        validate_vector(query, self.dimensions)?;

        if limit == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, self.metric.similarity(query, &entry.vector)))
            .collect();

        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);

        trace!(candidates = self.entries.len(), returned = scored.len(), "Flat search");

        Ok(scored
            .into_iter()
            .map(|(pos, score)| {
                let entry = &self.entries[pos];
                SearchResult {
                    id: entry.id.clone(),
                    score,
                    metadata: entry.metadata.clone(),
                }
            })
            .collect())
    }

    /// Like [`search`](Self::search) but drops hits scoring below `threshold`.
    pub fn search_with_threshold(
        &self,
        query: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        let mut results = self.search(query, limit)?;
        results.retain(|r| r.score >= threshold);
        Ok(results)
    }

    /// Rough heap footprint in bytes.
    pub fn memory_usage(&self) -> usize {
        let vectors = self.entries.len() * self.dimensions * std::mem::size_of::<f32>();
        let ids: usize = self.entries.iter().map(|e| e.id.len() * 2).sum();
        vectors + ids + self.entries.len() * std::mem::size_of::<VectorEntry>()
    }
}

pub(crate) fn validate_vector(vector: &[f32], dimensions: usize) -> Result<()> {
    if vector.len() != dimensions {
        return Err(Error::DimensionMismatch {
            expected: dimensions,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidVector(
            "vector contains NaN or infinite values".to_string(),
        ));
    }
    Ok(())
}
