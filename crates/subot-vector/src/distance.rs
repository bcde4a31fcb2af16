//! Similarity metrics.
//!
//! Every metric is exposed as a *similarity* (higher = closer) so that the
//! index can rank all of them the same way.

use std::fmt;

/// Metric used to compare a query vector with stored vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistanceMetric {
    /// Cosine similarity in `[-1, 1]`. The right choice for text embeddings.
    #[default]
    Cosine,

    /// Euclidean (L2) distance, reported as `1 / (1 + d)`.
    Euclidean,

    /// Raw inner product. Only meaningful for pre-normalized vectors.
    DotProduct,

    /// Manhattan (L1) distance, reported as `1 / (1 + d)`.
    Manhattan,
}

impl DistanceMetric {
    /// Similarity between two vectors of equal length; higher is more similar.
    #[inline]
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            DistanceMetric::Cosine => cosine_similarity(a, b),
            DistanceMetric::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
            DistanceMetric::DotProduct => dot_product(a, b),
            DistanceMetric::Manhattan => 1.0 / (1.0 + manhattan_distance(a, b)),
        }
    }

    /// Raw distance between two vectors; lower is more similar.
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::DotProduct => -dot_product(a, b),
            DistanceMetric::Manhattan => manhattan_distance(a, b),
        }
    }

    /// Stable name used in persisted files.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::DotProduct => "dot_product",
            DistanceMetric::Manhattan => "manhattan",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" | "cos" => Ok(DistanceMetric::Cosine),
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "dot" | "dot_product" | "inner" => Ok(DistanceMetric::DotProduct),
            "manhattan" | "l1" => Ok(DistanceMetric::Manhattan),
            _ => Err(format!("Unknown distance metric: {}", s)),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = (norm_a * norm_b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn manhattan_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let a = [1.0, 0.0, 0.0];
        let sim = DistanceMetric::Cosine.similarity(&a, &a);
        assert!((sim - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let sim = DistanceMetric::Cosine.similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 0.0001);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let sim = DistanceMetric::Cosine.similarity(&[0.0, 0.0], &[1.0, 0.0]);
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_euclidean_similarity_range() {
        let same = DistanceMetric::Euclidean.similarity(&[1.0, 2.0], &[1.0, 2.0]);
        assert!((same - 1.0).abs() < 0.0001);

        let dist = DistanceMetric::Euclidean.distance(&[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!((dist - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_manhattan_distance() {
        let dist = DistanceMetric::Manhattan.distance(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]);
        assert!((dist - 6.0).abs() < 0.0001);
    }

    #[test]
    fn test_dot_product() {
        let sim = DistanceMetric::DotProduct.similarity(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        assert!((sim - 32.0).abs() < 0.0001);
    }

    #[test]
    fn test_metric_name_round_trip() {
        for metric in [
            DistanceMetric::Cosine,
            DistanceMetric::Euclidean,
            DistanceMetric::DotProduct,
            DistanceMetric::Manhattan,
        ] {
            assert_eq!(metric.name().parse::<DistanceMetric>().unwrap(), metric);
        }
        assert!("hamming".parse::<DistanceMetric>().is_err());
    }
}
