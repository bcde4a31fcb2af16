//! Text embedding backends.
//!
//! Every backend implements [`Embedder`]. Output is checked before it is
//! returned: one vector per input, each of the configured dimension and
//! free of NaN/Inf. Anything else is an [`AppError::Embedding`].

use crate::rag::cache::{compute_key, CacheStats, LruEmbeddingCache};
use crate::types::{AppError, Result};
use crate::utils::toml_config::{EmbeddingBackend, EmbeddingConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Maps text to fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the model, used in cache keys and logs.
    fn model_name(&self) -> &str;

    /// Dimension of every returned vector.
    fn dimensions(&self) -> usize;

    /// Embed several texts, one vector per text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::Embedding("backend returned no vector".to_string()))
    }
}

/// Reject empty batches and blank texts.
pub fn check_input(texts: &[String]) -> Result<()> {
    if texts.is_empty() {
        return Err(AppError::Embedding("no input texts".to_string()));
    }
    if let Some(pos) = texts.iter().position(|t| t.trim().is_empty()) {
        return Err(AppError::Embedding(format!("input {} is empty", pos)));
    }
    Ok(())
}

/// Check a backend's output against the request.
pub fn check_output(expected_count: usize, dimensions: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected_count {
        return Err(AppError::Embedding(format!(
            "expected {} vectors, backend returned {}",
            expected_count,
            vectors.len()
        )));
    }
    for vector in vectors {
        if vector.len() != dimensions {
            return Err(AppError::Embedding(format!(
                "expected dimension {}, backend returned {}",
                dimensions,
                vector.len()
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(AppError::Embedding(
                "backend returned a non-finite value".to_string(),
            ));
        }
    }
    Ok(())
}

/// Build the embedder described by `config`, wrapped in the query cache.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let inner: Arc<dyn Embedder> = match config.backend {
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(config.dimensions)?),
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(
            &config.base_url,
            &config.model,
            config.dimensions,
            config.batch_size,
            Duration::from_secs(config.timeout_secs),
        )?),
        #[cfg(feature = "local-embeddings")]
        EmbeddingBackend::FastEmbed => Arc::new(FastEmbedder::new(
            &config.model,
            config.dimensions,
            config.batch_size,
        )?),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingBackend::FastEmbed => {
            return Err(AppError::Config(
                "fastembed backend requires the `local-embeddings` feature".to_string(),
            ))
        }
    };

    Ok(Arc::new(CachedEmbedder::new(inner, config.cache_capacity)))
}

// ============================================================================
// Feature hashing
// ============================================================================

/// Deterministic bag-of-words embedder.
///
/// Each lowercased alphanumeric token is hashed with SHA-256 into one of
/// `dimensions` buckets with a hashed sign, and the result is L2-normalized.
/// Texts sharing words get a positive cosine similarity. Works offline and
/// is stable across runs and platforms.
pub struct HashEmbedder {
    dimensions: usize,
    name: String,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(AppError::Config("embedding dimensions must be > 0".to_string()));
        }
        Ok(Self {
            dimensions,
            name: format!("hash-{}", dimensions),
        })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        check_input(texts)?;
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

// ============================================================================
// Ollama
// ============================================================================

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeddings from an Ollama server via `POST /api/embed`.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        dimensions: usize,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!("{}/api/embed", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimensions,
            batch_size: batch_size.max(1),
        })
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(&self.url)
            .json(&OllamaEmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let parsed: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Invalid Ollama response: {}", e)))?;
        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        check_input(texts)?;

        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.request(batch).await?;
            check_output(batch.len(), self.dimensions, &vectors)?;
            out.extend(vectors);
        }
        debug!(count = out.len(), model = %self.model, "Embedded batch via Ollama");
        Ok(out)
    }
}

// ============================================================================
// fastembed
// ============================================================================

/// Local ONNX embeddings through fastembed.
///
/// The model is not `Sync`-friendly for concurrent `embed` calls, so it is
/// kept behind a mutex and driven from the blocking pool.
#[cfg(feature = "local-embeddings")]
pub struct FastEmbedder {
    model: Arc<parking_lot::Mutex<fastembed::TextEmbedding>>,
    name: String,
    dimensions: usize,
    batch_size: usize,
}

#[cfg(feature = "local-embeddings")]
impl FastEmbedder {
    pub fn new(model_name: &str, dimensions: usize, batch_size: usize) -> Result<Self> {
        use fastembed::{InitOptions, TextEmbedding};

        let info = TextEmbedding::list_supported_models()
            .into_iter()
            .find(|m| m.model_code == model_name)
            .ok_or_else(|| {
                AppError::Config(format!("unknown fastembed model '{}'", model_name))
            })?;
        if info.dim != dimensions {
            return Err(AppError::Config(format!(
                "model '{}' produces {} dimensions, config says {}",
                model_name, info.dim, dimensions
            )));
        }

        let model = TextEmbedding::try_new(InitOptions::new(info.model))
            .map_err(|e| AppError::Embedding(e.to_string()))?;

        Ok(Self {
            model: Arc::new(parking_lot::Mutex::new(model)),
            name: model_name.to_string(),
            dimensions,
            batch_size,
        })
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl Embedder for FastEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        check_input(texts)?;

        let model = Arc::clone(&self.model);
        let owned = texts.to_vec();
        let batch_size = self.batch_size;
        let vectors = tokio::task::spawn_blocking(move || {
            model
                .lock()
                .embed(owned, Some(batch_size))
                .map_err(|e| AppError::Embedding(e.to_string()))
        })
        .await
        .map_err(|e| AppError::Internal(format!("embedding task failed: {}", e)))??;

        check_output(texts.len(), self.dimensions, &vectors)?;
        Ok(vectors)
    }
}

// ============================================================================
// Cached wrapper
// ============================================================================

/// Adds the LRU query cache to single-text [`Embedder::embed`] calls.
///
/// Batches (index builds) bypass the cache.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Option<LruEmbeddingCache>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        Self {
            inner,
            cache: LruEmbeddingCache::new(capacity),
        }
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.inner.embed_batch(texts).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let Some(cache) = &self.cache else {
            return self.inner.embed(text).await;
        };

        let key = compute_key(text, self.inner.model_name());
        if let Some(hit) = cache.get(&key) {
            return Ok(hit);
        }

        let vector = self.inner.embed(text).await?;
        check_output(1, self.inner.dimensions(), std::slice::from_ref(&vector))?;
        cache.set(key, vector.clone());
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subot_vector::DistanceMetric;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_hash_embedder_deterministic() {
        let embedder = HashEmbedder::new(64).unwrap();
        let a = embedder.embed("Placement cell contact").await.unwrap();
        let b = embedder.embed("Placement cell contact").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_hash_embedder_similarity_tracks_overlap() {
        let embedder = HashEmbedder::new(384).unwrap();
        let vectors = embedder
            .embed_batch(&strings(&[
                "Dr. Vivaksha Jariwala is HOD of IT",
                "HOD of IT department",
                "Annual sports festival schedule",
            ]))
            .await
            .unwrap();

        let close = DistanceMetric::Cosine.similarity(&vectors[0], &vectors[1]);
        let far = DistanceMetric::Cosine.similarity(&vectors[0], &vectors[2]);
        assert!(close > 0.3, "close = {}", close);
        assert!(close > far);
    }

    #[tokio::test]
    async fn test_case_and_punctuation_ignored() {
        let embedder = HashEmbedder::new(32).unwrap();
        let a = embedder.embed("HOD, IT!").await.unwrap();
        let b = embedder.embed("hod it").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let embedder = HashEmbedder::new(16).unwrap();
        assert!(matches!(
            embedder.embed("").await,
            Err(AppError::Embedding(_))
        ));
        assert!(matches!(
            embedder.embed_batch(&[]).await,
            Err(AppError::Embedding(_))
        ));
        assert!(embedder.embed_batch(&strings(&["ok", "  "])).await.is_err());
    }

    #[test]
    fn test_check_output() {
        assert!(check_output(2, 3, &[vec![0.0; 3], vec![1.0; 3]]).is_ok());
        assert!(check_output(2, 3, &[vec![0.0; 3]]).is_err());
        assert!(check_output(1, 3, &[vec![0.0; 4]]).is_err());
        assert!(check_output(1, 2, &[vec![f32::NAN, 0.0]]).is_err());
    }

    #[tokio::test]
    async fn test_cached_embedder_hits() {
        let inner: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(16).unwrap());
        let cached = CachedEmbedder::new(inner, 8);

        let first = cached.embed("library timings").await.unwrap();
        let second = cached.embed("library timings").await.unwrap();
        assert_eq!(first, second);

        let stats = cached.cache_stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_create_embedder_hash_default() {
        let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.dimensions(), 384);
        assert_eq!(embedder.model_name(), "hash-384");
    }
}
