//! TOML-based configuration for SU_BOT
//!
//! Everything tunable lives in `subot.toml`: corpus location, chunking, the
//! embedding backend, router thresholds, budgets and timeouts, and the LLM
//! provider. Every field has a default, so an empty file is a valid config.
//!
//! Secrets are never written in the file. Fields ending in `_env` name the
//! environment variable that holds the value (see `.env` support via
//! `dotenvy`).
//!
//! [`ConfigManager`] loads the file once at startup and hands out a shared,
//! read-only snapshot.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Root configuration structure loaded from subot.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubotConfig {
    pub server: ServerConfig,
    pub corpus: CorpusConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub router: RouterConfig,
    pub web_search: WebSearchConfig,
    pub assembler: AssemblerConfig,
    pub synthesizer: SynthesizerConfig,
    pub memory: MemoryConfig,
    pub llm: LlmConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub json_logs: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

// ============= Corpus Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory of `.txt` documents, one per document
    #[serde(default = "default_corpus_dir")]
    pub dir: PathBuf,

    /// Manifest file name inside `dir`, mapping file name to source URL
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("./data/corpus")
}

fn default_manifest() -> String {
    "manifest.json".to_string()
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: default_corpus_dir(),
            manifest: default_manifest(),
        }
    }
}

// ============= Chunking Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum segment length in characters
    #[serde(default = "default_chunk_size")]
    pub max_chars: usize,

    /// Characters shared by neighbouring windows
    #[serde(default = "default_chunk_overlap")]
    pub overlap_chars: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_chunk_size(),
            overlap_chars: default_chunk_overlap(),
        }
    }
}

// ============= Embedding Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Built-in feature hashing, no model download
    #[default]
    Hash,
    /// Ollama `/api/embed`
    Ollama,
    /// fastembed ONNX models (requires the `local-embeddings` feature)
    FastEmbed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Base URL for the Ollama backend
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    /// Vector dimensionality the index is built with
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Query embeddings kept in the LRU cache (0 disables it)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_batch_size() -> usize {
    32
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_embedding_timeout() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: default_embedding_model(),
            base_url: default_ollama_url(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            cache_capacity: default_cache_capacity(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

// ============= Index Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory for `vectors.bin` and `metadata.jsonl`
    #[serde(default = "default_index_path")]
    pub data_path: PathBuf,

    /// cosine, euclidean, dot_product or manhattan
    #[serde(default = "default_metric")]
    pub metric: String,

    /// Build from the corpus at startup when nothing is persisted
    #[serde(default = "default_true")]
    pub rebuild_on_start: bool,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./data/index")
}

fn default_metric() -> String {
    "cosine".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_path: default_index_path(),
            metric: default_metric(),
            rebuild_on_start: true,
        }
    }
}

// ============= Retrieval Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Local hits scoring below this are dropped
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Retrieved text is cut to this many characters before assembly
    #[serde(default = "default_max_snippet_chars")]
    pub max_snippet_chars: usize,

    /// Remove question words before embedding the query
    #[serde(default = "default_true")]
    pub strip_question_words: bool,
}

fn default_top_k() -> usize {
    5
}

fn default_min_score() -> f32 {
    0.1
}

fn default_max_snippet_chars() -> usize {
    1200
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
            max_snippet_chars: default_max_snippet_chars(),
            strip_question_words: true,
        }
    }
}

// ============= Router Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Top-1 similarity at or above this answers from the local index only
    #[serde(default = "default_high_confidence")]
    pub high_confidence: f32,

    /// Top-1 similarity below this goes to the web
    #[serde(default = "default_low_confidence")]
    pub low_confidence: f32,

    /// Terms that mark a query as about the institution
    #[serde(default = "default_hint_terms")]
    pub hint_terms: Vec<String>,

    /// Queries with at most this many words are treated as follow-ups
    #[serde(default = "default_followup_max_words")]
    pub followup_max_words: usize,
}

fn default_high_confidence() -> f32 {
    0.55
}

fn default_low_confidence() -> f32 {
    0.25
}

fn default_hint_terms() -> Vec<String> {
    [
        "scet",
        "sarvajanik",
        "surat",
        "vivaksha",
        "jariwala",
        "it department",
        "computer engineering",
        "placements",
        "hod",
        "faculty",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_followup_max_words() -> usize {
    4
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            high_confidence: default_high_confidence(),
            low_confidence: default_low_confidence(),
            hint_terms: default_hint_terms(),
            followup_max_words: default_followup_max_words(),
        }
    }
}

// ============= Web Search Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebSearchProviderKind {
    /// DuckDuckGo through daedra, no key required
    #[default]
    DuckDuckGo,
    /// Tavily search API
    Tavily,
    /// No web search; WEB routes degrade to "cannot answer"
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default)]
    pub provider: WebSearchProviderKind,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_web_timeout_ms")]
    pub timeout_ms: u64,

    /// Environment variable holding the Tavily key
    #[serde(default = "default_tavily_key_env")]
    pub tavily_api_key_env: String,

    #[serde(default = "default_tavily_url")]
    pub tavily_url: String,
}

fn default_max_results() -> usize {
    5
}

fn default_web_timeout_ms() -> u64 {
    8000
}

fn default_tavily_key_env() -> String {
    "TAVILY_API_KEY".to_string()
}

fn default_tavily_url() -> String {
    "https://api.tavily.com".to_string()
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            provider: WebSearchProviderKind::default(),
            max_results: default_max_results(),
            timeout_ms: default_web_timeout_ms(),
            tavily_api_key_env: default_tavily_key_env(),
            tavily_url: default_tavily_url(),
        }
    }
}

// ============= Assembler Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Maximum characters of the rendered context block
    #[serde(default = "default_budget_chars")]
    pub budget_chars: usize,

    /// Smallest remainder worth filling with a truncated item
    #[serde(default = "default_min_item_chars")]
    pub min_item_chars: usize,
}

fn default_budget_chars() -> usize {
    6000
}

fn default_min_item_chars() -> usize {
    200
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            budget_chars: default_budget_chars(),
            min_item_chars: default_min_item_chars(),
        }
    }
}

// ============= Synthesizer Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Pause before the single retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Memory turns included in the prompt
    #[serde(default = "default_memory_turns")]
    pub memory_turns: usize,

    /// Name the assistant introduces itself with
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    /// Institution the assistant answers for
    #[serde(default = "default_institution")]
    pub institution: String,
}

fn default_generation_timeout() -> u64 {
    60
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_memory_turns() -> usize {
    3
}

fn default_assistant_name() -> String {
    "SU_BOT".to_string()
}

fn default_institution() -> String {
    "Sarvajanik College of Engineering and Technology (SCET)".to_string()
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_generation_timeout(),
            retry_backoff_ms: default_retry_backoff_ms(),
            memory_turns: default_memory_turns(),
            assistant_name: default_assistant_name(),
            institution: default_institution(),
        }
    }
}

// ============= Memory Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Cumulative token estimate across retained turns
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Sessions kept in memory; the least recently used is forgotten first
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_turns() -> usize {
    10
}

fn default_max_tokens() -> usize {
    2000
}

fn default_max_sessions() -> usize {
    1000
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_tokens: default_max_tokens(),
            max_sessions: default_max_sessions(),
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LlmConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_llm_model")]
        model: String,
    },
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        model: String,
    },
}

fn default_llm_model() -> String {
    "llama3.2".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig::Ollama {
            base_url: default_ollama_url(),
            model: default_llm_model(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl SubotConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Parse without validating
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

        let router = &self.router;
        if !(0.0..=1.0).contains(&router.low_confidence)
            || !(0.0..=1.0).contains(&router.high_confidence)
            || router.low_confidence > router.high_confidence
        {
            return invalid(format!(
                "router thresholds must satisfy 0 <= low ({}) <= high ({}) <= 1",
                router.low_confidence, router.high_confidence
            ));
        }

        if self.chunking.max_chars == 0 {
            return invalid("chunking.max_chars must be > 0".to_string());
        }
        if self.chunking.overlap_chars >= self.chunking.max_chars {
            return invalid(format!(
                "chunking.overlap_chars ({}) must be smaller than max_chars ({})",
                self.chunking.overlap_chars, self.chunking.max_chars
            ));
        }

        if self.embedding.dimensions == 0 {
            return invalid("embedding.dimensions must be > 0".to_string());
        }
        if self.embedding.batch_size == 0 {
            return invalid("embedding.batch_size must be > 0".to_string());
        }
        if self.embedding.timeout_secs == 0 {
            return invalid("embedding.timeout_secs must be > 0".to_string());
        }
        if self.index.metric.parse::<subot_vector::DistanceMetric>().is_err() {
            return invalid(format!("unknown index.metric '{}'", self.index.metric));
        }
        if self.retrieval.top_k == 0 {
            return invalid("retrieval.top_k must be > 0".to_string());
        }
        if self.assembler.budget_chars == 0 {
            return invalid("assembler.budget_chars must be > 0".to_string());
        }
        if self.web_search.timeout_ms == 0 || self.synthesizer.timeout_secs == 0 {
            return invalid("timeouts must be > 0".to_string());
        }
        if self.memory.max_turns == 0 {
            return invalid("memory.max_turns must be > 0".to_string());
        }
        if self.memory.max_sessions == 0 {
            return invalid("memory.max_sessions must be > 0".to_string());
        }

        if self.web_search.provider == WebSearchProviderKind::Tavily {
            self.validate_env_var(&self.web_search.tavily_api_key_env)?;
        }
        if let LlmConfig::OpenAI { api_key_env, .. } = &self.llm {
            self.validate_env_var(api_key_env)?;
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// The configured similarity metric
    pub fn metric(&self) -> subot_vector::DistanceMetric {
        self.index.metric.parse().unwrap_or_default()
    }
}

// ============= Configuration Manager =============

/// Shared, read-only configuration
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<SubotConfig>,
}

impl ConfigManager {
    /// Load the config file at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = SubotConfig::load(path)?;
        info!(path = ?path, "Configuration loaded");
        Ok(Self::from_config(config))
    }

    /// Like [`new`](Self::new), but fall back to defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::new(path.as_ref()) {
            Err(ConfigError::FileNotFound(p)) => {
                warn!(path = ?p, "Config file not found, using defaults");
                let config = SubotConfig::default();
                config.validate()?;
                Ok(Self::from_config(config))
            }
            other => other,
        }
    }

    /// Create a config manager directly from a config (useful for testing)
    pub fn from_config(config: SubotConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> Arc<SubotConfig> {
        self.config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_config() -> String {
        r#"
[server]
port = 8080
log_level = "debug"

[corpus]
dir = "./corpus"

[chunking]
max_chars = 500
overlap_chars = 100

[embedding]
backend = "ollama"
model = "nomic-embed-text"
dimensions = 768

[router]
high_confidence = 0.7
low_confidence = 0.3
hint_terms = ["scet", "hod"]

[web_search]
provider = "duckduckgo"
timeout_ms = 3000

[llm]
type = "ollama"
model = "granite4:tiny-h"
"#
        .to_string()
    }

    #[test]
    fn test_parse_full_config() {
        let config = SubotConfig::from_toml(&create_test_config()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.chunking.max_chars, 500);
        assert_eq!(config.embedding.backend, EmbeddingBackend::Ollama);
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(config.router.hint_terms, vec!["scet", "hod"]);
        assert_eq!(config.web_search.timeout_ms, 3000);
        assert!(matches!(config.llm, LlmConfig::Ollama { ref model, .. } if model == "granite4:tiny-h"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = SubotConfig::from_toml("").unwrap();
        assert_eq!(config.chunking.max_chars, 1000);
        assert_eq!(config.chunking.overlap_chars, 200);
        assert_eq!(config.retrieval.min_score, 0.1);
        assert_eq!(config.retrieval.max_snippet_chars, 1200);
        assert_eq!(config.embedding.backend, EmbeddingBackend::Hash);
        assert!(config.router.hint_terms.iter().any(|t| t == "hod"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_max() {
        let config = SubotConfig::from_toml(
            r#"
[chunking]
max_chars = 100
overlap_chars = 100
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_thresholds_must_be_ordered() {
        let config = SubotConfig::from_toml(
            r#"
[router]
high_confidence = 0.2
low_confidence = 0.5
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_cap_defaults_and_must_be_positive() {
        assert_eq!(SubotConfig::default().memory.max_sessions, 1000);
        let config = SubotConfig::from_toml("[memory]\nmax_sessions = 0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let config = SubotConfig::from_toml("[index]\nmetric = \"hamming\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tavily_requires_env_var() {
        let config = SubotConfig::from_toml(
            r#"
[web_search]
provider = "tavily"
tavily_api_key_env = "SUBOT_TEST_MISSING_TAVILY_KEY"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvVar(name)) if name == "SUBOT_TEST_MISSING_TAVILY_KEY"
        ));
    }

    #[test]
    fn test_openai_provider_parses() {
        let config = SubotConfig::from_toml(
            r#"
[llm]
type = "openai"
api_key_env = "OPENAI_API_KEY"
model = "gpt-4o-mini"
"#,
        )
        .unwrap();
        match config.llm {
            LlmConfig::OpenAI {
                api_base, model, ..
            } => {
                assert_eq!(api_base, "https://api.openai.com/v1");
                assert_eq!(model, "gpt-4o-mini");
            }
            other => panic!("unexpected provider {:?}", other),
        }
    }

    #[test]
    fn test_manager_loads_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[server]\nport = 4000\n").unwrap();

        let manager = ConfigManager::new(file.path()).unwrap();
        assert_eq!(manager.config().server.port, 4000);
    }

    #[test]
    fn test_manager_rejects_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[chunking]\nmax_chars = 10\noverlap_chars = 50\n").unwrap();
        assert!(matches!(
            ConfigManager::new(file.path()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let manager = ConfigManager::load_or_default("/nonexistent/subot.toml").unwrap();
        assert_eq!(manager.config().server.port, 3000);
    }
}
