use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Citation text used when a document has no known origin.
pub const UNKNOWN_SOURCE: &str = "unknown source";

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub route: Route,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
    pub grounded: bool,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildResponse {
    pub documents: usize,
    pub skipped: usize,
    pub segments: usize,
    pub elapsed_ms: u64,
}

// ============= Corpus Types =============

/// A source document as handed over by the crawler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub source_url: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_url: None,
            ingested_at: Utc::now(),
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// URL for citations, or [`UNKNOWN_SOURCE`].
    pub fn source_label(&self) -> &str {
        self.source_url.as_deref().unwrap_or(UNKNOWN_SOURCE)
    }
}

/// A bounded slice of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// `<document_id>#<ordinal>`
    pub id: String,
    pub doc_id: String,
    pub ordinal: usize,
    pub text: String,
    /// Byte offset of the first character in the document text.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    pub source_url: Option<String>,
}

impl Segment {
    pub fn segment_id(doc_id: &str, ordinal: usize) -> String {
        format!("{}#{}", doc_id, ordinal)
    }
}

// ============= Retrieval Types =============

/// Where a retrieved item came from. Local sorts before web.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    Web,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Local => write!(f, "local"),
            SourceKind::Web => write!(f, "web"),
        }
    }
}

/// One ranked search hit from the web provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSnippet {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A local segment or web snippet with its relevance score.
///
/// Scores are only comparable within one [`SourceKind`] until the
/// assembler normalizes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub kind: SourceKind,
    /// Document id for local items, URL for web items.
    pub source_id: String,
    pub title: String,
    pub url: Option<String>,
    pub text: String,
    /// Byte range into the owning document (local only).
    pub span: Option<(usize, usize)>,
    pub score: f32,
}

impl RetrievedItem {
    pub fn local(segment: &Segment, score: f32) -> Self {
        Self {
            kind: SourceKind::Local,
            source_id: segment.doc_id.clone(),
            title: segment.doc_id.clone(),
            url: segment.source_url.clone(),
            text: segment.text.clone(),
            span: Some((segment.start, segment.end)),
            score,
        }
    }

    pub fn web(snippet: WebSnippet, score: f32) -> Self {
        Self {
            kind: SourceKind::Web,
            source_id: snippet.url.clone(),
            title: snippet.title,
            url: Some(snippet.url),
            text: snippet.snippet,
            span: None,
            score,
        }
    }
}

/// Retrieval mode chosen for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Local,
    Web,
    Hybrid,
    /// No retrieval path was available.
    None,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Route::Local => "local",
            Route::Web => "web",
            Route::Hybrid => "hybrid",
            Route::None => "none",
        };
        write!(f, "{}", s)
    }
}

/// Why a query was answered from fewer sources than the router wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    WebTimeout,
    WebUnavailable,
    LocalUnavailable,
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Degradation::WebTimeout => "local-only due to web timeout",
            Degradation::WebUnavailable => "web unavailable",
            Degradation::LocalUnavailable => "local unavailable",
        };
        write!(f, "{}", s)
    }
}

// ============= Context & Answer Types =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// The `n` in `[n]`, starting at 1.
    pub marker: usize,
    pub kind: SourceKind,
    pub source_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Citation {
    /// Line used in the appended source list. Local documents without a
    /// manifest entry read [`UNKNOWN_SOURCE`].
    pub fn render(&self) -> String {
        match (self.kind, &self.url) {
            (SourceKind::Web, Some(url)) => format!("[{}] [{}]({})", self.marker, self.title, url),
            (SourceKind::Web, None) => format!("[{}] {}", self.marker, self.source_id),
            (SourceKind::Local, url) => format!(
                "[{}] {} ({})",
                self.marker,
                self.source_id,
                url.as_deref().unwrap_or(UNKNOWN_SOURCE)
            ),
        }
    }
}

/// Bounded context block plus the sources it cites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub text: String,
    pub citations: Vec<Citation>,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub query: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Final result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
    pub route: Route,
    pub degraded: Option<Degradation>,
    /// Whether any retrieved context reached the prompt.
    pub grounded: bool,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Chunking error: {0}")]
    Chunking(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index corrupt: {0}")]
    IndexCorrupt(String),

    #[error("Retrieval timed out after {0}ms")]
    RetrievalTimeout(u64),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Web search error: {0}")]
    WebSearch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<subot_vector::Error> for AppError {
    fn from(err: subot_vector::Error) -> Self {
        use subot_vector::Error as E;
        let message = err.to_string();
        match err {
            E::Corrupt(msg) => AppError::IndexCorrupt(msg),
            E::NotPersisted(path) => AppError::NotFound(format!("no persisted index at {}", path)),
            E::DimensionMismatch { .. } | E::InvalidVector(_) => AppError::Embedding(message),
            E::Io(e) => AppError::Io(e),
            _ => AppError::Internal(message),
        }
    }
}

impl From<crate::utils::toml_config::ConfigError> for AppError {
    fn from(err: crate::utils::toml_config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RetrievalTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::WebSearch(_) | AppError::Generation(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_render() {
        let web = Citation {
            marker: 2,
            kind: SourceKind::Web,
            source_id: "https://scet.ac.in/it".to_string(),
            title: "IT Department".to_string(),
            url: Some("https://scet.ac.in/it".to_string()),
        };
        assert_eq!(web.render(), "[2] [IT Department](https://scet.ac.in/it)");

        let local = Citation {
            marker: 1,
            kind: SourceKind::Local,
            source_id: "it_faculty".to_string(),
            title: "it_faculty".to_string(),
            url: None,
        };
        assert_eq!(local.render(), "[1] it_faculty (unknown source)");

        let local = Citation {
            url: Some("https://scet.ac.in/it".to_string()),
            ..local
        };
        assert_eq!(local.render(), "[1] it_faculty (https://scet.ac.in/it)");
    }

    #[test]
    fn test_document_source_label() {
        let doc = Document::new("about", "text");
        assert_eq!(doc.source_label(), UNKNOWN_SOURCE);
        let doc = doc.with_source_url("https://scet.ac.in/about");
        assert_eq!(doc.source_label(), "https://scet.ac.in/about");
    }

    #[test]
    fn test_route_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Route::Hybrid).unwrap(), "\"hybrid\"");
        assert_eq!(Degradation::WebTimeout.to_string(), "local-only due to web timeout");
    }

    #[test]
    fn test_vector_errors_map_to_app_errors() {
        let err: AppError = subot_vector::Error::Corrupt("bad".into()).into();
        assert!(matches!(err, AppError::IndexCorrupt(_)));

        let err: AppError = subot_vector::Error::DimensionMismatch {
            expected: 4,
            actual: 3,
        }
        .into();
        assert!(matches!(err, AppError::Embedding(_)));
    }
}
