//! Mock implementations for testing.
//!
//! Mock LLM clients and web search providers shared by the integration
//! tests. Each mock counts its calls so tests can assert which
//! collaborators a query touched.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use subot::llm::LLMClient;
use subot::tools::search::WebSearchProvider;
use subot::types::{AppError, Result, WebSnippet};

/// Mock LLM client with a fixed reply.
///
/// The last user prompt is recorded for inspection.
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
    calls: Arc<AtomicUsize>,
    last_prompt: Arc<Mutex<Option<String>>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
            last_prompt: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().clone()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = Some(prompt.to_string());
        if self.should_fail {
            return Err(AppError::Generation("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Mock web search provider.
///
/// Returns fixed snippets, optionally after a delay, or fails.
#[derive(Clone)]
pub struct MockWebSearch {
    results: Vec<WebSnippet>,
    delay: Option<Duration>,
    should_fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockWebSearch {
    pub fn new(results: Vec<WebSnippet>) -> Self {
        Self {
            results,
            delay: None,
            should_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A provider that answers after `delay`.
    pub fn slow(results: Vec<WebSnippet>, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(results)
        }
    }

    /// A provider that always errors.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearchProvider for MockWebSearch {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<WebSnippet>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(AppError::WebSearch("Mock search failure".to_string()));
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}

/// A web snippet for the IT department page.
pub fn it_department_snippet() -> WebSnippet {
    WebSnippet {
        title: "Information Technology Department - SCET".to_string(),
        url: "https://www.scet.ac.in/departments/it".to_string(),
        snippet: "The IT department at SCET is headed by Dr. Vivaksha Jariwala.".to_string(),
    }
}
