//! Live web search.
//!
//! Providers implement [`WebSearchProvider`]: a query string in, ranked
//! snippets out. [`WebRetriever`] bounds every call with a timeout and
//! turns snippets into [`RetrievedItem`]s scored by rank.

use crate::types::{AppError, Result, RetrievedItem, WebSnippet};
use crate::utils::toml_config::{WebSearchConfig, WebSearchProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A search backend. An empty result list is a valid answer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSnippet>>;
}

/// Build the provider selected in `config`, or `None` when web search is disabled.
pub fn create_provider(config: &WebSearchConfig) -> Result<Option<Arc<dyn WebSearchProvider>>> {
    match config.provider {
        WebSearchProviderKind::Disabled => Ok(None),
        WebSearchProviderKind::DuckDuckGo => Ok(Some(Arc::new(DuckDuckGoSearch))),
        WebSearchProviderKind::Tavily => {
            let api_key = std::env::var(&config.tavily_api_key_env).map_err(|_| {
                AppError::Config(format!(
                    "environment variable '{}' is not set",
                    config.tavily_api_key_env
                ))
            })?;
            Ok(Some(Arc::new(TavilySearch::new(
                &config.tavily_url,
                api_key,
                Duration::from_millis(config.timeout_ms),
            )?)))
        }
    }
}

// ============================================================================
// DuckDuckGo (daedra)
// ============================================================================

/// DuckDuckGo search through daedra. Needs no API key.
pub struct DuckDuckGoSearch;

#[async_trait]
impl WebSearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSnippet>> {
        let args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: max_results,
                ..Default::default()
            }),
        };

        let response = daedra::tools::search::perform_search(&args)
            .await
            .map_err(|e| AppError::WebSearch(format!("DuckDuckGo search failed: {}", e)))?;

        Ok(response
            .data
            .into_iter()
            .take(max_results)
            .map(|r| WebSnippet {
                title: r.title,
                url: r.url,
                snippet: r.description,
            })
            .collect())
    }
}

// ============================================================================
// Tavily
// ============================================================================

#[derive(Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

/// Tavily search API client.
pub struct TavilySearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl TavilySearch {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!("{}/search", base_url.trim_end_matches('/')),
            api_key,
        })
    }
}

#[async_trait]
impl WebSearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSnippet>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&TavilyRequest {
                query,
                max_results,
                search_depth: "basic",
            })
            .send()
            .await
            .map_err(|e| AppError::WebSearch(format!("Tavily request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::WebSearch(format!("Tavily returned {}", status)));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| AppError::WebSearch(format!("Invalid Tavily response: {}", e)))?;

        Ok(body
            .results
            .into_iter()
            .take(max_results)
            .map(|r| WebSnippet {
                title: r.title,
                url: r.url,
                snippet: r.content,
            })
            .collect())
    }
}

// ============================================================================
// Retriever
// ============================================================================

/// Timeout-bounded wrapper around a [`WebSearchProvider`].
#[derive(Clone)]
pub struct WebRetriever {
    provider: Option<Arc<dyn WebSearchProvider>>,
    max_results: usize,
    timeout: Duration,
}

impl WebRetriever {
    pub fn new(
        provider: Option<Arc<dyn WebSearchProvider>>,
        max_results: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            max_results,
            timeout,
        }
    }

    pub fn from_config(config: &WebSearchConfig) -> Result<Self> {
        Ok(Self::new(
            create_provider(config)?,
            config.max_results,
            Duration::from_millis(config.timeout_ms),
        ))
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Snippets for `query` scored `1 / (rank + 1)`. Results without a URL
    /// or with a blank snippet are dropped before ranking.
    ///
    /// Fails with [`AppError::RetrievalTimeout`] when the provider does not
    /// answer in time, [`AppError::WebSearch`] when it errors or is disabled.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedItem>> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| AppError::WebSearch("web search is disabled".to_string()))?;

        let snippets = tokio::time::timeout(self.timeout, provider.search(query, self.max_results))
            .await
            .map_err(|_| {
                warn!(provider = provider.name(), "Web search timed out");
                AppError::RetrievalTimeout(self.timeout.as_millis() as u64)
            })??;

        debug!(provider = provider.name(), results = snippets.len(), "Web retrieval");

        Ok(snippets
            .into_iter()
            .filter(|s| !s.url.trim().is_empty() && !s.snippet.trim().is_empty())
            .take(self.max_results)
            .enumerate()
            .map(|(rank, snippet)| RetrievedItem::web(snippet, 1.0 / (rank as f32 + 1.0)))
            .collect())
    }
}
