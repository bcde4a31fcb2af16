//! Per-query routing between the local index and web search.
//!
//! The decision is a small closed state machine over [`Route`]:
//!
//! | local top-1 score             | route  |
//! |-------------------------------|--------|
//! | `>= high_confidence`          | LOCAL  |
//! | between the thresholds        | HYBRID |
//! | `< low_confidence` or empty   | WEB (HYBRID if the query names the institution) |
//!
//! Local retrieval always runs first, so a LOCAL decision never touches
//! the web. Failures narrow the route instead of failing the request.

use crate::rag::retriever::{top_score, LocalRetriever};
use crate::tools::search::WebRetriever;
use crate::types::{AppError, ConversationTurn, Degradation, RetrievedItem, Route};
use crate::utils::toml_config::RouterConfig;
use tracing::{debug, warn};

/// Retrieval results for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingOutcome {
    pub route: Route,
    /// Local items first, then web items.
    pub items: Vec<RetrievedItem>,
    pub degraded: Option<Degradation>,
    /// Best local similarity, if the local index produced any hit.
    pub local_top: Option<f32>,
}

pub struct QueryRouter {
    local: LocalRetriever,
    web: WebRetriever,
    config: RouterConfig,
}

impl QueryRouter {
    pub fn new(local: LocalRetriever, web: WebRetriever, config: RouterConfig) -> Self {
        Self { local, web, config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Route from the local top-1 score alone.
    ///
    /// `top` is `None` when the index is empty or no hit passed the
    /// similarity floor.
    pub fn decide(&self, top: Option<f32>, index_empty: bool, query: &str) -> Route {
        let weak = match top {
            Some(score) if score >= self.config.high_confidence => return Route::Local,
            Some(score) => score < self.config.low_confidence,
            None => true,
        };

        if !weak {
            Route::Hybrid
        } else if !index_empty && self.mentions_hint_term(query) {
            Route::Hybrid
        } else {
            Route::Web
        }
    }

    /// Whether `query` contains one of the configured hint terms as
    /// whole words.
    pub fn mentions_hint_term(&self, query: &str) -> bool {
        let normalized = format!(" {} ", normalize(query));
        self.config.hint_terms.iter().any(|term| {
            let term = normalize(term);
            !term.is_empty() && normalized.contains(&format!(" {} ", term))
        })
    }

    /// Expand a short follow-up with the previous query, e.g. "and his
    /// email?" after "Who is the HOD of IT?".
    pub fn contextualize(&self, query: &str, previous: Option<&ConversationTurn>) -> String {
        match previous {
            Some(turn)
                if self.config.followup_max_words > 0
                    && query.split_whitespace().count() <= self.config.followup_max_words =>
            {
                format!("{} {}", turn.query.trim(), query.trim())
            }
            _ => query.trim().to_string(),
        }
    }

    /// Retrieve for `query`, choosing and degrading the route as needed.
    pub async fn route(&self, query: &str, previous: Option<&ConversationTurn>) -> RoutingOutcome {
        let retrieval_query = self.contextualize(query, previous);
        let index_empty = self.local.is_empty();

        let local_items = match self.local.retrieve(&retrieval_query).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Local retrieval failed, falling back to web");
                return self.web_only(&retrieval_query).await;
            }
        };

        let local_top = top_score(&local_items);
        let route = self.decide(local_top, index_empty, &retrieval_query);
        debug!(?local_top, %route, "Routing decision");

        if route == Route::Local {
            return RoutingOutcome {
                route,
                items: local_items,
                degraded: None,
                local_top,
            };
        }

        match self.web.retrieve(&retrieval_query).await {
            Ok(web_items) => {
                let items = if route == Route::Hybrid {
                    local_items.into_iter().chain(web_items).collect()
                } else {
                    web_items
                };
                RoutingOutcome {
                    route,
                    items,
                    degraded: None,
                    local_top,
                }
            }
            Err(e) => {
                let degradation = match e {
                    AppError::RetrievalTimeout(_) => Degradation::WebTimeout,
                    _ => Degradation::WebUnavailable,
                };
                warn!(error = %e, %degradation, "Web retrieval failed");

                // An empty index leaves nothing to answer from.
                let route = if index_empty { Route::None } else { Route::Local };
                RoutingOutcome {
                    route,
                    items: local_items,
                    degraded: Some(degradation),
                    local_top,
                }
            }
        }
    }

    async fn web_only(&self, query: &str) -> RoutingOutcome {
        match self.web.retrieve(query).await {
            Ok(items) => RoutingOutcome {
                route: Route::Web,
                items,
                degraded: Some(Degradation::LocalUnavailable),
                local_top: None,
            },
            Err(e) => {
                warn!(error = %e, "Web retrieval failed as well; no retrieval path left");
                RoutingOutcome {
                    route: Route::None,
                    items: Vec::new(),
                    degraded: Some(Degradation::LocalUnavailable),
                    local_top: None,
                }
            }
        }
    }
}

fn normalize(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
