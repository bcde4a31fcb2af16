//! Web search.
//!
//! - [`search`] - providers (DuckDuckGo via daedra, Tavily) and the
//!   timeout-bounded [`search::WebRetriever`]

/// Web search providers and retriever.
pub mod search;
