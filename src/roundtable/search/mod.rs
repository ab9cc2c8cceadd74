//! Information-retrieval seam.
//!
//! The research step only needs "query in, a few title/snippet pairs out". Implement
//! [`SearchProvider`] to plug in any backend; [`duckduckgo::DuckDuckGoSearch`] is the
//! bundled one.

pub mod duckduckgo;

use crate::client_wrapper::SendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One retrieval hit. Either field may be missing depending on the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: Option<String>,
    pub snippet: Option<String>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            snippet: Some(snippet.into()),
        }
    }
}

/// Contract consumed by the research retriever.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query` and return at most `max_results` hits. An empty list means no results.
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<SearchResult>, SendError>;
}
