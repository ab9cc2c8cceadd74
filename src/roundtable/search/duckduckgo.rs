//! [`SearchProvider`] backed by the DuckDuckGo Instant Answer API.
//!
//! The endpoint returns a topical abstract plus a list of related topics rather than
//! ranked web pages. The abstract becomes the first hit; each related topic becomes one
//! more, titled after its canonical URL. Nested topic groups are flattened in order.

use crate::client_wrapper::SendError;
use crate::clients::common::get_shared_http_client;
use crate::roundtable::search::{SearchProvider, SearchResult};
use async_trait::async_trait;
use serde_json::Value;

const DEFAULT_ENDPOINT: &str = "https://api.duckduckgo.com/";

/// DuckDuckGo Instant Answer client.
pub struct DuckDuckGoSearch {
    endpoint: String,
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Point the client at a different host, e.g. a local stub.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: get_shared_http_client().clone(),
        }
    }

    fn request_url(&self, query: &str) -> String {
        format!(
            "{}?q={}&format=json&no_html=1&skip_disambig=1",
            self.endpoint,
            urlencoding::encode(query)
        )
    }
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SendError> {
        log::info!("Performing web search for: {}", query);
        let response = self
            .client
            .get(self.request_url(query))
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        Ok(parse_instant_answer(&body, max_results))
    }
}

/// Turn an Instant Answer payload into at most `max_results` hits.
pub fn parse_instant_answer(body: &Value, max_results: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    let abstract_text = text_field(body, "AbstractText");
    if let Some(snippet) = abstract_text {
        results.push(SearchResult {
            title: text_field(body, "Heading"),
            snippet: Some(snippet),
        });
    }

    if let Some(topics) = body.get("RelatedTopics").and_then(Value::as_array) {
        collect_topics(topics, &mut results);
    }

    results.truncate(max_results);
    results
}

fn collect_topics(topics: &[Value], out: &mut Vec<SearchResult>) {
    for topic in topics {
        if let Some(nested) = topic.get("Topics").and_then(Value::as_array) {
            collect_topics(nested, out);
            continue;
        }
        let snippet = text_field(topic, "Text");
        let title = topic
            .get("FirstURL")
            .and_then(Value::as_str)
            .and_then(title_from_url);
        if title.is_some() || snippet.is_some() {
            out.push(SearchResult { title, snippet });
        }
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// https://duckduckgo.com/Acme_Corporation -> "Acme Corporation"
fn title_from_url(url: &str) -> Option<String> {
    let slug = url.trim_end_matches('/').rsplit('/').next()?;
    let decoded = urlencoding::decode(slug).ok()?;
    let title = decoded.replace('_', " ");
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}
