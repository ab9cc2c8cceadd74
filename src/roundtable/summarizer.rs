//! Executive summary over research and transcript.

use crate::client_wrapper::ClientWrapper;
use crate::roundtable::error::RoundtableError;
use std::sync::Arc;

const SUMMARIZER_ROLE: &str = "You are a summarization expert. Create a comprehensive executive summary that synthesizes the research data \
and expert discussion into key insights and recommendations. Format as a business brief with appropriate headings and structure.";

/// Section outline requested from the model, in order.
pub const SUMMARY_SECTIONS: [&str; 5] = [
    "Overview",
    "Key Business Insights",
    "Technology Considerations",
    "Recommendations",
    "Conclusion",
];

pub struct Summarizer {
    client: Arc<dyn ClientWrapper>,
    temperature: f32,
}

impl Summarizer {
    pub fn new(client: Arc<dyn ClientWrapper>) -> Self {
        Self {
            client,
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// One generation call. Failures come back as an apology pointing at the raw material.
    pub async fn summarize(&self, research: &str, transcript_text: &str) -> String {
        log::info!("Generating summary");
        match self
            .client
            .generate(
                SUMMARIZER_ROLE,
                &summary_prompt(research, transcript_text),
                self.temperature,
                None,
            )
            .await
        {
            Ok(summary) => {
                log::info!("Summary generation completed");
                summary
            }
            Err(err) => {
                log::error!("Summary: {}", RoundtableError::generation(&err));
                format!(
                    "Summary generation failed: {}. Please review the research data and expert discussion directly.",
                    err
                )
            }
        }
    }
}

fn summary_prompt(research: &str, transcript_text: &str) -> String {
    let outline = SUMMARY_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, section)| format!("{}. {}", i + 1, section))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Research Data:\n{research}\n\n\
         Expert Discussion Transcript:\n{transcript_text}\n\n\
         Please provide a comprehensive executive summary with the following sections:\n{outline}"
    )
}
