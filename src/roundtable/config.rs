//! Configuration for a roundtable deployment.
//!
//! Provides the [`RoundtableConfig`] struct for the generation model, sampling, prompt
//! bounds and client pacing. Users construct this manually or overlay a few environment
//! variables with [`RoundtableConfig::from_env`]; no file parsing dependencies are required.
//!
//! # Example
//!
//! ```rust
//! use roundtable::RoundtableConfig;
//! use std::time::Duration;
//!
//! let config = RoundtableConfig::default();
//! assert_eq!(config.model, "gpt-4o");
//! assert_eq!(config.question_delay, Duration::from_secs(1));
//!
//! // Tests and batch runs skip the reading pauses.
//! let fast = RoundtableConfig::default().without_pacing();
//! assert!(fast.reply_delay.is_zero());
//! ```

use std::time::Duration;

/// Tunables shared by every session a service runs.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundtableConfig {
    /// Model identifier sent to the generation service.
    pub model: String,
    /// Sampling temperature used by every generation call.
    pub temperature: f32,
    /// Token cap for follow-up question generation.
    pub follow_up_max_tokens: u32,
    /// Number of results requested from the retrieval service.
    pub search_max_results: usize,
    /// Maximum characters of research text embedded into discussion and summary prompts.
    pub research_prompt_limit: usize,
    /// Length of the reply preview in the conversation state snapshot.
    pub reply_preview_chars: usize,
    /// Pause after a facilitator question.
    pub question_delay: Duration,
    /// Pause after a persona reply.
    pub reply_delay: Duration,
    /// Gap between the two `analysis_complete` deliveries.
    pub completion_redelivery_delay: Duration,
    /// Capacity of the event broadcast channel.
    pub event_buffer: usize,
}

impl Default for RoundtableConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            follow_up_max_tokens: 100,
            search_max_results: 5,
            research_prompt_limit: 6_000,
            reply_preview_chars: 100,
            question_delay: Duration::from_secs(1),
            reply_delay: Duration::from_secs(2),
            completion_redelivery_delay: Duration::from_secs(1),
            event_buffer: 1024,
        }
    }
}

impl RoundtableConfig {
    /// Zero every pacing delay (builder pattern).
    pub fn without_pacing(mut self) -> Self {
        self.question_delay = Duration::ZERO;
        self.reply_delay = Duration::ZERO;
        self.completion_redelivery_delay = Duration::ZERO;
        self
    }

    /// Defaults overlaid with `ROUNDTABLE_MODEL`, `ROUNDTABLE_TEMPERATURE` and
    /// `ROUNDTABLE_PACING=off`. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(model) = lookup("ROUNDTABLE_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = lookup("ROUNDTABLE_TEMPERATURE") {
            match raw.trim().parse::<f32>() {
                Ok(t) if (0.0..=2.0).contains(&t) => config.temperature = t,
                _ => log::warn!("ignoring ROUNDTABLE_TEMPERATURE={:?}", raw),
            }
        }
        if let Some(pacing) = lookup("ROUNDTABLE_PACING") {
            if pacing.trim().eq_ignore_ascii_case("off") {
                config = config.without_pacing();
            }
        }
        config
    }
}
