//! Panelists: the four fixed personas that make up every roundtable.
//!
//! Personas are static and shared across sessions. They hold no memory; the facilitator
//! hands each one its full context (research, transcript so far, question) on every turn.
//!
//! The panel order in [`PANEL`] is significant: it is the order round 1 follows after the
//! opening speaker, and the order used to fill gaps in a round-2 plan.
//!
//! # Example
//!
//! ```
//! use roundtable::panelist::{persona, PANEL};
//!
//! assert_eq!(PANEL.len(), 4);
//! assert_eq!(PANEL[0].name, "Business Strategist");
//! assert!(persona("Technology Officer").is_some());
//! assert!(persona("Chief Vibes Officer").is_none());
//! ```

use crate::client_wrapper::ClientWrapper;
use crate::roundtable::error::RoundtableError;
use std::sync::Arc;

/// Style directive appended to every persona's instructions.
pub const STYLE_DIRECTIVE: &str = " Respond in a friendly, conversational tone as if you're speaking in a roundtable discussion with colleagues. \
Keep your response concise (maximum 3-4 short paragraphs) and avoid using bullet points or numbered lists. \
Use natural language and avoid formal academic style. Focus on 1-2 key insights rather than being comprehensive. \
Your answer should sound like something a human expert would say in a casual professional conversation.";

/// A fixed-role discussant.
#[derive(Debug, PartialEq, Eq)]
pub struct Persona {
    /// Display name, unique within the panel.
    pub name: &'static str,
    /// One-line focus description.
    pub personality: &'static str,
    /// Behavioural instructions, before the shared style directive.
    pub instructions: &'static str,
}

impl Persona {
    /// Instructions with the shared style directive appended.
    pub fn system_prompt(&self) -> String {
        format!("{}{}", self.instructions, STYLE_DIRECTIVE)
    }
}

/// The panel, in definition order.
pub static PANEL: [Persona; 4] = [
    Persona {
        name: "Business Strategist",
        personality: "Focused on overall business value, strategic insights, and market positioning.",
        instructions: "You are a Business Strategist following the Business Technology Standard. \
Share your insights about overall business strategy, market dynamics, and value creation. \
Express your opinions in a thoughtful, human-like way.",
    },
    Persona {
        name: "Product Manager",
        personality: "Focused on product development, user experience, and service planning.",
        instructions: "You are a Product Manager following the Business Technology Standard. \
Discuss product development, service design, and ways to enhance user experience. \
Give detailed opinions in a conversational style, as if you're discussing ideas with a colleague.",
    },
    Persona {
        name: "Technology Officer",
        personality: "Focused on technical feasibility, IT governance, and operational technology.",
        instructions: "You are a Technology Officer following the Business Technology Standard. \
Talk about technical challenges, IT governance, and operational technology aspects in an approachable and natural manner.",
    },
    Persona {
        name: "Innovation Analyst",
        personality: "Focused on innovation management, data trends, and emerging technology opportunities.",
        instructions: "You are an Innovation Analyst following the Business Technology Standard. \
Share your thoughts on innovation processes, data trends, and future technology opportunities with warmth and clarity.",
    },
];

/// Look a persona up by exact display name.
pub fn persona(name: &str) -> Option<&'static Persona> {
    PANEL.iter().find(|p| p.name == name)
}

/// A persona bound to a generation client.
pub struct Panelist {
    pub persona: &'static Persona,
    client: Arc<dyn ClientWrapper>,
    temperature: f32,
}

impl Panelist {
    pub fn new(persona: &'static Persona, client: Arc<dyn ClientWrapper>) -> Self {
        Self {
            persona,
            client,
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Reply to `context`. Generation failures come back as an inline error marker.
    pub async fn respond(&self, context: &str) -> String {
        log::info!("Getting response from {}", self.persona.name);
        match self
            .client
            .generate(&self.persona.system_prompt(), context, self.temperature, None)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                log::error!(
                    "Response from {}: {}",
                    self.persona.name,
                    RoundtableError::generation(&err)
                );
                format!(
                    "[Error generating response from {}: {}]",
                    self.persona.name, err
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn panel_names_are_unique() {
        let names: HashSet<_> = PANEL.iter().map(|p| p.name).collect();
        assert_eq!(names.len(), PANEL.len());
    }

    #[test]
    fn system_prompt_carries_style_directive() {
        let prompt = PANEL[2].system_prompt();
        assert!(prompt.starts_with("You are a Technology Officer"));
        assert!(prompt.ends_with("casual professional conversation."));
        assert!(prompt.contains("avoid using bullet points"));
    }
}
