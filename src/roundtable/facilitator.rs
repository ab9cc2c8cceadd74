//! Facilitator decisions: who opens, what to ask next, and how round 2 is arranged.
//!
//! Each decision is a single generation call whose output is parsed by
//! [`crate::roundtable::directives`]. None of them fail: a parse failure or a failed call
//! degrades to a deterministic default that still names the subject.

use crate::client_wrapper::ClientWrapper;
use crate::roundtable::directives::{
    clean_quotation_marks, ensure_question_mark, parse_opening, parse_round_plan,
    OpeningChoice, RoundPlan,
};
use crate::roundtable::error::RoundtableError;
use crate::roundtable::panelist::{persona, Persona, PANEL};
use std::sync::Arc;

const PLANNING_ROLE: &str = "You are a helpful assistant.";
const FOLLOW_UP_ROLE: &str = "You are a skilled discussion facilitator.";

const DEFAULT_OPENER: &str = "Business Strategist";
const CALL_FAILURE_ROUND_TWO_LEAD: &str = "Technology Officer";

pub struct Facilitator {
    client: Arc<dyn ClientWrapper>,
    subject: String,
    temperature: f32,
    follow_up_max_tokens: u32,
}

impl Facilitator {
    pub fn new(client: Arc<dyn ClientWrapper>, subject: impl Into<String>) -> Self {
        Self {
            client,
            subject: subject.into(),
            temperature: 0.7,
            follow_up_max_tokens: 100,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_follow_up_max_tokens(mut self, max_tokens: u32) -> Self {
        self.follow_up_max_tokens = max_tokens;
        self
    }

    /// Pick the opening persona and question from the research text.
    pub async fn choose_opening(&self, research: &str) -> OpeningChoice {
        let subject = &self.subject;
        let panel = panel_list();
        let prompt = format!(
            "You are a discussion facilitator for a business technology analysis roundtable.\n\n\
             Research about {subject}:\n\n\
             {research}\n\n\
             Based on this research data about {subject}, analyze the key themes and determine:\n\
             1. Which expert should begin our discussion (choose from: {panel})\n\
             2. A natural, conversational opening question that references a key insight from the research\n\
             3. Explain in 1-2 sentences why you've chosen this expert to begin\n\n\
             Your opening question should be framed in a conversational way that references something specific from the research, such as:\n\
             The research shows that {subject} is aiming to be a market leader in the Nordics. What do you think about this positioning in light of the data?\n\n\
             Make the question sound natural, as if you're having a real conversation rather than an interview.\n\
             DO NOT include quotation marks around your question.\n\n\
             Reply in this format exactly:\n\
             CHOSEN_EXPERT: [expert name]\n\
             QUESTION: [your conversational opening question that references the research - no quotation marks]\n\
             REASONING: [1-2 sentence explanation of your choice]"
        );

        match self
            .client
            .generate(PLANNING_ROLE, &prompt, self.temperature, None)
            .await
        {
            Ok(raw) => match parse_opening(&raw) {
                Ok(choice) => {
                    log::info!(
                        "Facilitator chose {} to open the discussion",
                        choice.expert.name
                    );
                    choice
                }
                Err(failure) => {
                    log::warn!("Could not parse opening choice ({}), using default", failure);
                    OpeningChoice {
                        expert: default_opener(),
                        question: format!(
                            "The research shows that {subject} is positioning itself as a leader in business technology transformation in the Nordics. \
                             What do you think about this positioning based on the data we have?"
                        ),
                        reasoning: Some(
                            "Business strategy provides a foundational perspective to start our discussion."
                                .to_string(),
                        ),
                    }
                }
            },
            Err(err) => {
                log::error!("Facilitator choice: {}", RoundtableError::generation(&err));
                OpeningChoice {
                    expert: default_opener(),
                    question: format!(
                        "The research shows that {subject} is positioning itself in the market. \
                         What are your thoughts on their business strategy based on what we've learned?"
                    ),
                    reasoning: Some(
                        "Starting with business strategy as a foundation for our discussion."
                            .to_string(),
                    ),
                }
            }
        }
    }

    /// Question for `next` that builds on what `previous` just said. Always ends in `?`.
    pub async fn follow_up_question(
        &self,
        previous: &str,
        previous_reply: &str,
        next: &str,
    ) -> String {
        let subject = &self.subject;
        let prompt = format!(
            "You are a skilled facilitator running a business technology roundtable discussion about {subject}.\n\n\
             The {previous} just said:\n\n\
             {previous_reply}\n\n\
             Now you need to ask the {next} a follow-up question that:\n\
             1. Naturally builds on a specific insight from {previous}'s response\n\
             2. Is tailored to the {next}'s specific expertise and perspective\n\
             3. Maintains conversation flow like in a real roundtable discussion\n\n\
             Structure your question like a natural conversation, for example:\n\
             - That's an interesting point about [specific insight]. From your perspective as {next}, how would this affect...?\n\
             - {previous} mentioned [specific insight]. How does this align with what you've seen in terms of...?\n\
             - Building on what we just heard about [specific insight], what's your take on how this impacts...?\n\n\
             IMPORTANT: DO NOT use quotation marks in your response.\n\
             Write ONLY the question you would ask the {next} - nothing else, no preamble, no quotation marks.\n\
             The ideal length is 1-2 sentences, maximum 30 words."
        );

        match self
            .client
            .generate(
                FOLLOW_UP_ROLE,
                &prompt,
                self.temperature,
                Some(self.follow_up_max_tokens),
            )
            .await
        {
            Ok(raw) => ensure_question_mark(&clean_quotation_marks(raw.trim())),
            Err(err) => {
                log::error!("Follow-up question: {}", RoundtableError::generation(&err));
                format!("Based on what we just heard, what's your perspective as a {next}?")
            }
        }
    }

    /// Plan round 2 from the round-1 transcript. The plan always covers the whole panel.
    pub async fn plan_round_two(&self, round_one_transcript: &str) -> RoundPlan {
        let subject = &self.subject;
        let prompt = format!(
            "Based on the first round of discussion about {subject}:\n\n\
             {round_one_transcript}\n\n\
             As a facilitator, determine:\n\
             1. Which expert should lead the second round (may be different from round 1)\n\
             2. A specific follow-up theme or question that builds on the first round\n\
             3. A suggested order for the remaining experts that creates a natural flow\n\n\
             DO NOT use quotation marks in your responses.\n\n\
             Reply in this format exactly:\n\
             LEAD_EXPERT: [expert name]\n\
             THEME: [concise theme or question for round 2 - no quotation marks]\n\
             ORDER: [comma-separated list of the remaining experts in suggested order]"
        );

        match self
            .client
            .generate(PLANNING_ROLE, &prompt, self.temperature, None)
            .await
        {
            Ok(raw) => match parse_round_plan(&raw) {
                Ok(plan) => {
                    log::info!("Round 2 will be led by {}", plan.lead.name);
                    plan
                }
                Err(failure) => {
                    log::warn!("Could not parse round 2 plan ({}), using default", failure);
                    RoundPlan::in_panel_order(
                        &PANEL[0],
                        format!(
                            "Let's focus on implementation challenges and opportunities for {subject}."
                        ),
                    )
                }
            },
            Err(err) => {
                log::error!("Round two planning: {}", RoundtableError::generation(&err));
                RoundPlan::in_panel_order(
                    persona(CALL_FAILURE_ROUND_TWO_LEAD).unwrap_or(&PANEL[2]),
                    format!(
                        "Let's explore implementation challenges and opportunities for {subject}."
                    ),
                )
            }
        }
    }
}

fn default_opener() -> &'static Persona {
    persona(DEFAULT_OPENER).unwrap_or(&PANEL[0])
}

// "A, B, C, or D"
fn panel_list() -> String {
    let names: Vec<&str> = PANEL.iter().map(|p| p.name).collect();
    match names.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{}, or {}", rest.join(", "), last),
        _ => names.join(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_list_reads_naturally() {
        assert_eq!(
            panel_list(),
            "Business Strategist, Product Manager, Technology Officer, or Innovation Analyst"
        );
    }

    #[test]
    fn default_personas_exist() {
        assert_eq!(default_opener().name, "Business Strategist");
        assert!(persona(CALL_FAILURE_ROUND_TWO_LEAD).is_some());
    }
}
