//! The two-round expert discussion.
//!
//! Round 1 opens with the facilitator's chosen persona and continues in panel order.
//! Round 2 follows the facilitator's plan. Every turn after a round's first is asked a
//! freshly generated follow-up that builds on the previous reply. Each turn emits a
//! facilitator `message`, waits briefly, gets the persona's reply, records both in the
//! transcript and emits the reply with an updated [`ConversationState`].
//!
//! The discussion never fails: panelists and the facilitator recover from generation
//! errors themselves, so the worst case is a transcript full of error markers.

use crate::client_wrapper::ClientWrapper;
use crate::roundtable::config::RoundtableConfig;
use crate::roundtable::directives::{round_one_order, OpeningChoice, RoundPlan};
use crate::roundtable::event::{AnalysisEvent, ConversationState, EventHandler};
use crate::roundtable::facilitator::Facilitator;
use crate::roundtable::panelist::{Panelist, Persona};
use crate::roundtable::transcript::{bound_chars, preview, Transcript};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const FACILITATOR: &str = "Facilitator";
const ROUND_TWO_CLOSER: &str = "What's your perspective on this?";

/// One session's discussion, from opening choice to the end of round 2.
pub struct Discussion {
    session_id: String,
    subject: String,
    research: String,
    client: Arc<dyn ClientWrapper>,
    facilitator: Facilitator,
    events: Arc<dyn EventHandler>,
    config: Arc<RoundtableConfig>,
    transcript: Transcript,
    state: ConversationState,
    round_one_replies: HashMap<&'static str, String>,
}

impl Discussion {
    pub fn new(
        session_id: impl Into<String>,
        subject: impl Into<String>,
        research: &str,
        client: Arc<dyn ClientWrapper>,
        events: Arc<dyn EventHandler>,
        config: Arc<RoundtableConfig>,
    ) -> Self {
        let subject = subject.into();
        let facilitator = Facilitator::new(client.clone(), subject.clone())
            .with_temperature(config.temperature)
            .with_follow_up_max_tokens(config.follow_up_max_tokens);
        Self {
            session_id: session_id.into(),
            research: bound_chars(research, config.research_prompt_limit).into_owned(),
            subject,
            client,
            facilitator,
            events,
            config,
            transcript: Transcript::new(),
            state: ConversationState::default(),
            round_one_replies: HashMap::new(),
        }
    }

    /// Run both rounds and hand back the finished transcript.
    pub async fn run(mut self) -> Transcript {
        let opening = self.facilitator.choose_opening(&self.research).await;
        self.round_one(opening).await;

        let round_one_text = self.transcript.text();
        self.announce_round(2).await;
        let plan = self.facilitator.plan_round_two(&round_one_text).await;
        self.round_two(plan).await;

        self.transcript
    }

    async fn round_one(&mut self, opening: OpeningChoice) {
        self.announce_round(1).await;
        if let Some(reasoning) = &opening.reasoning {
            log::info!("Opening with {}: {}", opening.expert.name, reasoning);
        }
        let opener_text = format!(
            "Let's begin our analysis of {}. {}",
            self.subject, opening.question
        );
        self.run_round(
            1,
            round_one_order(opening.expert),
            opening.question,
            opener_text,
        )
        .await;
    }

    async fn round_two(&mut self, plan: RoundPlan) {
        let question = format!("{} {}", plan.theme, ROUND_TWO_CLOSER);
        let opener_text = format!("Moving to our second round of discussion. {}", question);
        self.run_round(2, plan.speakers(), question, opener_text)
            .await;
    }

    async fn announce_round(&mut self, round: u8) {
        let header = self.transcript.open_round(round);
        log::info!("{}", header);
        self.emit(AnalysisEvent::RoundUpdate {
            session_id: self.session_id.clone(),
            round,
            message: header,
        })
        .await;
    }

    async fn run_round(
        &mut self,
        round: u8,
        order: Vec<&'static Persona>,
        opening_question: String,
        opener_text: String,
    ) {
        let mut previous: Option<(&'static Persona, String)> = None;
        for (i, speaker) in order.iter().copied().enumerate() {
            let (question, facilitator_text) = match &previous {
                None => (opening_question.clone(), opener_text.clone()),
                Some((prev, prev_reply)) => {
                    let question = self
                        .facilitator
                        .follow_up_question(prev.name, prev_reply, speaker.name)
                        .await;
                    (question.clone(), question)
                }
            };
            let next = order.get(i + 1).copied();
            let reply = self
                .take_turn(round, speaker, question, &facilitator_text, next)
                .await;
            if round == 1 {
                self.round_one_replies.insert(speaker.name, reply.clone());
            }
            previous = Some((speaker, reply));
        }
    }

    async fn take_turn(
        &mut self,
        round: u8,
        speaker: &'static Persona,
        question: String,
        facilitator_text: &str,
        next: Option<&'static Persona>,
    ) -> String {
        log::info!("Facilitator (to {}): {}", speaker.name, facilitator_text);
        self.state.current_speaker = Some(FACILITATOR.to_string());
        self.state.current_speaking_to = Some(speaker.name.to_string());
        self.state.current_question = Some(question.clone());
        self.state.next_speaker = Some(speaker.name.to_string());
        self.emit(AnalysisEvent::Message {
            session_id: self.session_id.clone(),
            speaker: FACILITATOR.to_string(),
            to: Some(speaker.name.to_string()),
            message: question.clone(),
            conversation_state: self.state.clone(),
        })
        .await;
        pause(self.config.question_delay).await;

        let context = self.context_for(round, speaker, &question);
        let reply = Panelist::new(speaker, self.client.clone())
            .with_temperature(self.config.temperature)
            .respond(&context)
            .await;
        self.transcript
            .record_turn(speaker.name, facilitator_text, &reply);
        log::info!("Generated response for {}", speaker.name);

        self.state.current_speaker = Some(speaker.name.to_string());
        self.state.current_speaking_to = None;
        self.state.last_response = Some(preview(&reply, self.config.reply_preview_chars));
        self.state.next_speaker = next.map(|p| p.name.to_string());
        self.emit(AnalysisEvent::Message {
            session_id: self.session_id.clone(),
            speaker: speaker.name.to_string(),
            to: None,
            message: reply.clone(),
            conversation_state: self.state.clone(),
        })
        .await;
        pause(self.config.reply_delay).await;

        reply
    }

    // The persona has no memory of its own; everything it needs goes in here.
    fn context_for(&self, round: u8, speaker: &Persona, question: &str) -> String {
        let subject = &self.subject;
        let research = &self.research;
        if round == 1 {
            let previous = if self.transcript.reply_count() == 0 {
                "This is the start of our discussion.".to_string()
            } else {
                self.transcript.text()
            };
            format!(
                "Research about {subject}:\n\n{research}\n\n\
                 Previous discussion (if any):\n{previous}\n\n\
                 Question: {question}"
            )
        } else {
            let previous = self.transcript.text();
            let own = self
                .round_one_replies
                .get(speaker.name)
                .map(String::as_str)
                .unwrap_or("You haven't spoken yet in this discussion.");
            format!(
                "Research about {subject}:\n\n{research}\n\n\
                 Previous discussion:\n\n{previous}\n\n\
                 Question: {question}\n\n\
                 Your previous response in round 1:\n{own}\n\n\
                 Please build on the discussion rather than repeating points. Respond directly to the question."
            )
        }
    }

    async fn emit(&self, event: AnalysisEvent) {
        self.events.on_analysis_event(&event).await;
    }
}

/// Cooperative pacing sleep; zero durations return immediately.
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
