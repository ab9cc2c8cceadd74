//! Append-only discussion transcript.
//!
//! A transcript is stored as typed entries and rendered to the line format clients and
//! the summarizer see:
//!
//! ```text
//!
//! === Expert Discussion - Round 1 ===
//! Facilitator (to Product Manager): Let's begin our analysis of Acme. ...
//! Product Manager: ...
//!
//! ```
//!
//! Facilitator and persona lines are only appended together through
//! [`Transcript::record_turn`], so a persona line always directly follows the
//! facilitator line addressed to that persona.

use std::borrow::Cow;
use std::fmt;

/// One transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    RoundHeader(u8),
    Facilitator { to: String, text: String },
    Persona { name: String, reply: String },
    Spacer,
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptEntry::RoundHeader(round) => {
                write!(f, "\n=== Expert Discussion - Round {} ===", round)
            }
            TranscriptEntry::Facilitator { to, text } => {
                write!(f, "Facilitator (to {}): {}", to, text)
            }
            TranscriptEntry::Persona { name, reply } => write!(f, "{}: {}", name, reply),
            TranscriptEntry::Spacer => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a round header and return its rendered line.
    pub fn open_round(&mut self, round: u8) -> String {
        let entry = TranscriptEntry::RoundHeader(round);
        let line = entry.to_string();
        self.entries.push(entry);
        line
    }

    /// Append the facilitator line, the persona's reply and a spacer.
    pub fn record_turn(&mut self, persona: &str, facilitator_text: &str, reply: &str) {
        self.entries.push(TranscriptEntry::Facilitator {
            to: persona.to_string(),
            text: facilitator_text.to_string(),
        });
        self.entries.push(TranscriptEntry::Persona {
            name: persona.to_string(),
            reply: reply.to_string(),
        });
        self.entries.push(TranscriptEntry::Spacer);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Number of persona replies recorded so far.
    pub fn reply_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, TranscriptEntry::Persona { .. }))
            .count()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    /// Lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }
}

/// At most `max_chars` characters of `text`, cut on a char boundary.
pub fn bound_chars(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(text[..cut].to_string()),
        None => Cow::Borrowed(text),
    }
}

/// Display preview: the first `max_chars` characters plus `...` when the text is longer.
pub fn preview(text: &str, max_chars: usize) -> String {
    match bound_chars(text, max_chars) {
        Cow::Borrowed(whole) => whole.to_string(),
        Cow::Owned(head) => format!("{}...", head),
    }
}
