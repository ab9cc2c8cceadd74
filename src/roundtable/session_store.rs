//! Session Store
//!
//! Process-wide registry of analysis sessions keyed by an opaque identifier. The
//! orchestration run for a session is the only writer of its entry; status polls and
//! WebSocket handshakes read cloned snapshots, which may lag the writer slightly.
//!
//! Every mutation goes through [`Session::apply`], which enforces the lifecycle:
//!
//! ```text
//! initialized -> research -> discussion -> summarizing -> complete
//!       \____________\____________\_____________\________-> error
//! ```
//!
//! Once a session is `complete` or `error` it is closed and further updates fail with
//! [`RoundtableError::SessionClosed`]. Sessions are never evicted; they live for the
//! lifetime of the process.
//!
//! # Example
//!
//! ```
//! use roundtable::session_store::{InMemorySessionStore, SessionStatus, SessionStore, SessionUpdate};
//!
//! let store = InMemorySessionStore::new();
//! let session = store.create("Acme Corp");
//! store.update(&session.id, SessionUpdate::Status(SessionStatus::Research)).unwrap();
//!
//! let snapshot = store.get(&session.id).unwrap();
//! assert_eq!(snapshot.status, SessionStatus::Research);
//! assert!(store.get("missing").is_err());
//! ```

use crate::roundtable::error::RoundtableError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Initialized,
    Research,
    Discussion,
    Summarizing,
    Complete,
    Error,
}

impl SessionStatus {
    /// Wire name, as sent in `status_update` events and polling responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Initialized => "initialized",
            SessionStatus::Research => "research",
            SessionStatus::Discussion => "discussion",
            SessionStatus::Summarizing => "summarizing",
            SessionStatus::Complete => "complete",
            SessionStatus::Error => "error",
        }
    }

    /// `true` for `complete` and `error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Complete | SessionStatus::Error)
    }

    fn rank(&self) -> u8 {
        match self {
            SessionStatus::Initialized => 0,
            SessionStatus::Research => 1,
            SessionStatus::Discussion => 2,
            SessionStatus::Summarizing => 3,
            SessionStatus::Complete => 4,
            SessionStatus::Error => 5,
        }
    }

    /// Whether a session currently in `self` may move to `next`: the same status, the
    /// next phase in sequence, or `error`. Closed sessions accept nothing.
    pub fn can_advance_to(&self, next: SessionStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == *self || next == SessionStatus::Error || next.rank() == self.rank() + 1
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable state of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    #[serde(skip)]
    pub id: String,
    pub company_name: String,
    pub status: SessionStatus,
    pub research_data: String,
    /// Rendered transcript lines in insertion order.
    pub transcript: Vec<String>,
    pub summary: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A single write against a session.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Status(SessionStatus),
    Research(String),
    Transcript(Vec<String>),
    Summary(String),
    /// Move to `error` and record the message.
    Fail(String),
}

impl Session {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            company_name: company_name.into(),
            status: SessionStatus::Initialized,
            research_data: String::new(),
            transcript: Vec::new(),
            summary: String::new(),
            started_at: Utc::now(),
            error: None,
        }
    }

    /// Apply one update, enforcing the lifecycle invariants.
    pub fn apply(&mut self, update: SessionUpdate) -> Result<(), RoundtableError> {
        if self.status.is_terminal() {
            return Err(RoundtableError::SessionClosed(self.id.clone()));
        }
        match update {
            SessionUpdate::Status(next) => {
                if !self.status.can_advance_to(next) {
                    return Err(RoundtableError::InvalidTransition {
                        from: self.status,
                        to: next,
                    });
                }
                self.status = next;
            }
            SessionUpdate::Research(text) => self.research_data = text,
            SessionUpdate::Transcript(lines) => self.transcript = lines,
            SessionUpdate::Summary(text) => self.summary = text,
            SessionUpdate::Fail(message) => {
                self.status = SessionStatus::Error;
                self.error = Some(message);
            }
        }
        Ok(())
    }
}

/// Polling view: `{status, company_name}` plus `summary` once complete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatusView {
    pub status: SessionStatus,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl From<&Session> for SessionStatusView {
    fn from(session: &Session) -> Self {
        Self {
            status: session.status,
            company_name: session.company_name.clone(),
            summary: (session.status == SessionStatus::Complete).then(|| session.summary.clone()),
        }
    }
}

/// Sanitized listing entry without research, transcript or summary bodies.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOverview {
    pub session_id: String,
    pub company_name: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub has_research: bool,
    pub has_transcript: bool,
    pub has_summary: bool,
}

impl From<&Session> for SessionOverview {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            company_name: session.company_name.clone(),
            status: session.status,
            started_at: session.started_at,
            has_research: !session.research_data.is_empty(),
            has_transcript: !session.transcript.is_empty(),
            has_summary: !session.summary.is_empty(),
        }
    }
}

/// Storage seam injected into the orchestration core.
pub trait SessionStore: Send + Sync {
    /// Register a new `initialized` session and return its snapshot.
    fn create(&self, company_name: &str) -> Session;

    /// Snapshot of the session, or [`RoundtableError::SessionNotFound`].
    fn get(&self, id: &str) -> Result<Session, RoundtableError>;

    /// Apply an update and return the resulting snapshot.
    fn update(&self, id: &str, update: SessionUpdate) -> Result<Session, RoundtableError>;

    /// Snapshots of every known session.
    fn list(&self) -> Vec<Session>;
}

/// [`SessionStore`] backed by a concurrent hash map.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, company_name: &str) -> Session {
        let session = Session::new(company_name);
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    fn get(&self, id: &str) -> Result<Session, RoundtableError> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RoundtableError::SessionNotFound(id.to_string()))
    }

    fn update(&self, id: &str, update: SessionUpdate) -> Result<Session, RoundtableError> {
        let mut entry = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| RoundtableError::SessionNotFound(id.to_string()))?;
        entry.apply(update)?;
        Ok(entry.clone())
    }

    fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }
}
