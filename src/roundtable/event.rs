//! Analysis event system.
//!
//! Provides the callback-based streaming layer between the orchestration core and the
//! transport. Implement [`EventHandler`] to receive every [`AnalysisEvent`] a run emits:
//!
//! - **Phase transitions**: `status_update` with a human readable progress line
//! - **Round boundaries**: `round_update`
//! - **Utterances**: `message` for every facilitator question and persona reply, together
//!   with a [`ConversationState`] snapshot
//! - **Research**: `research_complete` once the research text is ready
//! - **Completion**: `analysis_complete` (delivered twice on success) and `error`
//!
//! Delivery is at-least-once with best-effort ordering. Handlers must not assume a
//! terminal event arrives exactly once.
//!
//! # Architecture
//!
//! The run holds a single `Arc<dyn EventHandler>`. [`EventBus`] is the stock
//! implementation: it fans events out over a `tokio::sync::broadcast` channel so any
//! number of WebSocket connections can subscribe, each optionally filtered to a single
//! session.
//!
//! # Example
//!
//! ```rust,no_run
//! use roundtable::event::{AnalysisEvent, EventHandler};
//! use async_trait::async_trait;
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl EventHandler for Printer {
//!     async fn on_analysis_event(&self, event: &AnalysisEvent) {
//!         println!("[{}] {}", event.session_id(), event.name());
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

/// Projection of "who is talking to whom" sent with every `message` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationState {
    pub current_speaker: Option<String>,
    pub current_speaking_to: Option<String>,
    pub current_question: Option<String>,
    /// Reply preview, truncated for display.
    pub last_response: Option<String>,
    pub next_speaker: Option<String>,
}

/// Events streamed to subscribers of a session.
///
/// Serialized as `{"event": "<name>", "data": {...}}` so the transport can forward the
/// name and payload unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum AnalysisEvent {
    StatusUpdate {
        session_id: String,
        status: String,
        message: String,
    },
    RoundUpdate {
        session_id: String,
        round: u8,
        message: String,
    },
    Message {
        session_id: String,
        speaker: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        message: String,
        conversation_state: ConversationState,
    },
    ResearchComplete {
        session_id: String,
        research_data: String,
        company_name: String,
    },
    /// Success carries `summary`; failure carries `error` and `status: "error"`.
    AnalysisComplete {
        session_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },
    Error {
        session_id: String,
        error: String,
    },
}

impl AnalysisEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisEvent::StatusUpdate { .. } => "status_update",
            AnalysisEvent::RoundUpdate { .. } => "round_update",
            AnalysisEvent::Message { .. } => "message",
            AnalysisEvent::ResearchComplete { .. } => "research_complete",
            AnalysisEvent::AnalysisComplete { .. } => "analysis_complete",
            AnalysisEvent::Error { .. } => "error",
        }
    }

    /// Session the event belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            AnalysisEvent::StatusUpdate { session_id, .. }
            | AnalysisEvent::RoundUpdate { session_id, .. }
            | AnalysisEvent::Message { session_id, .. }
            | AnalysisEvent::ResearchComplete { session_id, .. }
            | AnalysisEvent::AnalysisComplete { session_id, .. }
            | AnalysisEvent::Error { session_id, .. } => session_id,
        }
    }

    /// `analysis_complete` or `error`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnalysisEvent::AnalysisComplete { .. } | AnalysisEvent::Error { .. }
        )
    }
}

/// Trait for receiving analysis events.
///
/// # Thread Safety
///
/// The `Send + Sync` bound allows the handler to be shared across spawned runs via
/// `Arc<dyn EventHandler>`. Handlers are awaited inline by the run, so slow handlers
/// slow the discussion down; hand work off to a channel when in doubt.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Called for every event a run emits. The default implementation is a no-op.
    async fn on_analysis_event(&self, _event: &AnalysisEvent) {}
}

/// Multi-consumer event bus built on `tokio::sync::broadcast`.
///
/// Publishing with no subscribers is a no-op. Cloning the bus clones the sender.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AnalysisEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every future event of every session.
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.sender.subscribe()
    }

    /// Receive every future event of one session.
    pub fn subscribe_session(&self, session_id: impl Into<String>) -> SessionSubscription {
        SessionSubscription {
            session_id: session_id.into(),
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: AnalysisEvent) {
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[async_trait]
impl EventHandler for EventBus {
    async fn on_analysis_event(&self, event: &AnalysisEvent) {
        self.publish(event.clone());
    }
}

/// A broadcast receiver filtered to a single session.
pub struct SessionSubscription {
    session_id: String,
    receiver: broadcast::Receiver<AnalysisEvent>,
}

impl SessionSubscription {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Next event for this session.
    ///
    /// Returns `Ok(None)` once the bus is gone, and `Err(n)` when the subscriber fell
    /// behind and `n` events were dropped; receiving can continue after a lag.
    pub async fn recv(&mut self) -> Result<Option<AnalysisEvent>, u64> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.session_id() == self.session_id => return Ok(Some(event)),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => return Err(skipped),
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            }
        }
    }
}
