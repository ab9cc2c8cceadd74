//! Error taxonomy shared by the roundtable components.
//!
//! Most external failures never reach this type: retrieval and generation errors are
//! recovered at their call sites with deterministic fallbacks. What remains are the
//! failures a caller has to act on: unknown sessions, closed sessions, invalid requests,
//! and whole-phase breakdowns reported by the orchestration run.
//!
//! # Examples
//!
//! ```
//! use roundtable::RoundtableError;
//!
//! let err = RoundtableError::SessionNotFound("abc".into());
//! assert_eq!(err.to_string(), "Session not found: abc");
//! ```

use crate::roundtable::session_store::SessionStatus;
use std::error::Error;
use std::fmt;

/// Errors surfaced by the session store, the service facade and the orchestration run.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundtableError {
    /// The information-retrieval service failed. The research step logs it and switches
    /// to synthetic sources.
    Retrieval(String),

    /// A generation call failed. Each call site logs it and falls back to templated text.
    Generation(String),

    /// A phase broke down after exhausting its local fallbacks.
    Phase {
        /// Human-readable phase prefix, e.g. `"Research phase failed"`.
        phase: &'static str,
        /// Underlying failure.
        message: String,
    },

    /// No session is registered under the given identifier.
    SessionNotFound(String),

    /// The session already reached `complete` or `error` and accepts no further writes.
    SessionClosed(String),

    /// A status change would move the session backwards or skip a phase.
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    /// The request was rejected before a session was created.
    InvalidRequest(String),
}

impl RoundtableError {
    /// A failed search call.
    pub fn retrieval(cause: impl fmt::Display) -> Self {
        RoundtableError::Retrieval(cause.to_string())
    }

    /// A failed generation call.
    pub fn generation(cause: impl fmt::Display) -> Self {
        RoundtableError::Generation(cause.to_string())
    }

    /// Wrap any failure with a phase-identifying prefix.
    pub fn phase(phase: &'static str, cause: impl fmt::Display) -> Self {
        RoundtableError::Phase {
            phase,
            message: cause.to_string(),
        }
    }
}

impl fmt::Display for RoundtableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundtableError::Retrieval(msg) => write!(f, "Retrieval failed: {}", msg),
            RoundtableError::Generation(msg) => write!(f, "Generation failed: {}", msg),
            RoundtableError::Phase { phase, message } => write!(f, "{}: {}", phase, message),
            RoundtableError::SessionNotFound(id) => write!(f, "Session not found: {}", id),
            RoundtableError::SessionClosed(id) => write!(f, "Session already closed: {}", id),
            RoundtableError::InvalidTransition { from, to } => {
                write!(f, "Invalid status transition: {} -> {}", from, to)
            }
            RoundtableError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
        }
    }
}

impl Error for RoundtableError {}
