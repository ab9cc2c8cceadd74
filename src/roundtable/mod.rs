// src/roundtable/mod.rs

pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod directives;
pub mod discussion;
pub mod error;
pub mod event;
pub mod facilitator;
pub mod orchestration;
pub mod panelist;
pub mod research;
pub mod search;
#[cfg(feature = "server")]
pub mod server;
pub mod session_store;
pub mod summarizer;
pub mod transcript;

// Export the service facade so callers can write roundtable::AnalysisService
pub use orchestration::{AnalysisHandle, AnalysisService};
