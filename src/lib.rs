//! # Roundtable
//!
//! Roundtable runs a simulated expert panel about a named subject (typically a company):
//! it researches the subject on the web, lets four fixed personas discuss it over two
//! facilitated rounds, and closes with an executive summary. Progress is streamed as
//! structured events so a live client can follow the conversation turn by turn.
//!
//! The crate is organised around a few seams:
//!
//! * **Generation**: the [`ClientWrapper`] trait, with [`clients::openai::OpenAIClient`] as
//!   the bundled implementation.
//! * **Retrieval**: the [`search::SearchProvider`] trait, with
//!   [`search::duckduckgo::DuckDuckGoSearch`] as the bundled implementation.
//! * **Sessions**: the [`session_store::SessionStore`] trait, with an in-memory store.
//! * **Events**: the [`EventHandler`] trait, with a broadcast [`event::EventBus`].
//! * **Orchestration**: [`AnalysisService`] spawns one run per session and exposes the
//!   polling contract.
//!
//! An optional `server` feature adds an axum HTTP + WebSocket transport in
//! [`server`] and the `roundtable-server` binary.
//!
//! ## Running an analysis
//!
//! ```rust,no_run
//! use roundtable::clients::openai::OpenAIClient;
//! use roundtable::event::EventBus;
//! use roundtable::search::duckduckgo::DuckDuckGoSearch;
//! use roundtable::{AnalysisService, RoundtableConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     roundtable::init_logger();
//!     let config = RoundtableConfig::from_env();
//!     let client = Arc::new(OpenAIClient::new_with_model_string(
//!         &std::env::var("OPEN_AI_SECRET")?,
//!         &config.model,
//!     ));
//!
//!     let bus = Arc::new(EventBus::new(config.event_buffer));
//!     let service = AnalysisService::new(client, Arc::new(DuckDuckGoSearch::new()))
//!         .with_config(config)
//!         .with_event_handler(bus.clone());
//!
//!     let mut events = bus.subscribe();
//!     let handle = service.start_analysis("Acme Corp")?;
//!     while let Ok(event) = events.recv().await {
//!         println!("{}", event.name());
//!         if event.is_terminal() {
//!             break;
//!         }
//!     }
//!
//!     let status = service.check_session(handle.session_id())?;
//!     println!("{}: {}", status.company_name, status.status);
//!     Ok(())
//! }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Driven by `RUST_LOG`; calling it again is a no-op.
///
/// ```rust
/// roundtable::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `roundtable` module.
pub mod roundtable;

// Re-exporting key items for easier external access.
pub use roundtable::client_wrapper;
pub use roundtable::client_wrapper::{ClientWrapper, GenerationParams, Message, Role};
pub use roundtable::clients;
pub use roundtable::config::RoundtableConfig;
pub use roundtable::directives;
pub use roundtable::discussion;
pub use roundtable::error::RoundtableError;
pub use roundtable::event;
pub use roundtable::event::{AnalysisEvent, ConversationState, EventBus, EventHandler};
pub use roundtable::facilitator;
pub use roundtable::orchestration;
pub use roundtable::orchestration::{AnalysisHandle, AnalysisService};
pub use roundtable::panelist;
pub use roundtable::research;
pub use roundtable::search;
#[cfg(feature = "server")]
pub use roundtable::server;
pub use roundtable::session_store;
pub use roundtable::session_store::{Session, SessionStatus, SessionStore};
pub use roundtable::summarizer;
pub use roundtable::transcript;
