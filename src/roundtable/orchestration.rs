//! Analysis orchestration: one background run per session.
//!
//! [`AnalysisService`] is the entry point the transport talks to. Starting an analysis
//! creates an `initialized` session, spawns an [`AnalysisRun`] on the tokio runtime and
//! returns immediately with an [`AnalysisHandle`]. The run sequences
//!
//! ```text
//! research -> discussion (round 1, round 2) -> summarizing -> complete
//! ```
//!
//! writing each result into the session store and emitting events as it goes. Any phase
//! that breaks down is wrapped with a phase prefix and handed to a single terminal
//! handler, which marks the session `error` and tells subscribers about it three ways
//! (`error`, `status_update`, `analysis_complete`). A client is never left without a
//! terminal signal.
//!
//! # Example
//!
//! ```rust,no_run
//! use roundtable::clients::openai::OpenAIClient;
//! use roundtable::event::EventBus;
//! use roundtable::search::duckduckgo::DuckDuckGoSearch;
//! use roundtable::AnalysisService;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), roundtable::RoundtableError> {
//! let bus = Arc::new(EventBus::new(1024));
//! let service = AnalysisService::new(
//!     Arc::new(OpenAIClient::new_with_model_string("sk-...", "gpt-4o")),
//!     Arc::new(DuckDuckGoSearch::new()),
//! )
//! .with_event_handler(bus.clone());
//!
//! let mut events = bus.subscribe();
//! let handle = service.start_analysis("Acme Corp")?;
//! while let Ok(event) = events.recv().await {
//!     println!("{}", serde_json::to_string(&event).unwrap_or_default());
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! let session = handle.join().await?;
//! println!("{}", session.summary);
//! # Ok(())
//! # }
//! ```

use crate::client_wrapper::ClientWrapper;
use crate::roundtable::config::RoundtableConfig;
use crate::roundtable::discussion::{pause, Discussion};
use crate::roundtable::error::RoundtableError;
use crate::roundtable::event::{AnalysisEvent, EventHandler};
use crate::roundtable::research::ResearchRetriever;
use crate::roundtable::search::SearchProvider;
use crate::roundtable::session_store::{
    InMemorySessionStore, Session, SessionOverview, SessionStatus, SessionStatusView,
    SessionStore, SessionUpdate,
};
use crate::roundtable::summarizer::Summarizer;
use crate::roundtable::transcript::bound_chars;
use std::sync::Arc;
use tokio::task::JoinHandle;

const RESEARCH_FAILED: &str = "Research phase failed";
const DISCUSSION_FAILED: &str = "Discussion phase failed";
const SUMMARY_FAILED: &str = "Summary generation failed";

struct Silent;

impl EventHandler for Silent {}

/// Handle to a spawned analysis run.
///
/// The transport usually drops it (the run is detached); tests and batch callers can
/// [`join`](AnalysisHandle::join) to wait for the final session snapshot.
#[derive(Debug)]
pub struct AnalysisHandle {
    session_id: String,
    task: JoinHandle<Result<Session, RoundtableError>>,
}

impl AnalysisHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run. Phase failures come back as [`RoundtableError::Phase`].
    pub async fn join(self) -> Result<Session, RoundtableError> {
        match self.task.await {
            Ok(result) => result,
            Err(join_error) => Err(RoundtableError::phase("Analysis task failed", join_error)),
        }
    }
}

/// Everything one run needs, owned so it can move into a spawned task.
pub struct AnalysisRun {
    session_id: String,
    subject: String,
    config: Arc<RoundtableConfig>,
    client: Arc<dyn ClientWrapper>,
    search: Arc<dyn SearchProvider>,
    store: Arc<dyn SessionStore>,
    events: Arc<dyn EventHandler>,
}

impl AnalysisRun {
    /// Run every phase to completion or to the terminal error handler.
    pub async fn execute(self) -> Result<Session, RoundtableError> {
        log::info!(
            "Starting analysis for {} (session: {})",
            self.subject,
            self.session_id
        );
        match self.run_phases().await {
            Ok(session) => {
                log::info!("Analysis successfully completed for session {}", self.session_id);
                Ok(session)
            }
            Err(err) => {
                self.fail(&err).await;
                Err(err)
            }
        }
    }

    async fn run_phases(&self) -> Result<Session, RoundtableError> {
        let research = self
            .research_phase()
            .await
            .map_err(|e| RoundtableError::phase(RESEARCH_FAILED, e))?;
        let transcript = self
            .discussion_phase(&research)
            .await
            .map_err(|e| RoundtableError::phase(DISCUSSION_FAILED, e))?;
        self.summary_phase(&research, &transcript)
            .await
            .map_err(|e| RoundtableError::phase(SUMMARY_FAILED, e))
    }

    async fn research_phase(&self) -> Result<String, RoundtableError> {
        self.update(SessionUpdate::Status(SessionStatus::Research))?;
        self.status(
            SessionStatus::Research,
            format!("Researching {}...", self.subject),
        )
        .await;

        let research = ResearchRetriever::new(self.search.clone(), self.client.clone())
            .with_max_results(self.config.search_max_results)
            .with_temperature(self.config.temperature)
            .retrieve(&self.subject)
            .await;

        self.update(SessionUpdate::Research(research.clone()))?;
        self.update(SessionUpdate::Status(SessionStatus::Discussion))?;
        self.emit(AnalysisEvent::ResearchComplete {
            session_id: self.session_id.clone(),
            research_data: research.clone(),
            company_name: self.subject.clone(),
        })
        .await;
        Ok(research)
    }

    async fn discussion_phase(&self, research: &str) -> Result<String, RoundtableError> {
        self.status(
            SessionStatus::Discussion,
            "Starting expert discussion...".to_string(),
        )
        .await;

        let transcript = Discussion::new(
            self.session_id.clone(),
            self.subject.clone(),
            research,
            self.client.clone(),
            self.events.clone(),
            self.config.clone(),
        )
        .run()
        .await;

        self.update(SessionUpdate::Transcript(transcript.lines()))?;
        self.update(SessionUpdate::Status(SessionStatus::Summarizing))?;
        Ok(transcript.text())
    }

    async fn summary_phase(
        &self,
        research: &str,
        transcript_text: &str,
    ) -> Result<Session, RoundtableError> {
        self.status(
            SessionStatus::Summarizing,
            "Creating executive summary...".to_string(),
        )
        .await;

        let summary = Summarizer::new(self.client.clone())
            .with_temperature(self.config.temperature)
            .summarize(
                &bound_chars(research, self.config.research_prompt_limit),
                transcript_text,
            )
            .await;

        self.update(SessionUpdate::Summary(summary.clone()))?;
        let session = self.update(SessionUpdate::Status(SessionStatus::Complete))?;

        log::info!(
            "Analysis complete, emitting completion events for session {}",
            self.session_id
        );
        self.status(
            SessionStatus::Complete,
            "Analysis complete. Preparing results...".to_string(),
        )
        .await;
        let completion = AnalysisEvent::AnalysisComplete {
            session_id: self.session_id.clone(),
            summary: Some(summary),
            error: None,
            status: None,
        };
        self.emit(completion.clone()).await;
        pause(self.config.completion_redelivery_delay).await;
        // identical redelivery; subscribers dedupe on session_id
        self.emit(completion).await;

        Ok(session)
    }

    async fn fail(&self, err: &RoundtableError) {
        let message = err.to_string();
        log::error!("Error during analysis: {}", message);

        if let Err(store_err) = self.update(SessionUpdate::Fail(message.clone())) {
            log::warn!(
                "Could not record failure for session {}: {}",
                self.session_id,
                store_err
            );
        }

        self.emit(AnalysisEvent::Error {
            session_id: self.session_id.clone(),
            error: message.clone(),
        })
        .await;
        self.status(SessionStatus::Error, format!("Error: {}", message))
            .await;
        self.emit(AnalysisEvent::AnalysisComplete {
            session_id: self.session_id.clone(),
            summary: None,
            error: Some(message),
            status: Some(SessionStatus::Error.as_str().to_string()),
        })
        .await;
    }

    fn update(&self, update: SessionUpdate) -> Result<Session, RoundtableError> {
        self.store.update(&self.session_id, update)
    }

    async fn status(&self, status: SessionStatus, message: String) {
        self.emit(AnalysisEvent::StatusUpdate {
            session_id: self.session_id.clone(),
            status: status.as_str().to_string(),
            message,
        })
        .await;
    }

    async fn emit(&self, event: AnalysisEvent) {
        self.events.on_analysis_event(&event).await;
    }
}

/// Service facade: owns the collaborators and starts runs.
#[derive(Clone)]
pub struct AnalysisService {
    config: Arc<RoundtableConfig>,
    client: Arc<dyn ClientWrapper>,
    search: Arc<dyn SearchProvider>,
    store: Arc<dyn SessionStore>,
    events: Arc<dyn EventHandler>,
}

impl AnalysisService {
    /// Service with default config, an in-memory store and no event handler.
    pub fn new(client: Arc<dyn ClientWrapper>, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            config: Arc::new(RoundtableConfig::default()),
            client,
            search,
            store: Arc::new(InMemorySessionStore::new()),
            events: Arc::new(Silent),
        }
    }

    pub fn with_config(mut self, config: RoundtableConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    /// Route run events to `handler`, e.g. an [`EventBus`](crate::roundtable::event::EventBus).
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.events = handler;
        self
    }

    pub fn config(&self) -> &RoundtableConfig {
        &self.config
    }

    /// Create a session for `subject` and spawn its run. Must be called inside a tokio runtime.
    pub fn start_analysis(&self, subject: &str) -> Result<AnalysisHandle, RoundtableError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(RoundtableError::InvalidRequest(
                "Company name is required".to_string(),
            ));
        }
        log::info!("Starting analysis for company: {}", subject);

        let session = self.store.create(subject);
        let run = AnalysisRun {
            session_id: session.id.clone(),
            subject: subject.to_string(),
            config: self.config.clone(),
            client: self.client.clone(),
            search: self.search.clone(),
            store: self.store.clone(),
            events: self.events.clone(),
        };
        Ok(AnalysisHandle {
            session_id: session.id,
            task: tokio::spawn(run.execute()),
        })
    }

    /// Polling view of a session.
    pub fn check_session(&self, session_id: &str) -> Result<SessionStatusView, RoundtableError> {
        self.store
            .get(session_id)
            .map(|session| SessionStatusView::from(&session))
            .map_err(|err| {
                log::warn!("Requested status for nonexistent session: {}", session_id);
                err
            })
    }

    /// Full snapshot of a session.
    pub fn session_data(&self, session_id: &str) -> Result<Session, RoundtableError> {
        self.store.get(session_id)
    }

    /// Sanitized listing of every session, oldest first.
    pub fn list_sessions(&self) -> Vec<SessionOverview> {
        self.store.list().iter().map(SessionOverview::from).collect()
    }
}
