use async_trait::async_trait;
use roundtable::client_wrapper::{ClientWrapper, GenerationParams, Message, Role, SendError};
use roundtable::event::{AnalysisEvent, EventBus};
use roundtable::search::{SearchProvider, SearchResult};
use roundtable::session_store::{
    InMemorySessionStore, Session, SessionStatus, SessionStore, SessionUpdate,
};
use roundtable::{AnalysisService, RoundtableConfig, RoundtableError};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Answers every call kind with canned text; optionally fails the summarizer.
struct MockClient {
    fail_summary: bool,
}

#[async_trait]
impl ClientWrapper for MockClient {
    async fn send_message(
        &self,
        messages: &[Message],
        _params: GenerationParams,
    ) -> Result<Message, SendError> {
        let system = messages[0].content.to_string();
        let user = messages[1].content.to_string();

        let reply = if system.starts_with("You are a research assistant") {
            "Acme Corp builds anvils and rocket skates for a loyal niche market.".to_string()
        } else if system.starts_with("You are a summarization expert") {
            if self.fail_summary {
                return Err("context length exceeded".into());
            }
            "Overview: Acme is doing fine.\nConclusion: Keep building anvils.".to_string()
        } else if user.contains("CHOSEN_EXPERT") {
            "CHOSEN_EXPERT: Product Manager\nQUESTION: Who buys the anvils?\nREASONING: Customers first."
                .to_string()
        } else if user.contains("LEAD_EXPERT") {
            "LEAD_EXPERT: Business Strategist\nTHEME: Growth beyond anvils\nORDER: Innovation Analyst, Product Manager, Technology Officer"
                .to_string()
        } else if system == "You are a skilled discussion facilitator." {
            "What would you build next".to_string()
        } else {
            "I think the anvil business is steady but needs a digital channel.".to_string()
        };
        Ok(Message::new(Role::Assistant, reply))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

struct MockSearch {
    fail: bool,
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(
        &self,
        _query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchResult>, SendError> {
        if self.fail {
            Err("search backend unreachable".into())
        } else {
            Ok(vec![SearchResult::new("Acme Corporation", "A maker of anvils.")])
        }
    }
}

/// Delegates to the in-memory store but refuses to store transcripts.
#[derive(Default)]
struct TranscriptRejectingStore {
    inner: InMemorySessionStore,
}

impl SessionStore for TranscriptRejectingStore {
    fn create(&self, company_name: &str) -> Session {
        self.inner.create(company_name)
    }

    fn get(&self, id: &str) -> Result<Session, RoundtableError> {
        self.inner.get(id)
    }

    fn update(&self, id: &str, update: SessionUpdate) -> Result<Session, RoundtableError> {
        if let SessionUpdate::Transcript(_) = update {
            return Err(RoundtableError::InvalidRequest("disk full".to_string()));
        }
        self.inner.update(id, update)
    }

    fn list(&self) -> Vec<Session> {
        self.inner.list()
    }
}

fn service(client: MockClient, search: MockSearch) -> (AnalysisService, Arc<EventBus>) {
    let bus = Arc::new(EventBus::new(1024));
    let service = AnalysisService::new(Arc::new(client), Arc::new(search))
        .with_config(RoundtableConfig::default().without_pacing())
        .with_event_handler(bus.clone());
    (service, bus)
}

fn drain(receiver: &mut broadcast::Receiver<AnalysisEvent>) -> Vec<AnalysisEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

fn statuses(events: &[AnalysisEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            AnalysisEvent::StatusUpdate { status, .. } => Some(status.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_full_run_completes_with_redundant_completion() {
    let (service, bus) = service(MockClient { fail_summary: false }, MockSearch { fail: false });
    let mut receiver = bus.subscribe();

    let handle = service.start_analysis("Acme Corp").unwrap();
    let session_id = handle.session_id().to_string();
    let session = handle.join().await.unwrap();

    assert_eq!(session.status, SessionStatus::Complete);
    assert!(!session.summary.is_empty());
    assert!(!session.transcript.is_empty());
    assert!(session.error.is_none());

    let events = drain(&mut receiver);
    assert!(events.iter().all(|e| e.session_id() == session_id));
    assert_eq!(
        statuses(&events),
        vec!["research", "discussion", "summarizing", "complete"]
    );

    let completions: Vec<&AnalysisEvent> = events
        .iter()
        .filter(|e| e.name() == "analysis_complete")
        .collect();
    assert!(completions.len() >= 2);
    assert_eq!(completions[0], completions[1]);
    match completions[0] {
        AnalysisEvent::AnalysisComplete { summary, error, .. } => {
            assert_eq!(summary.as_deref(), Some(session.summary.as_str()));
            assert!(error.is_none());
        }
        other => panic!("unexpected event {:?}", other),
    }

    let replies = events
        .iter()
        .filter(|e| matches!(e, AnalysisEvent::Message { speaker, .. } if speaker != "Facilitator"))
        .count();
    assert_eq!(replies, 8);

    let view = service.check_session(&session_id).unwrap();
    assert_eq!(view.status, SessionStatus::Complete);
    assert_eq!(view.company_name, "Acme Corp");
    assert_eq!(view.summary.as_deref(), Some(session.summary.as_str()));
}

#[tokio::test]
async fn test_failed_retrieval_still_reaches_discussion() {
    let (service, bus) = service(MockClient { fail_summary: false }, MockSearch { fail: true });
    let mut receiver = bus.subscribe();

    let session = service
        .start_analysis("Acme Corp")
        .unwrap()
        .join()
        .await
        .unwrap();

    assert!(session.research_data.contains("Acme Corp"));
    let events = drain(&mut receiver);
    assert!(statuses(&events).contains(&"discussion".to_string()));
    assert!(events.iter().any(|e| matches!(
        e,
        AnalysisEvent::ResearchComplete { company_name, .. } if company_name == "Acme Corp"
    )));
}

#[tokio::test]
async fn test_summary_failure_still_completes_with_apology() {
    let (service, _bus) = service(MockClient { fail_summary: true }, MockSearch { fail: false });

    let session = service
        .start_analysis("Acme Corp")
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Complete);
    assert!(session
        .summary
        .starts_with("Summary generation failed: context length exceeded."));
}

#[tokio::test]
async fn test_phase_failure_marks_session_error_and_notifies() {
    let bus = Arc::new(EventBus::new(1024));
    let store = Arc::new(TranscriptRejectingStore::default());
    let service = AnalysisService::new(
        Arc::new(MockClient { fail_summary: false }),
        Arc::new(MockSearch { fail: false }),
    )
    .with_config(RoundtableConfig::default().without_pacing())
    .with_store(store.clone())
    .with_event_handler(bus.clone());
    let mut receiver = bus.subscribe();

    let handle = service.start_analysis("Acme Corp").unwrap();
    let session_id = handle.session_id().to_string();
    let err = handle.join().await.unwrap_err();

    let expected = "Discussion phase failed: Invalid request: disk full";
    assert_eq!(err.to_string(), expected);

    let session = store.get(&session_id).unwrap();
    assert_eq!(session.status, SessionStatus::Error);
    assert_eq!(session.error.as_deref(), Some(expected));

    let events = drain(&mut receiver);
    let tail: Vec<&str> = events.iter().rev().take(3).rev().map(|e| e.name()).collect();
    assert_eq!(tail, vec!["error", "status_update", "analysis_complete"]);
    match events.last() {
        Some(AnalysisEvent::AnalysisComplete {
            error,
            status,
            summary,
            ..
        }) => {
            assert_eq!(error.as_deref(), Some(expected));
            assert_eq!(status.as_deref(), Some("error"));
            assert!(summary.is_none());
        }
        other => panic!("unexpected final event {:?}", other),
    }
    assert_eq!(statuses(&events).last().map(String::as_str), Some("error"));
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let (service, _bus) = service(MockClient { fail_summary: false }, MockSearch { fail: false });

    assert_eq!(
        service.check_session("no-such-session").unwrap_err(),
        RoundtableError::SessionNotFound("no-such-session".to_string())
    );
    assert!(service.session_data("no-such-session").is_err());
}

#[tokio::test]
async fn test_blank_subject_is_rejected() {
    let (service, _bus) = service(MockClient { fail_summary: false }, MockSearch { fail: false });

    assert!(matches!(
        service.start_analysis("   "),
        Err(RoundtableError::InvalidRequest(_))
    ));
    assert!(service.list_sessions().is_empty());
}

#[tokio::test]
async fn test_list_sessions_reports_progress_flags() {
    let (service, _bus) = service(MockClient { fail_summary: false }, MockSearch { fail: false });

    let first = service.start_analysis("Acme Corp").unwrap();
    let first_id = first.session_id().to_string();
    first.join().await.unwrap();
    let second = service.start_analysis("Globex").unwrap();
    second.join().await.unwrap();

    let sessions = service.list_sessions();
    assert_eq!(sessions.len(), 2);
    let acme = sessions.iter().find(|s| s.session_id == first_id).unwrap();
    assert_eq!(acme.company_name, "Acme Corp");
    assert!(acme.has_research && acme.has_transcript && acme.has_summary);
}
