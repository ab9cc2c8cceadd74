use async_trait::async_trait;
use roundtable::client_wrapper::{ClientWrapper, GenerationParams, Message, Role, SendError};
use roundtable::research::{ResearchRetriever, SEARCH_ERROR_MARKER};
use roundtable::search::{SearchProvider, SearchResult};
use roundtable::summarizer::Summarizer;
use std::sync::{Arc, Mutex};

/// Echoes the user prompt back so tests can see what the retriever fed the model.
struct EchoClient {
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl EchoClient {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ClientWrapper for EchoClient {
    async fn send_message(
        &self,
        messages: &[Message],
        _params: GenerationParams,
    ) -> Result<Message, SendError> {
        let prompt = messages[1].content.to_string();
        self.prompts.lock().unwrap().push(prompt.clone());
        if self.fail {
            return Err("rate limited".into());
        }
        Ok(Message::new(Role::Assistant, format!("  {}  ", prompt)))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

enum Search {
    Results(Vec<SearchResult>),
    Fail,
}

struct MockSearch {
    behaviour: Search,
    requested: Mutex<Vec<(String, usize)>>,
}

impl MockSearch {
    fn new(behaviour: Search) -> Self {
        Self {
            behaviour,
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SendError> {
        self.requested
            .lock()
            .unwrap()
            .push((query.to_string(), max_results));
        match &self.behaviour {
            Search::Results(results) => Ok(results.clone()),
            Search::Fail => Err("connection reset".into()),
        }
    }
}

#[tokio::test]
async fn test_search_results_are_formatted_into_the_prompt() {
    let search = Arc::new(MockSearch::new(Search::Results(vec![
        SearchResult::new("Acme", "Makes anvils."),
        SearchResult {
            title: None,
            snippet: Some("Rocket skates.".to_string()),
        },
    ])));
    let client = Arc::new(EchoClient::new(false));
    let retriever = ResearchRetriever::new(search.clone(), client.clone());

    let research = retriever.retrieve("Acme Corp").await;

    assert!(research.contains("Acme: Makes anvils.\n\nNo Title: Rocket skates."));
    assert!(research.starts_with("Using the following web search results"));
    assert_eq!(
        search.requested.lock().unwrap().as_slice(),
        &[("Acme Corp".to_string(), 5)]
    );
}

#[tokio::test]
async fn test_empty_results_use_synthetic_sources() {
    let client = Arc::new(EchoClient::new(false));
    let retriever = ResearchRetriever::new(
        Arc::new(MockSearch::new(Search::Results(Vec::new()))),
        client.clone(),
    );

    let research = retriever.retrieve("Globex").await;

    assert!(!research.is_empty());
    assert!(client
        .last_prompt()
        .contains("Globex Official Website: Globex is a leading technology company"));
}

#[tokio::test]
async fn test_failing_search_uses_synthetic_sources() {
    let client = Arc::new(EchoClient::new(false));
    let retriever = ResearchRetriever::new(Arc::new(MockSearch::new(Search::Fail)), client.clone())
        .with_max_results(3);

    let sources = retriever.gather_sources("Initech").await;

    assert_eq!(sources.split("\n\n").count(), 5);
    assert!(sources.contains("LinkedIn - Initech Company Profile"));
}

#[tokio::test]
async fn test_error_marker_results_use_synthetic_sources() {
    let search = MockSearch::new(Search::Results(vec![SearchResult {
        title: Some(format!("{}: 503", SEARCH_ERROR_MARKER)),
        snippet: None,
    }]));
    let retriever = ResearchRetriever::new(Arc::new(search), Arc::new(EchoClient::new(false)));

    let sources = retriever.gather_sources("Umbrella").await;

    assert!(sources.starts_with("Umbrella Official Website"));
    assert!(!sources.contains(SEARCH_ERROR_MARKER));
}

#[tokio::test]
async fn test_generation_failure_returns_fallback_naming_subject() {
    let retriever = ResearchRetriever::new(
        Arc::new(MockSearch::new(Search::Fail)),
        Arc::new(EchoClient::new(true)),
    );

    let research = retriever.retrieve("Acme Corp").await;

    assert_eq!(
        research,
        "Research data for Acme Corp could not be retrieved due to an error: rate limited. Please try again later."
    );
}

#[tokio::test]
async fn test_summarizer_asks_for_five_sections_and_degrades_on_failure() {
    let client = Arc::new(EchoClient::new(false));
    let summary = Summarizer::new(client.clone())
        .summarize("research text", "transcript text")
        .await;
    assert!(summary.contains("Research Data:\nresearch text"));
    assert!(summary.contains("5. Conclusion"));
    assert!(!summary.starts_with(' '));

    let failed = Summarizer::new(Arc::new(EchoClient::new(true)))
        .summarize("research text", "transcript text")
        .await;
    assert_eq!(
        failed,
        "Summary generation failed: rate limited. Please review the research data and expert discussion directly."
    );
}
