use crate::client_wrapper::{GenerationParams, SendError, TokenUsage};
use lazy_static::lazy_static;
use openai_rust::chat;
use openai_rust2 as openai_rust;
use std::time::Duration;
use tokio::sync::Mutex;

lazy_static! {
    /// Process-wide HTTP client so every provider wrapper reuses the same connection pool.
    static ref SHARED_HTTP_CLIENT: reqwest::Client = build_pooled_client();
}

/// Configuration details:
/// - `pool_max_idle_per_host(10)`: idle connections kept per host
/// - `pool_idle_timeout(90s)`: how long an idle connection survives
/// - `tcp_keepalive(60s)`: keepalive probe interval
/// - `timeout(300s)`: provider-side timeout surfaced as a generic failure
fn build_pooled_client() -> reqwest::Client {
    reqwest::ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .timeout(Duration::from_secs(300))
        .build()
        .unwrap_or_else(|err| {
            log::warn!(
                "roundtable::clients::common: pooled client build failed ({}), using defaults",
                err
            );
            reqwest::Client::new()
        })
}

/// Shared, lazily-built HTTP client used by the generation and retrieval adapters.
pub fn get_shared_http_client() -> &'static reqwest::Client {
    &SHARED_HTTP_CLIENT
}

/// Send a chat request, record its usage, and return the assistant’s content.
pub async fn send_and_track(
    api: &openai_rust::Client,
    model: &str,
    formatted_msgs: Vec<chat::Message>,
    url_path: Option<String>,
    usage_slot: &Mutex<Option<TokenUsage>>,
    params: GenerationParams,
) -> Result<String, SendError> {
    let mut chat_arguments = chat::ChatArguments::new(model, formatted_msgs);
    chat_arguments.temperature = Some(params.temperature);
    chat_arguments.max_tokens = params.max_tokens;

    let response = api.create_chat(chat_arguments, url_path).await;

    match response {
        Ok(response) => {
            let usage = TokenUsage {
                input_tokens: response.usage.prompt_tokens as usize,
                output_tokens: response.usage.completion_tokens as usize,
                total_tokens: response.usage.total_tokens as usize,
            };

            // Store it for get_last_usage()
            *usage_slot.lock().await = Some(usage);

            match response.choices.first() {
                Some(choice) => Ok(choice.message.content.clone()),
                None => Err("provider returned no choices".into()),
            }
        }
        Err(err) => {
            log::error!(
                "roundtable::clients::common::send_and_track(...): OpenAI API Error: {}",
                err
            );
            Err(err.to_string().into())
        }
    }
}
