//! The `OpenAIClient` struct implements `ClientWrapper` for OpenAI’s Chat API,
//! capturing both the assistant response and detailed token usage (input vs output)
//! for cost tracking.
//!
//! # Example
//!
//! ```rust,no_run
//! use roundtable::clients::openai::OpenAIClient;
//! use roundtable::client_wrapper::ClientWrapper;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let secret_key = std::env::var("OPEN_AI_SECRET")?;
//!     let client = OpenAIClient::new_with_model_string(&secret_key, "gpt-4o");
//!
//!     let reply = client
//!         .generate("You are a research assistant.", "Describe Acme Corp.", 0.7, None)
//!         .await?;
//!     println!("Assistant: {}", reply);
//!
//!     if let Some(usage) = client.get_last_usage().await {
//!         println!("Tokens in: {}, out: {}", usage.input_tokens, usage.output_tokens);
//!     }
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use async_trait::async_trait;
use openai_rust::chat;
use openai_rust2 as openai_rust;
use tokio::sync::Mutex;

use crate::client_wrapper::{
    ClientWrapper, GenerationParams, Message, Role, SendError, TokenUsage,
};
use crate::clients::common::{get_shared_http_client, send_and_track};

/// Client wrapper for OpenAI's Chat Completions API.
///
/// The wrapper keeps the selected model identifier plus an internal [`TokenUsage`] slot so
/// callers can inspect how many tokens each request consumed. It reuses the shared HTTP
/// client configured in [`crate::clients::common`].
pub struct OpenAIClient {
    /// Underlying SDK client pointing at the REST endpoint.
    client: openai_rust::Client,
    /// Model name that will be injected into each request.
    model: String,
    /// Storage for the token usage returned by the most recent request.
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIClient {
    /// Construct a client using the provided API key and explicit model name.
    pub fn new_with_model_string(secret_key: &str, model_name: &str) -> Self {
        OpenAIClient {
            client: openai_rust::Client::new_with_client(
                secret_key,
                get_shared_http_client().clone(),
            ),
            model: model_name.to_string(),
            token_usage: Mutex::new(None),
        }
    }

    /// Construct a client targeting a custom OpenAI compatible base URL.
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        OpenAIClient {
            client: openai_rust::Client::new_with_client_and_base_url(
                secret_key,
                get_shared_http_client().clone(),
                base_url,
            ),
            model: model_name.to_string(),
            token_usage: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ClientWrapper for OpenAIClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &self,
        messages: &[Message],
        params: GenerationParams,
    ) -> Result<Message, SendError> {
        let formatted_messages = messages
            .iter()
            .map(|msg| chat::Message {
                role: match msg.role {
                    Role::System => "system".to_owned(),
                    Role::User => "user".to_owned(),
                    Role::Assistant => "assistant".to_owned(),
                },
                content: msg.content.to_string(),
            })
            .collect();

        let content = send_and_track(
            &self.client,
            &self.model,
            formatted_messages,
            Some("/v1/chat/completions".to_string()),
            &self.token_usage,
            params,
        )
        .await?;

        Ok(Message {
            role: Role::Assistant,
            content: Arc::from(content.as_str()),
        })
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
