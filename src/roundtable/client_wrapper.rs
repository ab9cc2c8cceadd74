//! A ClientWrapper is a wrapper around a specific language-generation service.
//! It provides a common interface to interact with the LLMs.
//! It does not keep any conversation state: every persona, facilitator and summarizer
//! call assembles its full context and hands it over in a single request.

use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Represents the possible roles for a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    // set by the developer to steer the model's responses
    User,
    // a message sent by the application on behalf of the facilitator
    Assistant, // lets the model know the content was generated as a response to a user message
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// Represents a generic message to be sent to an LLM.
#[derive(Clone, Debug)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The actual content of the message.
    pub content: Arc<str>,
}

impl Message {
    pub fn new(role: Role, content: impl AsRef<str>) -> Self {
        Self {
            role,
            content: Arc::from(content.as_ref()),
        }
    }
}

/// Sampling knobs forwarded with every request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

/// Type alias for the boxed error every collaborator returns.
pub type SendError = Box<dyn Error + Send + Sync>;

/// Trait defining the interface to interact with various LLM services.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send a message list to the LLM and get the assistant reply.
    async fn send_message(
        &self,
        messages: &[Message],
        params: GenerationParams,
    ) -> Result<Message, SendError>;

    /// Identifier of the model requests are routed to.
    fn model_name(&self) -> &str;

    /// One generation call: a system role description plus a user prompt in, trimmed text out.
    async fn generate(
        &self,
        system_role: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String, SendError> {
        let messages = [
            Message::new(Role::System, system_role),
            Message::new(Role::User, user_prompt),
        ];
        let reply = self
            .send_message(
                &messages,
                GenerationParams {
                    temperature,
                    max_tokens,
                },
            )
            .await?;
        Ok(reply.content.trim().to_string())
    }

    /// Hook to retrieve usage from the *last* send_message() call.
    /// Default impl returns None so wrappers without accounting don't break.
    async fn get_last_usage(&self) -> Option<TokenUsage> {
        match self.usage_slot() {
            Some(slot) => slot.lock().await.clone(),
            None => None,
        }
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        // Implementations supporting TokenUsage tracking should return their slot by overriding this method.
        None
    }
}
