use crate::error::{Result, TransportError};
use crate::streaming::TokenStream;
use crate::types::{ChatMessage, Role};
use async_trait::async_trait;

/// One chat-style streaming call against a configured endpoint.
///
/// Implementations are the only place that knows a provider's wire format;
/// everything above this trait works with [`crate::StreamEvent`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Short provider name used in logs and errors
    fn provider(&self) -> &'static str;

    /// Open a streamed request. Status errors surface here, frame errors
    /// surface as items of the returned stream.
    async fn stream(&self, request: ChatRequest) -> Result<TokenStream>;
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: ChatOptions,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: ChatOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Check the shape every provider expects: a model, at least one
    /// message, and a user turn last.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(TransportError::InvalidRequest("model is empty".to_string()));
        }
        match self.messages.last() {
            None => Err(TransportError::InvalidRequest(
                "message list is empty".to_string(),
            )),
            Some(last) if last.role != Role::User => Err(TransportError::InvalidRequest(
                format!("last message must have role user, got {}", last.role),
            )),
            Some(_) => Ok(()),
        }
    }
}

/// Sampling parameters shared by all providers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn presence_penalty(mut self, penalty: f32) -> Self {
        self.presence_penalty = Some(penalty);
        self
    }

    pub fn frequency_penalty(mut self, penalty: f32) -> Self {
        self.frequency_penalty = Some(penalty);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}
