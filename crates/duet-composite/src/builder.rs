use duet_llm::{ChatOptions, ChatTransport};
use std::sync::Arc;

use crate::composite::{Composite, DEFAULT_CHANNEL_CAPACITY};
use crate::error::ConfigurationError;
use crate::prompts::PromptConfig;
use crate::stages::{AnswerStage, ReasoningStage};

/// Builder for constructing a Composite from two transports
pub struct CompositeBuilder {
    reasoning_transport: Option<Arc<dyn ChatTransport>>,
    reasoning_model: Option<String>,
    reasoning_options: ChatOptions,
    answer_transport: Option<Arc<dyn ChatTransport>>,
    answer_model: Option<String>,
    answer_options: ChatOptions,
    prompts: PromptConfig,
    channel_capacity: usize,
}

impl CompositeBuilder {
    pub fn new() -> Self {
        Self {
            reasoning_transport: None,
            reasoning_model: None,
            reasoning_options: ChatOptions::default(),
            answer_transport: None,
            answer_model: None,
            answer_options: ChatOptions::default(),
            prompts: PromptConfig::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Set the reasoning model and the transport that reaches it
    pub fn reasoning(mut self, transport: Arc<dyn ChatTransport>, model: impl Into<String>) -> Self {
        self.reasoning_transport = Some(transport);
        self.reasoning_model = Some(model.into());
        self
    }

    /// Set the answer model and the transport that reaches it
    pub fn answer(mut self, transport: Arc<dyn ChatTransport>, model: impl Into<String>) -> Self {
        self.answer_transport = Some(transport);
        self.answer_model = Some(model.into());
        self
    }

    pub fn reasoning_options(mut self, options: ChatOptions) -> Self {
        self.reasoning_options = options;
        self
    }

    pub fn answer_options(mut self, options: ChatOptions) -> Self {
        self.answer_options = options;
        self
    }

    pub fn prompts(mut self, prompts: PromptConfig) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Build the Composite
    pub fn build(self) -> Result<Composite, ConfigurationError> {
        let reasoning_transport = self
            .reasoning_transport
            .ok_or(ConfigurationError::Missing("reasoning transport"))?;
        let reasoning_model = non_empty(self.reasoning_model, "reasoning_model")?;
        let answer_transport = self
            .answer_transport
            .ok_or(ConfigurationError::Missing("answer transport"))?;
        let answer_model = non_empty(self.answer_model, "answer_model")?;

        if self.channel_capacity == 0 {
            return Err(ConfigurationError::invalid(
                "channel_capacity",
                "must be at least 1",
            ));
        }
        if let Some(placeholder) = self.prompts.missing_placeholder() {
            return Err(ConfigurationError::invalid(
                "answer_template",
                format!("must contain {}", placeholder),
            ));
        }

        let reasoning = ReasoningStage::new(reasoning_transport, reasoning_model)
            .with_options(self.reasoning_options)
            .with_instruction(self.prompts.reasoning_instruction.clone());
        let answer = AnswerStage::new(answer_transport, answer_model)
            .with_options(self.answer_options)
            .with_prompts(self.prompts);

        Ok(Composite::new(reasoning, answer).with_channel_capacity(self.channel_capacity))
    }
}

impl Default for CompositeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, ConfigurationError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigurationError::Missing(field))
}
