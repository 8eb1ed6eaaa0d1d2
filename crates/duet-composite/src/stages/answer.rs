use duet_llm::{ChatMessage, ChatOptions, ChatRequest, ChatTransport, TransportError};
use std::sync::Arc;
use std::time::Duration;

use crate::error::CompositeError;
use crate::prompts::PromptConfig;
use crate::stage::{drive_stage, ping, EventSender};
use crate::types::{Phase, StageResult};

/// Stage B: hands the question and the reasoning trace to the answer model
pub struct AnswerStage {
    transport: Arc<dyn ChatTransport>,
    model: String,
    options: ChatOptions,
    prompts: PromptConfig,
}

impl AnswerStage {
    pub fn new(transport: Arc<dyn ChatTransport>, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
            options: ChatOptions::default(),
            prompts: PromptConfig::default(),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Only the answer instruction and template are read
    pub fn with_prompts(mut self, prompts: PromptConfig) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check that the configured endpoint answers for this model
    pub async fn check_connection(&self) -> Result<Duration, TransportError> {
        ping(self.transport.as_ref(), &self.model).await
    }

    pub fn build_messages(&self, question: &str, reasoning_text: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if !self.prompts.answer_instruction.is_empty() {
            messages.push(ChatMessage::system(self.prompts.answer_instruction.clone()));
        }
        messages.push(ChatMessage::user(
            self.prompts.render_answer_prompt(question, reasoning_text),
        ));
        messages
    }

    /// Empty `reasoning_text` is valid and rendered as an empty analysis
    pub async fn produce(
        &self,
        question: &str,
        reasoning_text: &str,
        event_tx: &EventSender,
    ) -> Result<StageResult, CompositeError> {
        if question.trim().is_empty() {
            return Err(CompositeError::EmptyQuestion);
        }
        if reasoning_text.is_empty() {
            tracing::warn!("Reasoning stage produced no text; answering without analysis");
        }

        let request = ChatRequest::new(self.model.clone(), self.build_messages(question, reasoning_text))
            .with_options(self.options.clone());

        drive_stage(Phase::Answer, self.transport.as_ref(), request, event_tx).await
    }
}
