use duet_llm::{ChatMessage, ChatOptions, ChatRequest, ChatTransport, TransportError};
use std::sync::Arc;
use std::time::Duration;

use crate::error::CompositeError;
use crate::prompts::DEFAULT_REASONING_INSTRUCTION;
use crate::stage::{drive_stage, ping, EventSender};
use crate::types::{Phase, StageResult};

/// Stage A: asks a reasoning model to think about the question and streams
/// its trace as reasoning chunks.
///
/// Reasoning models emit the trace either as ordinary content or in a
/// dedicated reasoning field; both count as trace text here.
pub struct ReasoningStage {
    transport: Arc<dyn ChatTransport>,
    model: String,
    options: ChatOptions,
    instruction: String,
}

impl ReasoningStage {
    pub fn new(transport: Arc<dyn ChatTransport>, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
            options: ChatOptions::default(),
            instruction: DEFAULT_REASONING_INSTRUCTION.to_string(),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// System instruction; empty sends the question alone
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check that the configured endpoint answers for this model
    pub async fn check_connection(&self) -> Result<Duration, TransportError> {
        ping(self.transport.as_ref(), &self.model).await
    }

    pub fn build_messages(&self, question: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if !self.instruction.is_empty() {
            messages.push(ChatMessage::system(self.instruction.clone()));
        }
        messages.push(ChatMessage::user(question));
        messages
    }

    pub async fn produce(&self, question: &str, event_tx: &EventSender) -> Result<StageResult, CompositeError> {
        if question.trim().is_empty() {
            return Err(CompositeError::EmptyQuestion);
        }

        let request = ChatRequest::new(self.model.clone(), self.build_messages(question))
            .with_options(self.options.clone());

        drive_stage(Phase::Reasoning, self.transport.as_ref(), request, event_tx).await
    }
}
