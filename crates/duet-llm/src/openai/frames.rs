use serde::{Deserialize, Serialize};

use crate::buffer_utils::SseLineParser;
use crate::error::{Result, TransportError};
use crate::streaming::StreamEvent;
use crate::types::UsageStats;

/// One `chat.completion.chunk` frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Empty on the trailing usage-only frame
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// DeepSeek reasoner models stream their chain of thought here
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<Usage> for UsageStats {
    fn from(usage: Usage) -> Self {
        UsageStats::new(usage.prompt_tokens, usage.completion_tokens, usage.total_tokens)
    }
}

impl ChatStreamChunk {
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
    }

    pub fn is_done(&self) -> bool {
        self.choices
            .first()
            .and_then(|c| c.finish_reason.as_ref())
            .is_some()
    }

    fn into_stream_events(self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(choice) = self.choices.into_iter().next() {
            if let Some(reasoning) = choice.delta.reasoning_content {
                if !reasoning.is_empty() {
                    events.push(StreamEvent::Reasoning { content: reasoning });
                }
            }

            if let Some(content) = choice.delta.content {
                if !content.is_empty() {
                    events.push(StreamEvent::Delta { content });
                }
            }

            if let Some(usage) = self.usage {
                events.push(StreamEvent::Usage { usage: usage.into() });
            }

            if let Some(finish_reason) = choice.finish_reason {
                events.push(StreamEvent::Done {
                    finish_reason: Some(finish_reason),
                });
            }
        } else if let Some(usage) = self.usage {
            events.push(StreamEvent::Usage { usage: usage.into() });
        }

        events
    }
}

/// Provider error body sometimes sent inside an otherwise 200 stream
#[derive(Debug, Deserialize)]
struct ErrorFrame {
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Parser for OpenAI-compatible `chat/completions` frames
#[derive(Debug, Default)]
pub struct OpenAIChatParser;

impl SseLineParser for OpenAIChatParser {
    fn provider(&self) -> &'static str {
        "openai-compatible"
    }

    fn parse_data_line(&mut self, data: &str) -> Result<Vec<StreamEvent>> {
        if let Ok(ErrorFrame { error: Some(error) }) = serde_json::from_str::<ErrorFrame>(data) {
            if !error.is_null() {
                return Err(TransportError::Protocol(format!(
                    "Provider reported error mid-stream: {}",
                    error
                )));
            }
        }

        let chunk: ChatStreamChunk = serde_json::from_str(data).map_err(|e| {
            TransportError::Protocol(format!("Failed to parse chat chunk: {}", e))
        })?;
        Ok(chunk.into_stream_events())
    }
}
