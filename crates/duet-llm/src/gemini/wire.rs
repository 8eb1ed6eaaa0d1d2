// Gemini wire vocabulary: role translation and streamGenerateContent frames

use serde::{Deserialize, Serialize};

use crate::buffer_utils::SseLineParser;
use crate::error::{Result, TransportError};
use crate::streaming::StreamEvent;
use crate::types::{ChatMessage, Role, UsageStats};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

/// Conversation in Gemini shape: instructions live outside the turn list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiContents {
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
}

/// Translate the provider-agnostic conversation into Gemini's vocabulary.
///
/// A single leading system message becomes `systemInstruction`. Gemini has
/// no system role inside `contents`, so any later system message is sent as a
/// user turn carrying a `System instruction:` prefix.
pub fn convert_messages(messages: &[ChatMessage]) -> GeminiContents {
    let (system_instruction, turns) = match messages.split_first() {
        Some((first, rest)) if first.role == Role::System => {
            (Some(Content::text(None, first.content.clone())), rest)
        }
        _ => (None, messages),
    };

    let contents = turns
        .iter()
        .map(|msg| match msg.role {
            Role::User => Content::text(Some("user"), msg.content.clone()),
            Role::Assistant => Content::text(Some("model"), msg.content.clone()),
            Role::System => Content::text(
                Some("user"),
                format!("System instruction: {}", msg.content),
            ),
        })
        .collect();

    GeminiContents {
        system_instruction,
        contents,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

impl From<UsageMetadata> for UsageStats {
    fn from(meta: UsageMetadata) -> Self {
        UsageStats::new(
            meta.prompt_token_count,
            meta.candidates_token_count,
            meta.total_token_count,
        )
    }
}

/// One `GenerateContentResponse` frame of a streamed call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiStreamChunk {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl GeminiStreamChunk {
    /// Concatenated text of the first candidate's parts
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        Some(text)
    }

    fn into_stream_events(self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(text) = self.text() {
            if !text.is_empty() {
                events.push(StreamEvent::Delta { content: text });
            }
        }

        let finish_reason = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.finish_reason);

        if let Some(meta) = self.usage_metadata {
            events.push(StreamEvent::Usage { usage: meta.into() });
        }

        if let Some(reason) = finish_reason {
            events.push(StreamEvent::Done {
                finish_reason: Some(reason),
            });
        }

        events
    }
}

/// Parser for Gemini `streamGenerateContent?alt=sse` frames.
///
/// Gemini repeats a cumulative `usageMetadata` on every frame; each one is
/// forwarded and the consumer keeps the latest.
#[derive(Debug, Default)]
pub struct GeminiParser;

impl SseLineParser for GeminiParser {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    fn parse_data_line(&mut self, data: &str) -> Result<Vec<StreamEvent>> {
        let chunk: GeminiStreamChunk = serde_json::from_str(data).map_err(|e| {
            TransportError::Protocol(format!("Failed to parse Gemini chunk: {}", e))
        })?;

        if let Some(error) = &chunk.error {
            return Err(TransportError::Protocol(format!(
                "Gemini reported error mid-stream: {}",
                error
            )));
        }

        Ok(chunk.into_stream_events())
    }

    fn is_done_marker(&self, _data: &str) -> bool {
        false
    }
}
