// Re-encode a composite run as OpenAI `chat.completion.chunk` SSE frames

use serde::Serialize;

use crate::types::{CompositeEvent, Phase, StreamChunk};

pub const DONE_FRAME: &str = "data: [DONE]\n\n";

#[derive(Debug, Serialize)]
struct ChunkFrame<'a> {
    id: &'a str,
    object: &'static str,
    created: i64,
    model: &'a str,
    choices: [FrameChoice<'a>; 1],
}

#[derive(Debug, Serialize)]
struct FrameChoice<'a> {
    index: u32,
    delta: FrameDelta<'a>,
}

#[derive(Debug, Serialize)]
struct FrameDelta<'a> {
    role: &'static str,
    reasoning_content: Option<&'a str>,
    content: Option<&'a str>,
}

/// Encodes the events of one run; reasoning fills `reasoning_content`,
/// the answer fills `content`.
#[derive(Debug, Clone)]
pub struct ChunkEncoder {
    id: String,
    created: i64,
    reasoning_model: String,
    answer_model: String,
}

impl ChunkEncoder {
    pub fn new(reasoning_model: impl Into<String>, answer_model: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: format!("chatcmpl-{:x}", now.timestamp_millis()),
            created: now.timestamp(),
            reasoning_model: reasoning_model.into(),
            answer_model: answer_model.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Frame for one event, if it produces any
    pub fn encode(&self, event: &CompositeEvent) -> Option<String> {
        match event {
            CompositeEvent::Chunk(chunk) => self.encode_chunk(chunk),
            CompositeEvent::Completed(_) | CompositeEvent::Failed { .. } => Some(DONE_FRAME.to_string()),
            CompositeEvent::Started { .. } => None,
        }
    }

    pub fn encode_chunk(&self, chunk: &StreamChunk) -> Option<String> {
        if chunk.is_final {
            return None;
        }

        let (model, delta) = match chunk.phase {
            Phase::Reasoning => (
                self.reasoning_model.as_str(),
                FrameDelta {
                    role: "assistant",
                    reasoning_content: Some(chunk.delta_text.as_str()),
                    content: None,
                },
            ),
            Phase::Answer => (
                self.answer_model.as_str(),
                FrameDelta {
                    role: "assistant",
                    reasoning_content: None,
                    content: Some(chunk.delta_text.as_str()),
                },
            ),
        };

        let frame = ChunkFrame {
            id: &self.id,
            object: "chat.completion.chunk",
            created: self.created,
            model,
            choices: [FrameChoice { index: 0, delta }],
        };

        match serde_json::to_string(&frame) {
            Ok(json) => Some(format!("data: {}\n\n", json)),
            Err(e) => {
                tracing::error!("Failed to encode chunk frame: {}", e);
                None
            }
        }
    }
}
