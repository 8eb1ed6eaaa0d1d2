use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::CompositeError;
use crate::types::CompositeResult;

/// Which stage produced a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Reasoning,
    Answer,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Reasoning => "reasoning",
            Phase::Answer => "answer",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One increment of streamed text, tagged with the stage it came from.
///
/// Every stage closes with exactly one terminal chunk: empty text and
/// `is_final` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub phase: Phase,
    pub delta_text: String,
    pub is_final: bool,
}

impl StreamChunk {
    pub fn delta(phase: Phase, text: impl Into<String>) -> Self {
        Self {
            phase,
            delta_text: text.into(),
            is_final: false,
        }
    }

    pub fn terminal(phase: Phase) -> Self {
        Self {
            phase,
            delta_text: String::new(),
            is_final: true,
        }
    }
}

/// Events emitted by a composite run, in order:
/// `Started`, reasoning chunks, answer chunks, then `Completed` or `Failed`.
#[derive(Debug)]
pub enum CompositeEvent {
    /// Run accepted
    Started {
        run_id: String,
        timestamp: i64,
    },

    /// Text from either stage
    Chunk(StreamChunk),

    /// Both stages finished
    Completed(CompositeResult),

    /// A stage failed; nothing further follows
    Failed {
        error: CompositeError,
        elapsed: Duration,
    },
}

impl CompositeEvent {
    pub fn chunk(&self) -> Option<&StreamChunk> {
        match self {
            Self::Chunk(chunk) => Some(chunk),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed { .. })
    }
}
