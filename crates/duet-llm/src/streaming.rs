use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::TransportError;
use crate::types::UsageStats;

/// Normalized incremental event produced by every transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Visible content delta
    Delta {
        content: String,
    },

    /// Provider-side reasoning delta (e.g. `reasoning_content` on reasoner models)
    Reasoning {
        content: String,
    },

    /// Usage summary, usually on the last frame
    Usage {
        usage: UsageStats,
    },

    /// Stream completed cleanly; always the last item of a successful stream
    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

/// Lazy, forward-only sequence of events for one request.
///
/// Dropping it drops the underlying HTTP response.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, TransportError>> + Send>>;
