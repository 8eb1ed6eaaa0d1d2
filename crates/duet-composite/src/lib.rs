//! Two-stage reasoning/answer composite.
//!
//! A reasoning model streams its trace for a question; an answer model then
//! streams the final answer from the question plus that trace. Both streams
//! reach the caller as phase-tagged chunks over one channel.

pub mod builder;
pub mod composite;
pub mod error;
pub mod prompts;
pub mod settings;
pub mod sse;
pub mod stage;
pub mod stages;
pub mod types;

pub use builder::CompositeBuilder;
pub use composite::{Composite, ConnectionReport, RunState};
pub use error::{CompositeError, ConfigurationError, StageFailure};
pub use prompts::{render_template, PromptConfig};
pub use settings::Settings;
pub use sse::ChunkEncoder;
pub use stage::EventSender;
pub use stages::{AnswerStage, ReasoningStage};
pub use types::{AggregateUsage, CompositeEvent, CompositeResult, Phase, StageResult, StreamChunk};

// Re-export key types from duet-llm
pub use duet_llm::{ChatOptions, ChatTransport, UsageStats};
