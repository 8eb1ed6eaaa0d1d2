mod client;
mod frames;

pub use client::{normalize_endpoint, OpenAICompatibleClient, OpenAICompatibleClientBuilder};
pub use frames::{ChatStreamChunk, OpenAIChatParser};
