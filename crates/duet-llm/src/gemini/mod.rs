mod client;
mod wire;

pub use client::{GeminiClient, GeminiClientBuilder};
pub use wire::{convert_messages, GeminiContents, GeminiParser, GeminiStreamChunk};
