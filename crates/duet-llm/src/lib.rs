pub mod types;
pub mod error;
pub mod traits;
pub mod streaming;
pub mod buffer_utils;
pub mod config;
pub mod openai;
pub mod gemini;

pub use traits::{ChatTransport, ChatRequest, ChatOptions};
pub use error::{TransportError, TransportErrorKind};
pub use streaming::{StreamEvent, TokenStream};
pub use buffer_utils::{CircularLineBuffer, SseLineParser, parse_sse_stream};
pub use config::{
    ClientFactory, GeminiConfig, HttpSettings, OpenAICompatibleConfig, ProviderConfig, ProviderDetails,
    ProviderType,
};
pub use openai::{normalize_endpoint, OpenAICompatibleClient};
pub use gemini::GeminiClient;
pub use types::{ChatMessage, Role, UsageStats};
