// OpenAI-compatible client implementation (OpenAI, DeepSeek, SiliconFlow, ...)

use crate::buffer_utils::parse_sse_stream;
use crate::config::HttpSettings;
use crate::error::{Result, TransportError};
use crate::openai::OpenAIChatParser;
use crate::streaming::TokenStream;
use crate::traits::{ChatOptions, ChatRequest, ChatTransport};
use crate::types::ChatMessage;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Map, Value};
use std::time::Duration;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Normalize a user-supplied endpoint into a full chat completions URL.
///
/// `api.deepseek.com` and `https://api.deepseek.com/` both become
/// `https://api.deepseek.com/v1/chat/completions`.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let mut url = endpoint.trim().to_string();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        url = format!("https://{}", url);
    }
    if !url.ends_with(CHAT_COMPLETIONS_PATH) {
        url = format!("{}{}", url.trim_end_matches('/'), CHAT_COMPLETIONS_PATH);
    }
    url
}

/// OpenAI-compatible client (HTTP direct, bearer token, SSE streaming)
#[derive(Debug)]
pub struct OpenAICompatibleClient {
    http_client: reqwest::Client,
    endpoint: String,
    read_timeout: Duration,
}

impl OpenAICompatibleClient {
    /// Create new client with builder pattern
    pub fn builder() -> OpenAICompatibleClientBuilder {
        OpenAICompatibleClientBuilder::default()
    }

    /// Normalized endpoint this client posts to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build chat completion request payload
    fn build_chat_request(&self, model: &str, messages: &[ChatMessage], options: &ChatOptions) -> Value {
        let openai_messages: Vec<Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.as_str(),
                    "content": msg.content,
                })
            })
            .collect();

        let mut obj = Map::new();
        obj.insert("model".to_string(), json!(model));
        obj.insert("messages".to_string(), Value::Array(openai_messages));
        obj.insert("stream".to_string(), json!(true));
        obj.insert("stream_options".to_string(), json!({ "include_usage": true }));

        if let Some(temp) = options.temperature {
            obj.insert("temperature".to_string(), json!(temp));
        }
        if let Some(top_p) = options.top_p {
            obj.insert("top_p".to_string(), json!(top_p));
        }
        if let Some(penalty) = options.presence_penalty {
            obj.insert("presence_penalty".to_string(), json!(penalty));
        }
        if let Some(penalty) = options.frequency_penalty {
            obj.insert("frequency_penalty".to_string(), json!(penalty));
        }
        if let Some(max_tokens) = options.max_tokens {
            obj.insert("max_tokens".to_string(), json!(max_tokens));
        }

        Value::Object(obj)
    }
}

/// Builder for OpenAICompatibleClient
#[derive(Default)]
pub struct OpenAICompatibleClientBuilder {
    api_key: Option<String>,
    endpoint: Option<String>,
    http: HttpSettings,
}

impl OpenAICompatibleClientBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the chat completions endpoint.
    /// Example: "https://api.deepseek.com/v1/chat/completions"
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn http(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }

    pub fn build(self) -> Result<OpenAICompatibleClient> {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| TransportError::Configuration("API key is required".to_string()))?;
        let endpoint = self
            .endpoint
            .filter(|endpoint| !endpoint.trim().is_empty())
            .ok_or_else(|| TransportError::Configuration("Endpoint is required".to_string()))?;
        let endpoint = normalize_endpoint(&endpoint);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
                .map_err(|_| TransportError::Configuration("Invalid API key format".to_string()))?,
        );

        let http_client = self.http.build_client(headers)?;
        tracing::info!(endpoint = %endpoint, "Initialized OpenAI-compatible client");

        Ok(OpenAICompatibleClient {
            http_client,
            endpoint,
            read_timeout: self.http.read_timeout,
        })
    }
}

// ============================================================================
// TRAIT IMPLEMENTATION
// ============================================================================

#[async_trait]
impl ChatTransport for OpenAICompatibleClient {
    fn provider(&self) -> &'static str {
        "openai-compatible"
    }

    async fn stream(&self, request: ChatRequest) -> Result<TokenStream> {
        request.validate()?;
        let payload = self.build_chat_request(&request.model, &request.messages, &request.options);

        tracing::debug!(model = %request.model, messages = request.messages.len(), "Opening chat stream");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransportError::Connection(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("OpenAI-compatible API returned {}: {}", status, error_text);
            return Err(TransportError::status("OpenAI-compatible", status, &error_text));
        }

        Ok(parse_sse_stream(
            response.bytes_stream(),
            OpenAIChatParser,
            Some(self.read_timeout),
        ))
    }
}
