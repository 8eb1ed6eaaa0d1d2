// Gemini client implementation (alternate wire protocol)

use crate::buffer_utils::parse_sse_stream;
use crate::config::HttpSettings;
use crate::error::{Result, TransportError};
use crate::gemini::wire::convert_messages;
use crate::gemini::GeminiParser;
use crate::streaming::TokenStream;
use crate::traits::{ChatOptions, ChatRequest, ChatTransport};
use crate::types::ChatMessage;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Map, Value};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini client (HTTP direct, no SDK)
///
/// Gemini differs from OpenAI-compatible providers in every layer:
/// - URL: {base}/models/{model}:streamGenerateContent?alt=sse
/// - Auth header: x-goog-api-key instead of Authorization: Bearer
/// - Body: `contents` with user/model roles, instructions in `systemInstruction`
/// - Frames: `candidates[].content.parts[].text`, usage in `usageMetadata`
#[derive(Debug)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
    read_timeout: Duration,
}

impl GeminiClient {
    /// Create new Gemini client with builder pattern
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::default()
    }

    /// Build the streaming URL for a model
    fn build_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        )
    }

    /// Build generateContent request payload
    fn build_request(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<Value> {
        let converted = convert_messages(messages);

        let mut obj = Map::new();
        obj.insert(
            "contents".to_string(),
            serde_json::to_value(&converted.contents)
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?,
        );
        if let Some(instruction) = converted.system_instruction {
            obj.insert(
                "systemInstruction".to_string(),
                serde_json::to_value(instruction)
                    .map_err(|e| TransportError::InvalidRequest(e.to_string()))?,
            );
        }

        let mut generation = Map::new();
        if let Some(temp) = options.temperature {
            generation.insert("temperature".to_string(), json!(temp));
        }
        if let Some(top_p) = options.top_p {
            generation.insert("topP".to_string(), json!(top_p));
        }
        if let Some(max_tokens) = options.max_tokens {
            generation.insert("maxOutputTokens".to_string(), json!(max_tokens));
        }
        if let Some(penalty) = options.presence_penalty {
            generation.insert("presencePenalty".to_string(), json!(penalty));
        }
        if let Some(penalty) = options.frequency_penalty {
            generation.insert("frequencyPenalty".to_string(), json!(penalty));
        }
        if !generation.is_empty() {
            obj.insert("generationConfig".to_string(), Value::Object(generation));
        }

        Ok(Value::Object(obj))
    }
}

/// Builder for GeminiClient
#[derive(Default)]
pub struct GeminiClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    http: HttpSettings,
}

impl GeminiClientBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the API base URL (tests, regional endpoints)
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn http(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }

    pub fn build(self) -> Result<GeminiClient> {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| TransportError::Configuration("API key is required".to_string()))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| GEMINI_API_BASE.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-goog-api-key"),
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| TransportError::Configuration("Invalid API key format".to_string()))?,
        );

        let http_client = self.http.build_client(headers)?;
        tracing::info!(base_url = %base_url, "Initialized Gemini client");

        Ok(GeminiClient {
            http_client,
            base_url,
            read_timeout: self.http.read_timeout,
        })
    }
}

// ============================================================================
// TRAIT IMPLEMENTATION
// ============================================================================

#[async_trait]
impl ChatTransport for GeminiClient {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    async fn stream(&self, request: ChatRequest) -> Result<TokenStream> {
        request.validate()?;
        let payload = self.build_request(&request.messages, &request.options)?;
        let url = self.build_url(&request.model);

        tracing::debug!(model = %request.model, messages = request.messages.len(), "Opening Gemini stream");

        let response = self
            .http_client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransportError::Connection(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini API returned {}: {}", status, error_text);
            return Err(TransportError::status("Gemini", status, &error_text));
        }

        Ok(parse_sse_stream(
            response.bytes_stream(),
            GeminiParser,
            Some(self.read_timeout),
        ))
    }
}
