// Configuration layer for provider-agnostic transport creation
// This module provides a factory pattern for creating transports from configuration

use crate::error::{Result, TransportError};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Type of wire protocol spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Bearer-token `chat/completions` SSE (OpenAI, DeepSeek, SiliconFlow, ...)
    #[serde(rename = "openai_compatible")]
    OpenAICompatible,
    /// Google Gemini `streamGenerateContent` SSE
    Gemini,
}

impl Default for ProviderType {
    fn default() -> Self {
        ProviderType::OpenAICompatible
    }
}

/// HTTP settings shared by every transport, read once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Forward proxy URL (`http://`, `https://`, `socks5://`, `socks5h://`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    /// Longest silence tolerated between two reads of a streamed body
    pub read_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            proxy: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(120),
        }
    }
}

impl HttpSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Build a reqwest client carrying the provider's default headers
    pub(crate) fn build_client(&self, headers: HeaderMap) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(self.connect_timeout);

        if let Some(proxy_url) = &self.proxy {
            tracing::info!(proxy = %proxy_url, "Routing provider traffic through proxy");
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                TransportError::Configuration(format!("Invalid proxy '{}': {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| TransportError::Configuration(format!("Failed to create HTTP client: {}", e)))
    }
}

/// Configuration for an OpenAI-compatible provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAICompatibleConfig {
    pub api_key: String,
    /// Chat completions URL; normalized by the client
    pub endpoint: String,
}

impl OpenAICompatibleConfig {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Configuration for the Gemini provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Base URL (optional, defaults to https://generativelanguage.googleapis.com/v1beta)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Provider-specific configuration details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderDetails {
    #[serde(rename = "openai_compatible")]
    OpenAICompatible(OpenAICompatibleConfig),
    Gemini(GeminiConfig),
}

/// Complete provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(flatten)]
    pub details: ProviderDetails,
    #[serde(default)]
    pub http: HttpSettings,
}

impl ProviderConfig {
    /// Create OpenAI-compatible provider config
    pub fn openai_compatible(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            details: ProviderDetails::OpenAICompatible(OpenAICompatibleConfig::new(
                api_key, endpoint,
            )),
            http: HttpSettings::default(),
        }
    }

    /// Create Gemini provider config
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self {
            details: ProviderDetails::Gemini(GeminiConfig::new(api_key)),
            http: HttpSettings::default(),
        }
    }

    pub fn with_http(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }

    /// Get the provider type
    pub fn provider_type(&self) -> ProviderType {
        match self.details {
            ProviderDetails::OpenAICompatible(_) => ProviderType::OpenAICompatible,
            ProviderDetails::Gemini(_) => ProviderType::Gemini,
        }
    }
}

/// Factory for creating transports from configuration
pub struct ClientFactory;

impl ClientFactory {
    /// Create a transport from provider configuration
    pub fn create_transport(config: ProviderConfig) -> Result<Arc<dyn crate::traits::ChatTransport>> {
        match config.details {
            ProviderDetails::OpenAICompatible(openai_config) => {
                let client = crate::openai::OpenAICompatibleClient::builder()
                    .api_key(openai_config.api_key)
                    .endpoint(openai_config.endpoint)
                    .http(config.http)
                    .build()?;
                Ok(Arc::new(client))
            }
            ProviderDetails::Gemini(gemini_config) => {
                let mut builder = crate::gemini::GeminiClient::builder()
                    .api_key(gemini_config.api_key)
                    .http(config.http);
                if let Some(base_url) = gemini_config.base_url {
                    builder = builder.base_url(base_url);
                }
                Ok(Arc::new(builder.build()?))
            }
        }
    }
}
