// Layered settings: config/default.toml, config/{DUET_ENV}.toml, DUET_* env

use config::{Config, Environment, File, FileFormat};
use duet_llm::{
    normalize_endpoint, ChatOptions, ClientFactory, GeminiConfig, HttpSettings, ProviderConfig,
    ProviderDetails, ProviderType,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::composite::Composite;
use crate::error::ConfigurationError;
use crate::prompts::{
    PromptConfig, DEFAULT_ANSWER_INSTRUCTION, DEFAULT_ANSWER_TEMPLATE,
    DEFAULT_REASONING_INSTRUCTION,
};
use crate::types::Phase;

pub const ENV_PREFIX: &str = "DUET";
const PROXY_ENV_VARS: [&str; 6] = [
    "HTTPS_PROXY",
    "https_proxy",
    "HTTP_PROXY",
    "http_proxy",
    "ALL_PROXY",
    "all_proxy",
];
const PROXY_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];

/// Everything a composite needs, read once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_reasoning_endpoint")]
    pub reasoning_endpoint: String,
    #[serde(default)]
    pub reasoning_api_key: String,
    /// Derived from the endpoint when unset
    #[serde(default)]
    pub reasoning_model: Option<String>,

    #[serde(default = "default_answer_provider")]
    pub answer_provider: ProviderType,
    /// Chat completions URL for `openai_compatible`, base URL override for `gemini`
    #[serde(default)]
    pub answer_endpoint: Option<String>,
    #[serde(default)]
    pub answer_api_key: String,
    #[serde(default = "default_answer_model")]
    pub answer_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default)]
    pub presence_penalty: f32,
    #[serde(default)]
    pub frequency_penalty: f32,
    #[serde(default = "default_max_tokens")]
    pub reasoning_max_tokens: u32,
    #[serde(default = "default_max_tokens")]
    pub answer_max_tokens: u32,

    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default = "default_reasoning_instruction")]
    pub reasoning_instruction: String,
    #[serde(default = "default_answer_instruction")]
    pub answer_instruction: String,
    #[serde(default = "default_answer_template")]
    pub answer_template: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_reasoning_endpoint() -> String {
    "https://api.deepseek.com/v1/chat/completions".to_string()
}

fn default_answer_provider() -> ProviderType {
    ProviderType::Gemini
}

fn default_answer_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    1.0
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_read_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_channel_capacity() -> usize {
    1
}

fn default_reasoning_instruction() -> String {
    DEFAULT_REASONING_INSTRUCTION.to_string()
}

fn default_answer_instruction() -> String {
    DEFAULT_ANSWER_INSTRUCTION.to_string()
}

fn default_answer_template() -> String {
    DEFAULT_ANSWER_TEMPLATE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    /// Load from config files and `DUET_*` environment variables, then validate
    pub fn load() -> Result<Self, ConfigurationError> {
        let env = std::env::var("DUET_ENV").unwrap_or_else(|_| "dev".to_string());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        if settings.proxy.is_none() {
            settings.proxy = proxy_from_env();
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Parse a TOML document on its own, without files or environment
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigurationError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject missing or unusable values before any network I/O
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.reasoning_api_key.trim().is_empty() {
            return Err(ConfigurationError::Missing("reasoning_api_key"));
        }
        if self.answer_api_key.trim().is_empty() {
            return Err(ConfigurationError::Missing("answer_api_key"));
        }
        if self.reasoning_endpoint.trim().is_empty() {
            return Err(ConfigurationError::Missing("reasoning_endpoint"));
        }
        check_url("reasoning_endpoint", &normalize_endpoint(&self.reasoning_endpoint))?;

        match (self.answer_provider, self.answer_endpoint.as_deref()) {
            (ProviderType::OpenAICompatible, None) => {
                return Err(ConfigurationError::Missing("answer_endpoint"));
            }
            (ProviderType::OpenAICompatible, Some(endpoint)) => {
                check_url("answer_endpoint", &normalize_endpoint(endpoint))?;
            }
            (ProviderType::Gemini, Some(base_url)) => {
                check_url("answer_endpoint", base_url)?;
            }
            (ProviderType::Gemini, None) => {}
        }

        if self.answer_model.trim().is_empty() {
            return Err(ConfigurationError::invalid("answer_model", "must not be empty"));
        }
        if matches!(&self.reasoning_model, Some(model) if model.trim().is_empty()) {
            return Err(ConfigurationError::invalid("reasoning_model", "must not be empty"));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigurationError::invalid("temperature", "must be within 0.0..=2.0"));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigurationError::invalid("top_p", "must be within 0.0..=1.0"));
        }
        if !(-2.0..=2.0).contains(&self.presence_penalty) {
            return Err(ConfigurationError::invalid("presence_penalty", "must be within -2.0..=2.0"));
        }
        if !(-2.0..=2.0).contains(&self.frequency_penalty) {
            return Err(ConfigurationError::invalid("frequency_penalty", "must be within -2.0..=2.0"));
        }
        if self.reasoning_max_tokens == 0 {
            return Err(ConfigurationError::invalid("reasoning_max_tokens", "must be positive"));
        }
        if self.answer_max_tokens == 0 {
            return Err(ConfigurationError::invalid("answer_max_tokens", "must be positive"));
        }

        if let Some(proxy) = &self.proxy {
            let url = check_url("proxy", proxy)?;
            if !PROXY_SCHEMES.contains(&url.scheme()) {
                return Err(ConfigurationError::invalid(
                    "proxy",
                    format!("unsupported scheme '{}'", url.scheme()),
                ));
            }
        }

        if self.read_timeout_secs == 0 {
            return Err(ConfigurationError::invalid("read_timeout_secs", "must be positive"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigurationError::invalid("connect_timeout_secs", "must be positive"));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigurationError::invalid("channel_capacity", "must be at least 1"));
        }

        if let Some(placeholder) = self.prompts().missing_placeholder() {
            return Err(ConfigurationError::invalid(
                "answer_template",
                format!("must contain {}", placeholder),
            ));
        }

        Ok(())
    }

    /// Configured reasoning model, or the provider's R1 name for the endpoint
    pub fn reasoning_model(&self) -> String {
        match &self.reasoning_model {
            Some(model) => model.clone(),
            None if self.reasoning_endpoint.contains("siliconflow.cn") => {
                "deepseek-ai/DeepSeek-R1".to_string()
            }
            None => "deepseek-reasoner".to_string(),
        }
    }

    pub fn prompts(&self) -> PromptConfig {
        PromptConfig {
            reasoning_instruction: self.reasoning_instruction.clone(),
            answer_instruction: self.answer_instruction.clone(),
            answer_template: self.answer_template.clone(),
        }
    }

    pub fn http(&self) -> HttpSettings {
        let mut http = HttpSettings::new()
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .with_read_timeout(Duration::from_secs(self.read_timeout_secs));
        if let Some(proxy) = &self.proxy {
            http = http.with_proxy(proxy.clone());
        }
        http
    }

    pub fn reasoning_provider(&self) -> ProviderConfig {
        ProviderConfig::openai_compatible(&self.reasoning_api_key, &self.reasoning_endpoint)
            .with_http(self.http())
    }

    pub fn answer_provider_config(&self) -> ProviderConfig {
        let config = match (self.answer_provider, &self.answer_endpoint) {
            (ProviderType::OpenAICompatible, endpoint) => ProviderConfig::openai_compatible(
                &self.answer_api_key,
                endpoint.clone().unwrap_or_default(),
            ),
            (ProviderType::Gemini, Some(base_url)) => ProviderConfig {
                details: ProviderDetails::Gemini(
                    GeminiConfig::new(&self.answer_api_key).with_base_url(base_url.clone()),
                ),
                http: HttpSettings::default(),
            },
            (ProviderType::Gemini, None) => ProviderConfig::gemini(&self.answer_api_key),
        };
        config.with_http(self.http())
    }

    pub fn reasoning_options(&self) -> ChatOptions {
        self.sampling().max_tokens(self.reasoning_max_tokens)
    }

    pub fn answer_options(&self) -> ChatOptions {
        self.sampling().max_tokens(self.answer_max_tokens)
    }

    fn sampling(&self) -> ChatOptions {
        ChatOptions::new()
            .temperature(self.temperature)
            .top_p(self.top_p)
            .presence_penalty(self.presence_penalty)
            .frequency_penalty(self.frequency_penalty)
    }
}

impl Composite {
    /// Build both transports from validated settings
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigurationError> {
        settings.validate()?;

        let reasoning_transport = ClientFactory::create_transport(settings.reasoning_provider())
            .map_err(|cause| ConfigurationError::Transport {
                phase: Phase::Reasoning,
                cause,
            })?;
        let answer_transport = ClientFactory::create_transport(settings.answer_provider_config())
            .map_err(|cause| ConfigurationError::Transport {
                phase: Phase::Answer,
                cause,
            })?;

        Composite::builder()
            .reasoning(reasoning_transport, settings.reasoning_model())
            .reasoning_options(settings.reasoning_options())
            .answer(answer_transport, settings.answer_model.clone())
            .answer_options(settings.answer_options())
            .prompts(settings.prompts())
            .channel_capacity(settings.channel_capacity)
            .build()
    }
}

fn check_url(field: &'static str, value: &str) -> Result<reqwest::Url, ConfigurationError> {
    reqwest::Url::parse(value).map_err(|e| ConfigurationError::invalid(field, e.to_string()))
}

fn proxy_from_env() -> Option<String> {
    PROXY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}
