//! Text rewriting through an OpenAI-compatible chat endpoint.

use std::sync::LazyLock;
use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::error::LivecastError;

/// Single-turn text transform.
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(&self, system_persona: &str, user_text: &str) -> Result<String, LivecastError>;
}

/// Settings for [`OpenAiRewriter`].
#[derive(Debug, Clone)]
pub struct RewriterConfig {
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// API key for authentication.
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl RewriterConfig {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

pub const DEFAULT_API_BASE: &str = "https://api.llama.com/compat/v1";
pub const DEFAULT_MODEL: &str = "Llama-4-Maverick-17B-128E-Instruct-FP8";

/// Rewriter backed by a chat completion endpoint.
pub struct OpenAiRewriter {
    config: RewriterConfig,
    client: Client<OpenAIConfig>,
}

impl OpenAiRewriter {
    pub fn new(config: RewriterConfig) -> Result<Self, LivecastError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                LivecastError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.api_base);

        let client = Client::with_config(openai_config).with_http_client(http_client);

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Rewriter for OpenAiRewriter {
    async fn rewrite(&self, system_persona: &str, user_text: &str) -> Result<String, LivecastError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: system_persona.to_string().into(),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: user_text.to_string().into(),
                name: None,
            }),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .max_completion_tokens(self.config.max_tokens)
            .temperature(self.config.temperature)
            .messages(messages)
            .build()?;

        let response = self.client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let spoken = sanitize_response(&content);
        debug!(raw_len = content.len(), spoken_len = spoken.len(), "rewrite completed");
        Ok(spoken)
    }
}

static REASONING_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        "thinking",
        "think",
        "reflection",
        "reasoning",
        "thought",
        "scratchpad",
        "analysis",
    ]
    .iter()
    .filter_map(|tag| Regex::new(&format!(r"(?is)<{tag}[^>]*>.*?</{tag}>")).ok())
    .collect()
});

static ORPHAN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[\w]+[^>]*>").expect("valid tag pattern"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Make a completion safe to speak aloud.
///
/// Strips reasoning blocks with their content, leftover tags and markdown
/// emphasis, then collapses whitespace.
pub fn sanitize_response(response: &str) -> String {
    let mut result = response.to_string();

    for re in REASONING_RE.iter() {
        result = re.replace_all(&result, "").to_string();
    }

    result = ORPHAN_TAG_RE.replace_all(&result, "").to_string();
    result = result.replace('*', "");
    result = WHITESPACE_RE.replace_all(&result, " ").to_string();

    result.trim().to_string()
}
