//! Configuration module for loading TOML config files.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::batcher::{DEFAULT_COMMENTARY_CLOSING, DEFAULT_PERSONA};
use crate::chunker::DEFAULT_MAX_WORDS_PER_CHUNK;
use crate::error::LivecastError;
use crate::rewriter::{DEFAULT_API_BASE, DEFAULT_MODEL, RewriterConfig};
use crate::session::{SessionConfig, default_greeting};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub presentation: PresentationConfig,
    pub rewriter: RewriterSettings,
    pub comments: CommentsConfig,
    pub script: ScriptConfig,
    pub presenter: PresenterConfig,
}

/// How the presentation is paced and framed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub max_words_per_chunk: usize,
    pub greeting: Vec<String>,
    pub warmup_ms: u64,
    /// Spoken after commentary covering several comments. Empty disables it.
    pub commentary_closing: String,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            max_words_per_chunk: DEFAULT_MAX_WORDS_PER_CHUNK,
            greeting: default_greeting(),
            warmup_ms: 0,
            commentary_closing: DEFAULT_COMMENTARY_CLOSING.to_string(),
        }
    }
}

/// Rewriter endpoint settings. The API key comes from the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewriterSettings {
    pub api_base: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub persona: Option<String>,
}

impl Default for RewriterSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            timeout_secs: 60,
            persona: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 10,
        }
    }
}

/// Where the script comes from: a local file or the script service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub path: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    pub token_url: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LivecastError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| LivecastError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load configuration from string content.
    pub fn from_str(content: &str) -> Result<Self, LivecastError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| LivecastError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail mid-session.
    pub fn validate(&self) -> Result<(), LivecastError> {
        if self.presentation.max_words_per_chunk == 0 {
            return Err(LivecastError::InvalidArgument(
                "presentation.max_words_per_chunk must be greater than zero".to_string(),
            ));
        }
        if self.script.path.is_some() && self.script.url.is_some() {
            return Err(LivecastError::ConfigError(
                "script.path and script.url are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_words_per_chunk: self.presentation.max_words_per_chunk,
            greeting: self.presentation.greeting.clone(),
            warmup: Duration::from_millis(self.presentation.warmup_ms),
        }
    }

    pub fn rewriter_config(&self, api_key: impl Into<String>) -> RewriterConfig {
        RewriterConfig {
            api_base: self.rewriter.api_base.clone(),
            api_key: api_key.into(),
            model: self.rewriter.model.clone(),
            max_tokens: self.rewriter.max_tokens,
            temperature: self.rewriter.temperature,
            timeout: Duration::from_secs(self.rewriter.timeout_secs),
        }
    }

    /// The persona given to the rewriter.
    pub fn persona(&self) -> &str {
        self.rewriter.persona.as_deref().unwrap_or(DEFAULT_PERSONA)
    }

    /// Closing line after multi-comment commentary, if enabled.
    pub fn commentary_closing(&self) -> Option<String> {
        let closing = self.presentation.commentary_closing.trim();
        (!closing.is_empty()).then(|| closing.to_string())
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.presentation.max_words_per_chunk, 50);
        assert_eq!(config.rewriter.model, DEFAULT_MODEL);
        assert_eq!(config.persona(), DEFAULT_PERSONA);
        assert_eq!(config.commentary_closing().as_deref(), Some("Ok. Let's continue."));
        assert!(config.comments.base_url.is_none());
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_str(
            r#"
            [presentation]
            max_words_per_chunk = 30
            greeting = ["Hey everyone"]
            warmup_ms = 2500
            commentary_closing = ""

            [rewriter]
            api_base = "http://localhost:11434/v1"
            model = "llama3:8b"
            temperature = 0.2
            persona = "You are terse."

            [comments]
            base_url = "https://comments.example/prod"

            [script]
            url = "https://scripts.example/prod"
            "#,
        )
        .unwrap();

        let session = config.session_config();
        assert_eq!(session.max_words_per_chunk, 30);
        assert_eq!(session.greeting, vec!["Hey everyone"]);
        assert_eq!(session.warmup, Duration::from_millis(2500));
        assert_eq!(config.commentary_closing(), None);
        assert_eq!(config.persona(), "You are terse.");

        let rewriter = config.rewriter_config("secret");
        assert_eq!(rewriter.model, "llama3:8b");
        assert_eq!(rewriter.api_key, "secret");
        assert_eq!(rewriter.max_tokens, 1000);
    }

    #[test]
    fn test_zero_budget_rejected() {
        let err = Config::from_str("[presentation]\nmax_words_per_chunk = 0").unwrap_err();
        assert!(matches!(err, LivecastError::InvalidArgument(_)));
    }

    #[test]
    fn test_conflicting_script_sources_rejected() {
        let err = Config::from_str("[script]\npath = \"a.txt\"\nurl = \"http://x\"").unwrap_err();
        assert!(matches!(err, LivecastError::ConfigError(_)));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::from_str("[presentation"),
            Err(LivecastError::ConfigError(_))
        ));
    }
}
