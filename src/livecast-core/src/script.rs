//! Script retrieval.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::LivecastError;

/// Default script file name.
pub const DEFAULT_SCRIPT_FILE: &str = "pitch_script.txt";

/// Provides the full monologue for one session.
#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn fetch(&self) -> Result<String, LivecastError>;
}

/// Reads the script from a local file.
#[derive(Debug, Clone)]
pub struct FileScriptSource {
    path: PathBuf,
}

impl FileScriptSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for FileScriptSource {
    fn default() -> Self {
        Self::new(DEFAULT_SCRIPT_FILE)
    }
}

#[async_trait]
impl ScriptSource for FileScriptSource {
    async fn fetch(&self) -> Result<String, LivecastError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            LivecastError::Unavailable(format!(
                "Failed to read script {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
struct ScriptResult {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ScriptsResponse {
    #[serde(default)]
    results: Vec<ScriptResult>,
}

impl ScriptsResponse {
    fn into_script(self) -> Result<String, LivecastError> {
        self.results
            .into_iter()
            .next()
            .map(|r| r.result)
            .ok_or_else(|| LivecastError::Unavailable("script service returned no scripts".to_string()))
    }
}

/// Fetches the most recent script from the script service (`GET {base}/scripts`).
pub struct HttpScriptSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpScriptSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LivecastError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LivecastError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl ScriptSource for HttpScriptSource {
    async fn fetch(&self) -> Result<String, LivecastError> {
        let response: ScriptsResponse = self
            .client
            .get(format!("{}/scripts", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_script()
    }
}
