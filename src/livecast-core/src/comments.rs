//! Live audience comments and the services that provide them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LivecastError;

/// An audience comment paired with its intended answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    /// Unique identifier assigned by the comment service.
    #[serde(rename = "comment_id")]
    pub id: String,
    /// What the viewer asked.
    pub question: String,
    /// The prepared answer to deliver.
    pub answer: String,
}

impl Comment {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A source of pending comments.
///
/// Implementations must stop returning a comment once it has been
/// acknowledged successfully. Returned comments are in arrival order.
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// List every comment still waiting to be addressed.
    async fn list_pending(&self) -> Result<Vec<Comment>, LivecastError>;

    /// Mark a comment as handled.
    async fn acknowledge(&self, comment_id: &str) -> Result<(), LivecastError>;
}

/// Comment source used when no comment service is configured.
#[derive(Debug, Default, Clone)]
pub struct EmptyCommentSource;

#[async_trait]
impl CommentSource for EmptyCommentSource {
    async fn list_pending(&self) -> Result<Vec<Comment>, LivecastError> {
        Ok(Vec::new())
    }

    async fn acknowledge(&self, _comment_id: &str) -> Result<(), LivecastError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PendingResponse {
    #[serde(default)]
    responses: Vec<Comment>,
}

/// Comment service reached over HTTP.
///
/// `GET {base}/responses` lists pending comments and
/// `POST {base}/responses/{id}/ack` acknowledges one.
pub struct HttpCommentSource {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpCommentSource {
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, LivecastError> {
        let base_url = Url::parse(base_url.as_ref()).map_err(|e| {
            LivecastError::ConfigError(format!("Invalid comment service URL: {}", e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(LivecastError::ConfigError(format!(
                "Invalid comment service URL: {}",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LivecastError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, LivecastError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LivecastError::ConfigError(format!("Invalid comment service URL: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn pending_url(&self) -> Result<Url, LivecastError> {
        self.endpoint(&["responses"])
    }

    fn ack_url(&self, comment_id: &str) -> Result<Url, LivecastError> {
        self.endpoint(&["responses", comment_id, "ack"])
    }
}

#[async_trait]
impl CommentSource for HttpCommentSource {
    async fn list_pending(&self) -> Result<Vec<Comment>, LivecastError> {
        let response: PendingResponse = self
            .client
            .get(self.pending_url()?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(count = response.responses.len(), "fetched pending comments");
        Ok(response.responses)
    }

    async fn acknowledge(&self, comment_id: &str) -> Result<(), LivecastError> {
        if comment_id.trim().is_empty() {
            return Err(LivecastError::InvalidArgument(
                "comment id is required".to_string(),
            ));
        }

        self.client
            .post(self.ack_url(comment_id)?)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
