//! Presenter transport and session credential contracts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::LivecastError;

/// Session credential for the presenter transport.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// The speaking transport.
///
/// `speak` resolves only once the utterance has been rendered completely.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Open the transport with the given credential.
    async fn start(&self, token: &SessionToken) -> Result<(), LivecastError>;

    /// Render one utterance to completion.
    async fn speak(&self, text: &str) -> Result<(), LivecastError>;

    /// Release transport resources. Must tolerate being called in any state.
    async fn stop(&self);
}

/// Acquires the session credential.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire(&self) -> Result<SessionToken, LivecastError>;
}

/// A token known up front (e.g. from the environment).
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn acquire(&self) -> Result<SessionToken, LivecastError> {
        if self.token.trim().is_empty() {
            return Err(LivecastError::Unavailable(
                "no presenter token configured".to_string(),
            ));
        }
        Ok(SessionToken::new(self.token.clone()))
    }
}

/// Requests a fresh token with `POST {url}`; the body is the token.
pub struct HttpTokenProvider {
    url: String,
    client: reqwest::Client,
}

impl HttpTokenProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LivecastError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LivecastError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn acquire(&self) -> Result<SessionToken, LivecastError> {
        let token = self
            .client
            .post(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let token = token.trim();
        if token.is_empty() {
            return Err(LivecastError::Unavailable(
                "token endpoint returned an empty token".to_string(),
            ));
        }
        debug!("acquired presenter token");
        Ok(SessionToken::new(token))
    }
}

/// Telemetry reported by a presenter transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    StreamReady,
    StreamDisconnected,
    TalkingStarted { text: String },
    TalkingStopped,
}

pub type PresenterObserver = Arc<dyn Fn(&PresenterEvent) + Send + Sync>;

/// Observers registered on a presenter. Purely informational.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<PresenterObserver>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: PresenterObserver) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn emit(&self, event: PresenterEvent) {
        for observer in &self.observers {
            observer(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

/// Observer that logs transport telemetry.
pub fn tracing_observer() -> PresenterObserver {
    Arc::new(|event: &PresenterEvent| match event {
        PresenterEvent::StreamReady => info!("presenter stream ready"),
        PresenterEvent::StreamDisconnected => warn!("presenter stream disconnected"),
        PresenterEvent::TalkingStarted { text } => {
            debug!(words = text.split_whitespace().count(), "presenter started talking")
        }
        PresenterEvent::TalkingStopped => debug!("presenter stopped talking"),
    })
}
