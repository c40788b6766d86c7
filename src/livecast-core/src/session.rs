//! Session lifecycle: credential, transport, greeting, presentation.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::acknowledger::Acknowledger;
use crate::batcher::CommentBatcher;
use crate::chunk::Chunk;
use crate::chunker::{DEFAULT_MAX_WORDS_PER_CHUNK, chunk_script};
use crate::error::LivecastError;
use crate::presenter::{Presenter, TokenProvider};
use crate::script::ScriptSource;
use crate::sequencer::{RunOutcome, SequencerEvent, SpeechSequencer};

/// Lifecycle of one presentation session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Initializing,
    Greeting,
    Presenting,
    /// At a script-chunk boundary: draining comments and speaking any commentary.
    Interleaving,
    Completed,
    Failed,
}

impl SessionState {
    pub fn display_name(&self) -> &str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Initializing => "initializing",
            SessionState::Greeting => "greeting",
            SessionState::Presenting => "presenting",
            SessionState::Interleaving => "interleaving",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            (Idle, Initializing)
            | (Initializing, Greeting)
            | (Greeting, Presenting)
            | (Presenting, Interleaving)
            | (Interleaving, Presenting) => true,
            // Failure from anywhere; completion (or stop) from any live state.
            (from, Failed) | (from, Completed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Settings for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_words_per_chunk: usize,
    /// Lines spoken once the transport is ready, before the script.
    pub greeting: Vec<String>,
    /// Pause between transport start and the greeting.
    pub warmup: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_words_per_chunk: DEFAULT_MAX_WORDS_PER_CHUNK,
            greeting: default_greeting(),
            warmup: Duration::ZERO,
        }
    }
}

pub fn default_greeting() -> Vec<String> {
    vec![
        "Welcome to the live stream, we are very excited to welcome you".to_string(),
        "Let's get started".to_string(),
    ]
}

/// Events emitted during a session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged { from: SessionState, to: SessionState },
    ChunkStarted(Chunk),
    ChunkDelivered(Chunk),
    CommentaryQueued { chunks: usize, comments: usize },
    Finished { cancelled: bool },
}

/// Callback for session events.
pub type SessionCallback = Box<dyn Fn(SessionEvent) + Send + Sync>;

/// What a finished session delivered.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Greeting, script and commentary chunks in spoken order.
    pub transcript: Vec<Chunk>,
    pub commentary_delivered: usize,
    pub comments_acknowledged: usize,
    pub cancelled: bool,
}

/// Session state plus its observers.
#[derive(Clone)]
struct StateTracker {
    tx: Arc<watch::Sender<SessionState>>,
    callback: Option<Arc<SessionCallback>>,
}

impl StateTracker {
    fn current(&self) -> SessionState {
        *self.tx.borrow()
    }

    fn transition(&self, next: SessionState) -> bool {
        let mut from = None;
        let changed = self.tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                from = Some(*state);
                *state = next;
                true
            } else {
                false
            }
        });

        match from {
            Some(from) if changed => {
                info!(from = from.display_name(), to = next.display_name(), "session state changed");
                self.emit(SessionEvent::StateChanged { from, to: next });
            }
            _ => warn!(
                from = self.current().display_name(),
                to = next.display_name(),
                "ignoring illegal session transition"
            ),
        }
        changed
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}

/// Stops a running session from another task.
#[derive(Clone)]
pub struct SessionHandle {
    cancel: CancellationToken,
    presenter: Arc<dyn Presenter>,
}

impl SessionHandle {
    /// Ask the session to stop at its next step. No new utterance is started.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop and release the presenter. Safe in any state.
    pub async fn teardown(&self) {
        self.cancel.cancel();
        self.presenter.stop().await;
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Top-level driver of one presentation session.
pub struct SessionDriver {
    config: SessionConfig,
    presenter: Arc<dyn Presenter>,
    tokens: Arc<dyn TokenProvider>,
    script_source: Arc<dyn ScriptSource>,
    sequencer: SpeechSequencer,
    cancel: CancellationToken,
    state: Arc<watch::Sender<SessionState>>,
    callback: Option<Arc<SessionCallback>>,
}

impl SessionDriver {
    /// Create a driver. Fails if the chunk budget is zero.
    pub fn new(
        config: SessionConfig,
        presenter: Arc<dyn Presenter>,
        tokens: Arc<dyn TokenProvider>,
        script_source: Arc<dyn ScriptSource>,
        batcher: CommentBatcher,
    ) -> Result<Self, LivecastError> {
        if config.max_words_per_chunk == 0 {
            return Err(LivecastError::InvalidArgument(
                "max_words_per_chunk must be greater than zero".to_string(),
            ));
        }

        let cancel = CancellationToken::new();
        let acknowledger = Acknowledger::new(batcher.source());
        let sequencer = SpeechSequencer::new(batcher, acknowledger).with_cancellation(cancel.clone());
        let (state, _) = watch::channel(SessionState::Idle);

        Ok(Self {
            config,
            presenter,
            tokens,
            script_source,
            sequencer,
            cancel,
            state: Arc::new(state),
            callback: None,
        })
    }

    /// Set a callback for session events.
    pub fn with_callback(mut self, callback: SessionCallback) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Follow state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            cancel: self.cancel.clone(),
            presenter: Arc::clone(&self.presenter),
        }
    }

    /// Stop and release the presenter. Safe in any state.
    pub async fn teardown(&self) {
        self.handle().teardown().await;
    }

    fn tracker(&self) -> StateTracker {
        StateTracker {
            tx: Arc::clone(&self.state),
            callback: self.callback.clone(),
        }
    }

    /// Run the whole session: initialize, greet, present the script.
    pub async fn run(&mut self) -> Result<SessionReport, LivecastError> {
        if self.state() != SessionState::Idle {
            return Err(LivecastError::InvalidArgument(format!(
                "session already {}",
                self.state().display_name()
            )));
        }

        let tracker = self.tracker();
        self.sequencer.set_callback(sequencer_observer(tracker.clone()));

        match self.drive(&tracker).await {
            Ok(report) => {
                tracker.transition(SessionState::Completed);
                tracker.emit(SessionEvent::Finished {
                    cancelled: report.cancelled,
                });
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "session failed");
                tracker.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    async fn drive(&self, tracker: &StateTracker) -> Result<SessionReport, LivecastError> {
        let mut report = SessionReport {
            transcript: Vec::new(),
            commentary_delivered: 0,
            comments_acknowledged: 0,
            cancelled: false,
        };

        tracker.transition(SessionState::Initializing);
        let Some(script_chunks) = self.initialize().await? else {
            report.cancelled = true;
            return Ok(report);
        };

        tracker.transition(SessionState::Greeting);
        if !self.greet(tracker, &mut report.transcript).await? {
            report.cancelled = true;
            return Ok(report);
        }

        tracker.transition(SessionState::Presenting);
        let sequence = self
            .sequencer
            .run(script_chunks, self.presenter.as_ref())
            .await?;

        report.transcript.extend(sequence.delivered);
        report.commentary_delivered = sequence.commentary_delivered;
        report.comments_acknowledged = sequence.acks_issued;
        report.cancelled = sequence.outcome == RunOutcome::Cancelled;
        Ok(report)
    }

    /// Acquire the credential, load the script and start the transport.
    /// `None` means the session was stopped meanwhile.
    async fn initialize(&self) -> Result<Option<Vec<Chunk>>, LivecastError> {
        let prepare = async {
            let token = self.tokens.acquire().await.map_err(|e| {
                LivecastError::SessionInitFailed(format!("token acquisition failed: {}", e))
            })?;

            let script = self.script_source.fetch().await.map_err(|e| {
                LivecastError::SessionInitFailed(format!("script unavailable: {}", e))
            })?;
            let chunks = chunk_script(&script, self.config.max_words_per_chunk)?;
            info!(chunks = chunks.len(), "script loaded");

            self.presenter.start(&token).await.map_err(|e| {
                LivecastError::SessionInitFailed(format!("presenter failed to start: {}", e))
            })?;
            Ok::<_, LivecastError>(chunks)
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Ok(None),
            chunks = prepare => chunks.map(Some),
        }
    }

    /// Speak the greeting lines. Returns `false` if stopped.
    async fn greet(
        &self,
        tracker: &StateTracker,
        transcript: &mut Vec<Chunk>,
    ) -> Result<bool, LivecastError> {
        if !self.config.warmup.is_zero() {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(false),
                _ = tokio::time::sleep(self.config.warmup) => {}
            }
        }

        for line in &self.config.greeting {
            if self.cancel.is_cancelled() {
                return Ok(false);
            }
            let chunk = Chunk::script(line.clone());
            tracker.emit(SessionEvent::ChunkStarted(chunk.clone()));

            let spoken = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(false),
                result = self.presenter.speak(chunk.text()) => result,
            };
            if let Err(e) = spoken {
                return Err(LivecastError::DeliveryFailed {
                    chunk,
                    reason: e.to_string(),
                });
            }

            tracker.emit(SessionEvent::ChunkDelivered(chunk.clone()));
            transcript.push(chunk);
        }
        Ok(true)
    }
}

/// Maps sequencer events onto session events and the interleaving sub-state.
fn sequencer_observer(tracker: StateTracker) -> Box<dyn Fn(SequencerEvent) + Send + Sync> {
    Box::new(move |event: SequencerEvent| match event {
        SequencerEvent::ChunkStarted(chunk) => tracker.emit(SessionEvent::ChunkStarted(chunk)),
        SequencerEvent::ChunkDelivered(chunk) => tracker.emit(SessionEvent::ChunkDelivered(chunk)),
        SequencerEvent::Draining => {
            tracker.transition(SessionState::Interleaving);
        }
        SequencerEvent::CommentaryQueued { chunks, comments } => {
            tracker.emit(SessionEvent::CommentaryQueued { chunks, comments });
        }
        SequencerEvent::CommentaryFinished => {
            tracker.transition(SessionState::Presenting);
        }
    })
}
