//! In-crate fakes for collaborator contracts. Test builds only.
//!
//! Every fake writes into a shared [`EventLog`] so tests can assert the
//! relative order of speak, list and acknowledge calls.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::comments::{Comment, CommentSource};
use crate::error::LivecastError;
use crate::presenter::{Presenter, SessionToken, TokenProvider};
use crate::rewriter::Rewriter;
use crate::script::ScriptSource;

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Comment service whose comments can be scheduled to appear on a given poll.
pub struct FakeCommentSource {
    log: EventLog,
    pending: Mutex<Vec<Comment>>,
    arrivals: Mutex<Vec<(usize, Comment)>>,
    list_calls: AtomicUsize,
    acked: Mutex<Vec<String>>,
    failing_acks: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
    ack_delay: Duration,
}

impl FakeCommentSource {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            pending: Mutex::new(Vec::new()),
            arrivals: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            acked: Mutex::new(Vec::new()),
            failing_acks: Mutex::new(HashSet::new()),
            fail_listing: AtomicBool::new(false),
            ack_delay: Duration::ZERO,
        }
    }

    /// Take this long to confirm each acknowledgment.
    pub fn with_ack_delay(mut self, delay: Duration) -> Self {
        self.ack_delay = delay;
        self
    }

    /// Make a comment pending immediately.
    pub fn push(&self, comment: Comment) {
        self.pending.lock().unwrap().push(comment);
    }

    /// Make a comment visible once `polls` listings have already happened.
    pub fn arrive_after(&self, polls: usize, comment: Comment) {
        self.arrivals.lock().unwrap().push((polls, comment));
    }

    pub fn fail_ack_for(&self, comment_id: &str) {
        self.failing_acks.lock().unwrap().insert(comment_id.to_string());
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Ids acknowledged successfully, in completion order.
    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommentSource for FakeCommentSource {
    async fn list_pending(&self) -> Result<Vec<Comment>, LivecastError> {
        self.log.push("list");
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(LivecastError::Unavailable("comment service down".into()));
        }

        let previous = self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut pending = self.pending.lock().unwrap();
        let mut arrivals = self.arrivals.lock().unwrap();
        let (due, later): (Vec<_>, Vec<_>) = arrivals.drain(..).partition(|(polls, _)| *polls <= previous);
        *arrivals = later;
        pending.extend(due.into_iter().map(|(_, c)| c));
        Ok(pending.clone())
    }

    async fn acknowledge(&self, comment_id: &str) -> Result<(), LivecastError> {
        self.log.push(format!("ack:{comment_id}"));
        if !self.ack_delay.is_zero() {
            tokio::time::sleep(self.ack_delay).await;
        }
        if self.failing_acks.lock().unwrap().contains(comment_id) {
            return Err(LivecastError::Unavailable("ack rejected".into()));
        }
        self.pending.lock().unwrap().retain(|c| c.id != comment_id);
        self.acked.lock().unwrap().push(comment_id.to_string());
        self.log.push(format!("acked:{comment_id}"));
        Ok(())
    }
}

/// Rewriter returning queued replies first, then a fixed fallback.
pub struct FakeRewriter {
    log: EventLog,
    replies: Mutex<VecDeque<Result<String, LivecastError>>>,
    fallback: Option<String>,
    calls: AtomicUsize,
    last: Mutex<Option<(String, String)>>,
}

impl FakeRewriter {
    pub fn ok(log: EventLog, reply: &str) -> Self {
        Self {
            log,
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn failing(log: EventLog, error: LivecastError) -> Self {
        let rewriter = Self {
            fallback: None,
            ..Self::ok(log, "")
        };
        rewriter.replies.lock().unwrap().push_back(Err(error));
        rewriter
    }

    pub fn with_replies(self, replies: Vec<Result<String, LivecastError>>) -> Self {
        self.replies.lock().unwrap().extend(replies);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_persona(&self) -> Option<String> {
        self.last.lock().unwrap().as_ref().map(|(p, _)| p.clone())
    }

    pub fn last_user_text(&self) -> Option<String> {
        self.last.lock().unwrap().as_ref().map(|(_, u)| u.clone())
    }
}

#[async_trait]
impl Rewriter for FakeRewriter {
    async fn rewrite(&self, system_persona: &str, user_text: &str) -> Result<String, LivecastError> {
        self.log.push("rewrite");
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some((system_persona.to_string(), user_text.to_string()));

        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        self.fallback
            .clone()
            .ok_or_else(|| LivecastError::Unavailable("rewriter down".into()))
    }
}

/// Presenter that records utterances and tracks concurrent speak calls.
pub struct FakePresenter {
    log: EventLog,
    delay: Duration,
    fail_on: Option<String>,
    hang_on: Option<String>,
    fail_start: bool,
    spoken: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started: AtomicBool,
    stopped: AtomicUsize,
}

impl FakePresenter {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            delay: Duration::ZERO,
            fail_on: None,
            hang_on: None,
            fail_start: false,
            spoken: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            started: AtomicBool::new(false),
            stopped: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    /// Never finish speaking this text.
    pub fn hanging_on(mut self, text: &str) -> Self {
        self.hang_on = Some(text.to_string());
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Utterances that completed, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn was_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Presenter for FakePresenter {
    async fn start(&self, _token: &SessionToken) -> Result<(), LivecastError> {
        self.log.push("start");
        if self.fail_start {
            return Err(LivecastError::Unavailable("transport refused".into()));
        }
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn speak(&self, text: &str) -> Result<(), LivecastError> {
        self.log.push(format!("speak:{text}"));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.hang_on.as_deref() == Some(text) {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on.as_deref() == Some(text) {
            return Err(LivecastError::Unavailable("transport closed".into()));
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn stop(&self) {
        self.log.push("stop");
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeTokenProvider {
    token: Option<String>,
}

impl FakeTokenProvider {
    pub fn ok(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl TokenProvider for FakeTokenProvider {
    async fn acquire(&self) -> Result<SessionToken, LivecastError> {
        self.token
            .clone()
            .map(SessionToken::new)
            .ok_or_else(|| LivecastError::Unavailable("token service down".into()))
    }
}

pub struct FakeScriptSource {
    script: Option<String>,
}

impl FakeScriptSource {
    pub fn ok(script: &str) -> Self {
        Self {
            script: Some(script.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { script: None }
    }
}

#[async_trait]
impl ScriptSource for FakeScriptSource {
    async fn fetch(&self) -> Result<String, LivecastError> {
        self.script
            .clone()
            .ok_or_else(|| LivecastError::Unavailable("script service down".into()))
    }
}
