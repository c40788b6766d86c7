//! Terminal presenter: prints each utterance and paces it like speech.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use colored::Colorize;
use livecast_core::presenter::{ObserverSet, PresenterEvent};
use livecast_core::{LivecastError, Presenter, SessionToken};

/// Renders utterances to stdout.
pub struct ConsolePresenter {
    words_per_second: f32,
    observers: ObserverSet,
    running: AtomicBool,
}

impl ConsolePresenter {
    pub fn new(words_per_second: f32) -> Self {
        Self {
            words_per_second,
            observers: ObserverSet::new(),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_observers(mut self, observers: ObserverSet) -> Self {
        self.observers = observers;
        self
    }

    /// Zero when pacing is disabled or the rate is not a usable number.
    fn speaking_time(&self, text: &str) -> Duration {
        if !self.words_per_second.is_finite() || self.words_per_second <= 0.0 {
            return Duration::ZERO;
        }
        let words = text.split_whitespace().count() as f32;
        Duration::try_from_secs_f32(words / self.words_per_second).unwrap_or(Duration::ZERO)
    }
}

#[async_trait]
impl Presenter for ConsolePresenter {
    async fn start(&self, _token: &SessionToken) -> Result<(), LivecastError> {
        self.running.store(true, Ordering::SeqCst);
        self.observers.emit(PresenterEvent::StreamReady);
        Ok(())
    }

    async fn speak(&self, text: &str) -> Result<(), LivecastError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(LivecastError::Unavailable(
                "console presenter is not running".to_string(),
            ));
        }

        self.observers.emit(PresenterEvent::TalkingStarted {
            text: text.to_string(),
        });
        for line in textwrap(text, 66).lines() {
            println!("  {}", line);
        }
        println!();

        tokio::time::sleep(self.speaking_time(text)).await;
        self.observers.emit(PresenterEvent::TalkingStopped);
        Ok(())
    }

    async fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.observers.emit(PresenterEvent::StreamDisconnected);
            println!("{}", "  [presenter stopped]".dimmed());
        }
    }
}

/// Wrap utterance text for the terminal. Width is counted in characters,
/// and a single word longer than `width` gets a line of its own.
pub fn textwrap(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut line_chars = 0;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        if line_chars > 0 && line_chars + 1 + word_chars > width {
            lines.push(std::mem::take(&mut line));
            line_chars = 0;
        }
        if line_chars > 0 {
            line.push(' ');
            line_chars += 1;
        }
        line.push_str(word);
        line_chars += word_chars;
    }
    if !line.is_empty() {
        lines.push(line);
    }

    lines.join("\n")
}
