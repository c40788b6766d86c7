//! Turns pending audience comments into spoken commentary.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::chunk::Chunk;
use crate::comments::{Comment, CommentSource};
use crate::rewriter::Rewriter;

/// Line spoken after commentary that covered several comments.
pub const DEFAULT_COMMENTARY_CLOSING: &str = "Ok. Let's continue.";

/// Presenter persona given to the rewriter.
pub const DEFAULT_PERSONA: &str = r#"You are a charismatic and engaging livestream host. Your job is to respond to viewer comments in a way that is:

Concise - Keep it short and to the point.

Entertaining - Add personality, wit, and light humor.

Natural - Sound like you're speaking live, not reading a script.

Interactive - Maintain flow and bridge smoothly to the next comment or topic.

Instructions:
You will be given viewer comments, each with an intended answer.
Rewrite them into a spoken-style host response that feels fun, real, and keeps the energy high.
Always repeat each comment back first so the viewer knows you are addressing their question.
Keep the order of the comments.

Rules:
- Only output the host's spoken lines.
- No extra explanation, narration, or tags.
- Make it friendly, lively, and flowing."#;

/// Result of one drain cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentaryBatch {
    /// Comments seen this cycle, in arrival order.
    pub source_comments: Vec<Comment>,
    /// Commentary to speak, in order.
    pub result_chunks: Vec<Chunk>,
    /// Comment ids to acknowledge once the commentary is spoken.
    /// Empty whenever `result_chunks` is empty.
    pub ack_ids: Vec<String>,
}

impl CommentaryBatch {
    pub fn is_empty(&self) -> bool {
        self.result_chunks.is_empty()
    }
}

/// Drains pending comments into one rewrite call per cycle.
pub struct CommentBatcher {
    source: Arc<dyn CommentSource>,
    rewriter: Arc<dyn Rewriter>,
    persona: String,
    closing_line: Option<String>,
    /// Comments already spoken this session, acknowledged or not.
    answered: Mutex<HashSet<String>>,
}

impl CommentBatcher {
    pub fn new(source: Arc<dyn CommentSource>, rewriter: Arc<dyn Rewriter>) -> Self {
        Self {
            source,
            rewriter,
            persona: DEFAULT_PERSONA.to_string(),
            closing_line: Some(DEFAULT_COMMENTARY_CLOSING.to_string()),
            answered: Mutex::new(HashSet::new()),
        }
    }

    /// Override the presenter persona.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    /// Set or disable the closing line after multi-comment commentary.
    pub fn with_closing_line(mut self, closing_line: Option<String>) -> Self {
        self.closing_line = closing_line.filter(|line| !line.trim().is_empty());
        self
    }

    pub fn source(&self) -> Arc<dyn CommentSource> {
        Arc::clone(&self.source)
    }

    /// Record comments whose commentary has been spoken. Later drains skip
    /// them even while their acknowledgment is still in flight or failed.
    pub fn mark_answered(&self, comment_ids: &[String]) {
        if let Ok(mut answered) = self.answered.lock() {
            answered.extend(comment_ids.iter().cloned());
        }
    }

    fn skip_answered(&self, comments: &mut Vec<Comment>) {
        let Ok(answered) = self.answered.lock() else {
            return;
        };
        let before = comments.len();
        comments.retain(|c| !answered.contains(&c.id));
        if comments.len() < before {
            debug!(skipped = before - comments.len(), "skipping comments already answered");
        }
    }

    /// Pull every pending comment and rewrite them as one batch.
    ///
    /// Never fails: any collaborator error yields an empty batch and the
    /// comments stay pending for the next cycle.
    pub async fn drain(&self) -> CommentaryBatch {
        let mut comments = match self.source.list_pending().await {
            Ok(comments) => comments,
            Err(e) => {
                warn!(error = %e, "failed to list pending comments; skipping commentary");
                return CommentaryBatch::default();
            }
        };
        self.skip_answered(&mut comments);

        if comments.is_empty() {
            return CommentaryBatch::default();
        }

        let request = build_rewrite_request(&comments);
        debug!(comments = comments.len(), "rewriting pending comments");

        let rewritten = match self.rewriter.rewrite(&self.persona, &request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!(comments = comments.len(), "rewrite returned no text; comments stay pending");
                return empty_batch(comments);
            }
            Err(e) => {
                warn!(error = %e, comments = comments.len(), "rewrite failed; comments stay pending");
                return empty_batch(comments);
            }
        };

        let mut result_chunks = vec![Chunk::commentary(rewritten)];
        if comments.len() > 1 {
            if let Some(closing) = &self.closing_line {
                result_chunks.push(Chunk::commentary(closing.clone()));
            }
        }

        let ack_ids = comments.iter().map(|c| c.id.clone()).collect();

        CommentaryBatch {
            source_comments: comments,
            result_chunks,
            ack_ids,
        }
    }
}

fn empty_batch(comments: Vec<Comment>) -> CommentaryBatch {
    CommentaryBatch {
        source_comments: comments,
        result_chunks: Vec::new(),
        ack_ids: Vec::new(),
    }
}

/// Combine comments into one rewrite request, preserving arrival order.
pub fn build_rewrite_request(comments: &[Comment]) -> String {
    comments
        .iter()
        .map(|c| format!("comment: {}\nanswer: {}\n\n", c.question, c.answer))
        .collect()
}
