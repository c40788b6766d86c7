//! Livecast Core Library
//!
//! Drives a narrated live presentation: chunks a script, speaks it one
//! utterance at a time, and weaves rewritten audience comments in
//! between script beats.

pub mod acknowledger;
pub mod batcher;
pub mod chunk;
pub mod chunker;
pub mod comments;
pub mod config;
pub mod error;
pub mod presenter;
pub mod rewriter;
pub mod script;
pub mod sequencer;
pub mod session;

#[cfg(test)]
mod testing;

pub use acknowledger::{AckSummary, Acknowledger};
pub use batcher::{CommentBatcher, CommentaryBatch};
pub use chunk::{Chunk, ChunkOrigin};
pub use chunker::{chunk_script, split_into_chunks};
pub use comments::{Comment, CommentSource, EmptyCommentSource, HttpCommentSource};
pub use config::Config;
pub use error::LivecastError;
pub use presenter::{
    HttpTokenProvider, ObserverSet, Presenter, PresenterEvent, SessionToken, StaticTokenProvider,
    TokenProvider,
};
pub use rewriter::{OpenAiRewriter, Rewriter, RewriterConfig};
pub use script::{FileScriptSource, HttpScriptSource, ScriptSource};
pub use sequencer::{RunOutcome, SequenceReport, SequencerEvent, SpeechSequencer};
pub use session::{
    SessionConfig, SessionDriver, SessionEvent, SessionHandle, SessionReport, SessionState,
};
