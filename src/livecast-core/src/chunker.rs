//! Script chunking.
//!
//! Splits a monologue into utterance-sized chunks that only break at
//! sentence boundaries.

use std::sync::LazyLock;

use regex::Regex;

use crate::chunk::Chunk;
use crate::error::LivecastError;

/// Default word budget per chunk.
pub const DEFAULT_MAX_WORDS_PER_CHUNK: usize = 50;

// A sentence ends in one or more terminal marks; trailing text without
// punctuation is still a sentence.
static SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]*[.!?]+|[^.!?]+$").expect("valid sentence pattern"));

/// Split text into sentences, trimmed, in input order.
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split text into chunks of at most `max_words_per_chunk` words.
///
/// Whole sentences are packed greedily. A sentence is never split, so a
/// single sentence longer than the budget becomes a chunk on its own.
pub fn split_into_chunks(
    text: &str,
    max_words_per_chunk: usize,
) -> Result<Vec<String>, LivecastError> {
    if max_words_per_chunk == 0 {
        return Err(LivecastError::InvalidArgument(
            "max_words_per_chunk must be greater than zero".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_words = 0;

    for sentence in split_sentences(text) {
        let sentence_words = sentence.split_whitespace().count();

        if current_words + sentence_words > max_words_per_chunk && !current.is_empty() {
            chunks.push(current.join(" "));
            current.clear();
            current_words = 0;
        }

        current.push(sentence);
        current_words += sentence_words;
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    Ok(chunks)
}

/// Chunk a script into ordered script-origin chunks.
pub fn chunk_script(text: &str, max_words_per_chunk: usize) -> Result<Vec<Chunk>, LivecastError> {
    Ok(split_into_chunks(text, max_words_per_chunk)?
        .into_iter()
        .map(Chunk::script)
        .collect())
}
