//! Spoken chunk definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a chunk came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChunkOrigin {
    /// Part of the prepared script.
    Script,
    /// Rewritten audience commentary.
    Commentary,
}

impl ChunkOrigin {
    pub fn display_name(&self) -> &str {
        match self {
            ChunkOrigin::Script => "script",
            ChunkOrigin::Commentary => "commentary",
        }
    }
}

/// One utterance handed to the presenter as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    text: String,
    origin: ChunkOrigin,
}

impl Chunk {
    pub fn new(text: impl Into<String>, origin: ChunkOrigin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }

    pub fn script(text: impl Into<String>) -> Self {
        Self::new(text, ChunkOrigin::Script)
    }

    pub fn commentary(text: impl Into<String>) -> Self {
        Self::new(text, ChunkOrigin::Commentary)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> ChunkOrigin {
        self.origin
    }

    pub fn is_commentary(&self) -> bool {
        self.origin == ChunkOrigin::Commentary
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW_CHARS: usize = 48;

        let mut preview: String = self.text.chars().take(PREVIEW_CHARS).collect();
        if self.text.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        write!(f, "{} chunk \"{}\"", self.origin.display_name(), preview)
    }
}
