//! Core word types for the vnest-graph engine.
//!
//! Words are the nodes of the compatibility graph. Every word is identified
//! by a [`WordId`], carries its surface text, and is tagged with the
//! grammatical [`WordRole`] it plays in a sentence. The [`IdAllocator`]
//! provides thread-safe identifier generation for in-memory stores.

use std::num::NonZeroU64;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::WordError;

/// Unique, niche-optimized identifier for a word.
///
/// Uses `NonZeroU64` so that `Option<WordId>` is the same size as `WordId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct WordId(NonZeroU64);

impl WordId {
    /// Create a `WordId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(WordId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl From<NonZeroU64> for WordId {
    fn from(raw: NonZeroU64) -> Self {
        WordId(raw)
    }
}

impl std::fmt::Display for WordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "word:{}", self.0)
    }
}

/// Grammatical role of a word within a subject-verb-object sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WordRole {
    Subject,
    Verb,
    Object,
}

impl WordRole {
    /// All roles in sentence order.
    pub const ALL: [WordRole; 3] = [WordRole::Subject, WordRole::Verb, WordRole::Object];

    /// Upper-case wire name (`SUBJECT`, `VERB`, `OBJECT`).
    pub fn as_wire(self) -> &'static str {
        match self {
            WordRole::Subject => "SUBJECT",
            WordRole::Verb => "VERB",
            WordRole::Object => "OBJECT",
        }
    }
}

impl std::fmt::Display for WordRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WordRole::Subject => write!(f, "subject"),
            WordRole::Verb => write!(f, "verb"),
            WordRole::Object => write!(f, "object"),
        }
    }
}

impl FromStr for WordRole {
    type Err = WordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subject" => Ok(WordRole::Subject),
            "verb" => Ok(WordRole::Verb),
            "object" => Ok(WordRole::Object),
            _ => Err(WordError::InvalidRole { role: s.to_string() }),
        }
    }
}

/// A lexical item tagged with its grammatical role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// Unique identifier.
    pub id: WordId,
    /// Surface text, never blank.
    pub text: String,
    /// Role this word plays in a sentence.
    pub role: WordRole,
    /// When this word was created (seconds since UNIX epoch).
    pub created_at: u64,
    /// When this word was last modified (seconds since UNIX epoch).
    pub updated_at: u64,
}

impl Word {
    /// Create a new word stamped with the current time.
    pub fn new(id: WordId, text: impl Into<String>, role: WordRole) -> Self {
        let now = now_secs();
        Self {
            id,
            text: text.into(),
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace text and role, refreshing `updated_at`.
    pub fn revise(&mut self, text: impl Into<String>, role: WordRole) {
        self.text = text.into();
        self.role = role;
        self.updated_at = now_secs().max(self.created_at);
    }
}

/// Compact `{id, text}` view of a word for client payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordReference {
    pub id: u64,
    pub text: String,
}

impl From<&Word> for WordReference {
    fn from(word: &Word) -> Self {
        Self {
            id: word.id.get(),
            text: word.text.clone(),
        }
    }
}

/// Seconds since the UNIX epoch.
pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Thread-safe identifier allocator.
///
/// Produces monotonically increasing IDs starting from 1.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Create a new allocator that starts from ID 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Create an allocator that resumes from a given ID.
    pub fn starting_from(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start.max(1)),
        }
    }

    /// Allocate the next raw ID, or `None` once the space is exhausted.
    pub fn next_raw(&self) -> Option<NonZeroU64> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        NonZeroU64::new(raw)
    }

    /// Return the next ID that *would* be allocated, without consuming it.
    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
