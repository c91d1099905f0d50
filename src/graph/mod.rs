//! Compatibility graph: words as nodes, allowed combinations as 3-ary edges.
//!
//! A [`Combination`] records that one subject, one verb, and one object form
//! an allowed sentence. Edges reference words by [`WordId`] only; the word
//! records themselves live in the word arena of the store.
//!
//! The decision logic operating on already-fetched words and edges lives in
//! the submodules:
//!
//! - [`expand`]: cartesian batch expansion of a verb over subjects × objects
//! - [`suggest`]: verb-centric aggregation of compatible subjects and objects
//! - [`validate`]: exact-triple verdicts and sentence rendering

pub mod expand;
pub mod suggest;
pub mod validate;

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::word::{WordId, now_secs};

/// Unique identifier for an allowed combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct CombinationId(NonZeroU64);

impl CombinationId {
    /// Create a `CombinationId` from a raw `u64`. Returns `None` for zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(CombinationId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl From<NonZeroU64> for CombinationId {
    fn from(raw: NonZeroU64) -> Self {
        CombinationId(raw)
    }
}

impl std::fmt::Display for CombinationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "combo:{}", self.0)
    }
}

/// The uniqueness key of a combination: one word id per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TripleKey {
    pub subject: WordId,
    pub verb: WordId,
    pub object: WordId,
}

impl TripleKey {
    pub fn new(subject: WordId, verb: WordId, object: WordId) -> Self {
        Self {
            subject,
            verb,
            object,
        }
    }
}

impl std::fmt::Display for TripleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.subject.get(),
            self.verb.get(),
            self.object.get()
        )
    }
}

/// A stored allowed combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combination {
    /// Store-assigned identifier.
    pub id: CombinationId,
    pub subject: WordId,
    pub verb: WordId,
    pub object: WordId,
    /// Creation timestamp (seconds since UNIX epoch).
    pub created_at: u64,
}

impl Combination {
    /// Build a combination for `key`, stamped with the current time.
    pub fn new(id: CombinationId, key: TripleKey) -> Self {
        Self {
            id,
            subject: key.subject,
            verb: key.verb,
            object: key.object,
            created_at: now_secs(),
        }
    }

    /// The uniqueness key of this combination.
    pub fn key(&self) -> TripleKey {
        TripleKey::new(self.subject, self.verb, self.object)
    }

    /// Whether `word` appears in any position of this combination.
    pub fn references(&self, word: WordId) -> bool {
        self.subject == word || self.verb == word || self.object == word
    }
}
