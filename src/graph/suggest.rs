//! Verb-centric suggestion aggregation.
//!
//! Groups edges by verb and collects, per verb, the distinct subjects and
//! objects seen with it. This is an over-approximation: a subject `A` and an
//! object `Y` both appearing in the lists of verb `V` does **not** mean the
//! sentence `A V Y` is allowed. Only an exact triple lookup
//! ([`validate`](super::validate)) is authoritative.
//!
//! Ordering is ascending by id everywhere. That is an implementation choice
//! for reproducible output, not something clients may rely on.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::graph::Combination;
use crate::word::{Word, WordId, WordReference};

/// Distinct subjects and objects seen with one verb.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerbGroup {
    pub subjects: BTreeSet<WordId>,
    pub objects: BTreeSet<WordId>,
}

/// Edges grouped by verb, plus the union of all referenced subjects and objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub verbs: BTreeMap<WordId, VerbGroup>,
    pub subjects: BTreeSet<WordId>,
    pub objects: BTreeSet<WordId>,
}

impl Aggregation {
    pub fn verb_ids(&self) -> Vec<WordId> {
        self.verbs.keys().copied().collect()
    }

    pub fn subject_ids(&self) -> Vec<WordId> {
        self.subjects.iter().copied().collect()
    }

    pub fn object_ids(&self) -> Vec<WordId> {
        self.objects.iter().copied().collect()
    }
}

/// Group `edges` by verb. Repeated appearances collapse.
pub fn aggregate(edges: &[Combination]) -> Aggregation {
    let mut agg = Aggregation::default();
    for edge in edges {
        let group = agg.verbs.entry(edge.verb).or_default();
        group.subjects.insert(edge.subject);
        group.objects.insert(edge.object);
        agg.subjects.insert(edge.subject);
        agg.objects.insert(edge.object);
    }
    agg
}

/// One verb with the subjects and objects seen alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbSuggestion {
    pub id: u64,
    pub text: String,
    pub compatible_subject_ids: Vec<u64>,
    pub compatible_object_ids: Vec<u64>,
}

/// Exercise data for a client: verbs with their compatible word ids, and the
/// referenced subject and object words.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    pub verbs: Vec<VerbSuggestion>,
    pub subjects: Vec<WordReference>,
    pub objects: Vec<WordReference>,
}

/// Attach word texts to an aggregation.
///
/// `words` must contain whatever of the aggregation's verb, subject and object
/// ids still resolve. Verbs that no longer resolve are dropped along with
/// their group; unresolved subjects and objects are left out of the word
/// lists but stay in the per-verb id lists.
pub fn assemble(agg: &Aggregation, words: &HashMap<WordId, Word>) -> Suggestions {
    let verbs = agg
        .verbs
        .iter()
        .filter_map(|(verb_id, group)| {
            let verb = words.get(verb_id)?;
            Some(VerbSuggestion {
                id: verb.id.get(),
                text: verb.text.clone(),
                compatible_subject_ids: group.subjects.iter().map(|id| id.get()).collect(),
                compatible_object_ids: group.objects.iter().map(|id| id.get()).collect(),
            })
        })
        .collect();

    let refs = |ids: &BTreeSet<WordId>| -> Vec<WordReference> {
        ids.iter()
            .filter_map(|id| words.get(id))
            .map(WordReference::from)
            .collect()
    };

    Suggestions {
        verbs,
        subjects: refs(&agg.subjects),
        objects: refs(&agg.objects),
    }
}
