//! Cartesian batch expansion of one verb over subjects × objects.
//!
//! Planning is pure: it takes the resolved word map and the pairs already
//! stored for the verb, and decides which triples to stage. Unresolved ids
//! are skipped and reported, never fatal; pairs already present are skipped
//! and counted.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::graph::{Combination, TripleKey};
use crate::word::{Word, WordId};

/// What a batch expansion decided to create, and what it skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    /// Triples to insert, in subjects-outer, objects-inner order.
    pub staged: Vec<TripleKey>,
    /// Subject ids that did not resolve to a word.
    pub skipped_subjects: Vec<WordId>,
    /// Object ids that did not resolve to a word.
    pub skipped_objects: Vec<WordId>,
    /// Pairs skipped because the triple already exists.
    pub already_present: usize,
}

/// Result of running a batch expansion against a store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    /// Exactly the combinations newly created by this call.
    pub created: Vec<Combination>,
    pub skipped_subjects: Vec<WordId>,
    pub skipped_objects: Vec<WordId>,
    pub already_present: usize,
}

impl BatchOutcome {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }
}

/// Collapse repeated ids, keeping the first occurrence of each.
pub fn dedup_ids(ids: &[WordId]) -> Vec<WordId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// The `(subject, object)` pairs present among `edges`.
///
/// Built once per verb so the cartesian walk checks existence in memory
/// instead of issuing one store lookup per pair.
pub fn existing_pairs(edges: &[Combination]) -> HashSet<(WordId, WordId)> {
    edges.iter().map(|c| (c.subject, c.object)).collect()
}

/// Plan the expansion of `verb` over `subjects` × `objects`.
///
/// `resolved` holds every subject and object id that exists; `existing` holds
/// the pairs already stored with `verb`. Repeated input ids are collapsed.
pub fn plan_batch(
    verb: WordId,
    subjects: &[WordId],
    objects: &[WordId],
    resolved: &HashMap<WordId, Word>,
    existing: &HashSet<(WordId, WordId)>,
) -> BatchPlan {
    let subjects = dedup_ids(subjects);
    let objects = dedup_ids(objects);

    let (subjects, skipped_subjects): (Vec<_>, Vec<_>) =
        subjects.into_iter().partition(|id| resolved.contains_key(id));
    let (objects, skipped_objects): (Vec<_>, Vec<_>) =
        objects.into_iter().partition(|id| resolved.contains_key(id));

    let mut plan = BatchPlan {
        staged: Vec::with_capacity(subjects.len() * objects.len()),
        skipped_subjects,
        skipped_objects,
        already_present: 0,
    };

    for &subject in &subjects {
        for &object in &objects {
            if existing.contains(&(subject, object)) {
                plan.already_present += 1;
            } else {
                plan.staged.push(TripleKey::new(subject, verb, object));
            }
        }
    }
    plan
}
