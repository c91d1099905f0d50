//! In-memory storage backed by DashMap.
//!
//! Words live in an arena keyed by [`WordId`]; combinations are indexed three
//! ways: by id, by exact triple (O(1) existence checks), and by verb (for
//! suggestions and bulk deletion). All data is lost on process exit.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;

use crate::error::StoreError;
use crate::graph::{Combination, CombinationId, TripleKey};
use crate::store::{CombinationStore, Store, StoreResult, WordStore};
use crate::word::{IdAllocator, Word, WordId, WordRole};

/// Concurrent in-memory store using sharded hashmaps.
#[derive(Debug)]
pub struct MemStore {
    words: DashMap<WordId, Word>,
    combinations: DashMap<CombinationId, Combination>,
    /// Exact triple → combination id.
    triples: DashMap<TripleKey, CombinationId>,
    /// Verb → combination ids using it.
    by_verb: DashMap<WordId, Vec<CombinationId>>,
    word_ids: IdAllocator,
    combination_ids: IdAllocator,
    /// Serialises every mutation of the edge set so check-and-insert and
    /// bulk operations are atomic with respect to each other.
    writer: Mutex<()>,
}

impl MemStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self {
            words: DashMap::new(),
            combinations: DashMap::new(),
            triples: DashMap::new(),
            by_verb: DashMap::new(),
            word_ids: IdAllocator::new(),
            combination_ids: IdAllocator::new(),
            writer: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_combination_id(&self) -> StoreResult<CombinationId> {
        self.combination_ids
            .next_raw()
            .map(CombinationId::from)
            .ok_or(StoreError::IdsExhausted { kind: "combinations" })
    }

    /// Add a combination to all three indexes. Caller holds the writer lock
    /// and has checked the triple is free.
    fn attach(&self, combo: Combination) {
        self.triples.insert(combo.key(), combo.id);
        self.by_verb.entry(combo.verb).or_default().push(combo.id);
        self.combinations.insert(combo.id, combo);
    }

    /// Remove a combination from all three indexes. Caller holds the writer lock.
    fn detach(&self, id: CombinationId) -> Option<Combination> {
        let (_, combo) = self.combinations.remove(&id)?;
        self.triples.remove(&combo.key());
        if let Some(mut ids) = self.by_verb.get_mut(&combo.verb) {
            ids.retain(|c| *c != id);
        }
        self.by_verb.remove_if(&combo.verb, |_, ids| ids.is_empty());
        Some(combo)
    }

    fn duplicate(key: TripleKey) -> StoreError {
        StoreError::DuplicateTriple {
            subject: key.subject.get(),
            verb: key.verb.get(),
            object: key.object.get(),
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_by_id<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(key);
    items
}

impl WordStore for MemStore {
    fn word(&self, id: WordId) -> StoreResult<Option<Word>> {
        Ok(self.words.get(&id).map(|w| w.value().clone()))
    }

    fn words(&self, ids: &[WordId]) -> StoreResult<HashMap<WordId, Word>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.words.get(id).map(|w| (*id, w.value().clone())))
            .collect())
    }

    fn words_by_role(&self, role: WordRole) -> StoreResult<Vec<Word>> {
        let words = self
            .words
            .iter()
            .filter(|w| w.role == role)
            .map(|w| w.value().clone())
            .collect();
        Ok(sorted_by_id(words, |w: &Word| w.id))
    }

    fn all_words(&self) -> StoreResult<Vec<Word>> {
        let words = self.words.iter().map(|w| w.value().clone()).collect();
        Ok(sorted_by_id(words, |w: &Word| w.id))
    }

    fn insert_word(&self, text: &str, role: WordRole) -> StoreResult<Word> {
        let id = self
            .word_ids
            .next_raw()
            .map(WordId::from)
            .ok_or(StoreError::IdsExhausted { kind: "words" })?;
        let word = Word::new(id, text, role);
        self.words.insert(id, word.clone());
        Ok(word)
    }

    fn update_word(&self, word: &Word) -> StoreResult<bool> {
        match self.words.get_mut(&word.id) {
            Some(mut existing) => {
                *existing = word.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove_word(&self, id: WordId) -> StoreResult<Option<usize>> {
        let _guard = self.lock();
        if self.words.remove(&id).is_none() {
            return Ok(None);
        }
        let referencing: Vec<CombinationId> = self
            .combinations
            .iter()
            .filter(|c| c.references(id))
            .map(|c| c.id)
            .collect();
        let removed = referencing
            .into_iter()
            .filter_map(|cid| self.detach(cid))
            .count();
        Ok(Some(removed))
    }

    fn word_exists(&self, id: WordId) -> StoreResult<bool> {
        Ok(self.words.contains_key(&id))
    }
}

impl CombinationStore for MemStore {
    fn find_by_triple(&self, key: TripleKey) -> StoreResult<Option<Combination>> {
        let Some(id) = self.triples.get(&key).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.combinations.get(&id).map(|c| c.value().clone()))
    }

    fn find_by_verb(&self, verb: WordId) -> StoreResult<Vec<Combination>> {
        let ids = self
            .by_verb
            .get(&verb)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();
        let combos = ids
            .iter()
            .filter_map(|id| self.combinations.get(id).map(|c| c.value().clone()))
            .collect();
        Ok(sorted_by_id(combos, |c: &Combination| c.id))
    }

    fn all_combinations(&self) -> StoreResult<Vec<Combination>> {
        let combos = self.combinations.iter().map(|c| c.value().clone()).collect();
        Ok(sorted_by_id(combos, |c: &Combination| c.id))
    }

    fn count_referencing(&self, word: WordId) -> StoreResult<usize> {
        Ok(self
            .combinations
            .iter()
            .filter(|c| c.references(word))
            .count())
    }

    fn insert_combination(&self, key: TripleKey) -> StoreResult<Combination> {
        let _guard = self.lock();
        if self.triples.contains_key(&key) {
            return Err(Self::duplicate(key));
        }
        let combo = Combination::new(self.next_combination_id()?, key);
        self.attach(combo.clone());
        Ok(combo)
    }

    fn insert_combinations(&self, keys: &[TripleKey]) -> StoreResult<Vec<Combination>> {
        let _guard = self.lock();
        let mut seen = HashSet::with_capacity(keys.len());
        for key in keys {
            if self.triples.contains_key(key) || !seen.insert(*key) {
                return Err(Self::duplicate(*key));
            }
        }
        let mut created = Vec::with_capacity(keys.len());
        for key in keys {
            created.push(Combination::new(self.next_combination_id()?, *key));
        }
        for combo in &created {
            self.attach(combo.clone());
        }
        Ok(created)
    }

    fn remove_combination(&self, id: CombinationId) -> StoreResult<bool> {
        let _guard = self.lock();
        Ok(self.detach(id).is_some())
    }

    fn remove_by_verb(&self, verb: WordId) -> StoreResult<usize> {
        let _guard = self.lock();
        let Some((_, ids)) = self.by_verb.remove(&verb) else {
            return Ok(0);
        };
        let mut removed = 0;
        for id in ids {
            if let Some((_, combo)) = self.combinations.remove(&id) {
                self.triples.remove(&combo.key());
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn combination_exists(&self, id: CombinationId) -> StoreResult<bool> {
        Ok(self.combinations.contains_key(&id))
    }

    fn combination_count(&self) -> StoreResult<usize> {
        Ok(self.combinations.len())
    }
}

impl Store for MemStore {
    fn is_persistent(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (MemStore, WordId, WordId, WordId) {
        let store = MemStore::new();
        let s = store.insert_word("cat", WordRole::Subject).unwrap().id;
        let v = store.insert_word("eats", WordRole::Verb).unwrap().id;
        let o = store.insert_word("fish", WordRole::Object).unwrap().id;
        (store, s, v, o)
    }

    #[test]
    fn word_ids_are_sequential() {
        let (store, s, v, o) = seeded();
        assert_eq!((s.get(), v.get(), o.get()), (1, 2, 3));
        assert_eq!(store.all_words().unwrap().len(), 3);
        assert_eq!(store.words_by_role(WordRole::Verb).unwrap()[0].text, "eats");
    }

    #[test]
    fn triple_index_tracks_inserts_and_removals() {
        let (store, s, v, o) = seeded();
        let key = TripleKey::new(s, v, o);
        let combo = store.insert_combination(key).unwrap();
        assert_eq!(store.find_by_triple(key).unwrap().unwrap().id, combo.id);

        assert!(store.remove_combination(combo.id).unwrap());
        assert!(store.find_by_triple(key).unwrap().is_none());
        assert!(store.find_by_verb(v).unwrap().is_empty());

        // Freed triple can be inserted again.
        assert!(store.insert_combination(key).is_ok());
    }

    #[test]
    fn update_unknown_word_reports_false() {
        let store = MemStore::new();
        let ghost = Word::new(WordId::new(5).unwrap(), "ghost", WordRole::Subject);
        assert!(!store.update_word(&ghost).unwrap());
    }

    #[test]
    fn concurrent_duplicate_inserts_keep_one_edge() {
        use std::sync::Arc;
        let (store, s, v, o) = seeded();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.insert_combination(TripleKey::new(s, v, o)).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(store.combination_count().unwrap(), 1);
    }

    #[test]
    fn batch_with_internal_duplicate_inserts_nothing() {
        let (store, s, v, o) = seeded();
        let key = TripleKey::new(s, v, o);
        assert!(store.insert_combinations(&[key, key]).is_err());
        assert_eq!(store.combination_count().unwrap(), 0);
    }
}
