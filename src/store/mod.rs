//! Storage backends for words and allowed combinations.
//!
//! The engine only talks to storage through two traits:
//!
//! - [`WordStore`]: the word arena: point lookup, batch lookup, lookup by role
//! - [`CombinationStore`]: the edge set: exact-triple lookup, verb-scoped
//!   lookup, insertion, deletion by id and bulk deletion by verb
//!
//! Two backends implement both:
//!
//! - [`MemStore`](mem::MemStore): concurrent hashmaps (DashMap), lost on exit
//! - [`DurableStore`](durable::DurableStore): ACID transactions (redb)
//!
//! Both enforce the triple uniqueness constraint themselves, so a racing
//! duplicate insert surfaces as [`StoreError::DuplicateTriple`] instead of a
//! second edge.

pub mod durable;
pub mod mem;

use std::collections::HashMap;

use crate::error::StoreError;
use crate::graph::{Combination, CombinationId, TripleKey};
use crate::word::{Word, WordId, WordRole};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The word arena.
pub trait WordStore {
    /// Point lookup. `Ok(None)` when the id is unknown.
    fn word(&self, id: WordId) -> StoreResult<Option<Word>>;

    /// Batch lookup in one round trip. Unknown ids are simply absent from the map.
    fn words(&self, ids: &[WordId]) -> StoreResult<HashMap<WordId, Word>>;

    /// All words with the given role, ascending by id.
    fn words_by_role(&self, role: WordRole) -> StoreResult<Vec<Word>>;

    /// All words, ascending by id.
    fn all_words(&self) -> StoreResult<Vec<Word>>;

    /// Allocate an id and store a new word.
    fn insert_word(&self, text: &str, role: WordRole) -> StoreResult<Word>;

    /// Overwrite an existing word record. Returns `false` if the id is unknown.
    fn update_word(&self, word: &Word) -> StoreResult<bool>;

    /// Remove a word and, atomically, every combination referencing it.
    ///
    /// Returns `None` if the word did not exist, otherwise the number of
    /// combinations removed along with it.
    fn remove_word(&self, id: WordId) -> StoreResult<Option<usize>>;

    fn word_exists(&self, id: WordId) -> StoreResult<bool> {
        Ok(self.word(id)?.is_some())
    }
}

/// The edge set.
pub trait CombinationStore {
    /// Exact-triple lookup.
    fn find_by_triple(&self, key: TripleKey) -> StoreResult<Option<Combination>>;

    /// All combinations sharing a verb, ascending by id.
    fn find_by_verb(&self, verb: WordId) -> StoreResult<Vec<Combination>>;

    /// All combinations, ascending by id.
    fn all_combinations(&self) -> StoreResult<Vec<Combination>>;

    /// Number of combinations referencing `word` in any position.
    fn count_referencing(&self, word: WordId) -> StoreResult<usize>;

    /// Insert one combination.
    ///
    /// Fails with [`StoreError::DuplicateTriple`] if the triple is already stored.
    fn insert_combination(&self, key: TripleKey) -> StoreResult<Combination>;

    /// Insert many combinations, all or nothing.
    ///
    /// Fails with [`StoreError::DuplicateTriple`] (and inserts nothing) if any
    /// key is already stored or appears twice in `keys`.
    fn insert_combinations(&self, keys: &[TripleKey]) -> StoreResult<Vec<Combination>>;

    /// Remove one combination. Returns `false` if the id is unknown.
    fn remove_combination(&self, id: CombinationId) -> StoreResult<bool>;

    /// Remove every combination with the given verb, atomically. Returns the count.
    fn remove_by_verb(&self, verb: WordId) -> StoreResult<usize>;

    fn combination_exists(&self, id: CombinationId) -> StoreResult<bool>;

    fn combination_count(&self) -> StoreResult<usize>;
}

/// A complete backend usable by the engine.
pub trait Store: WordStore + CombinationStore + Send + Sync + std::fmt::Debug {
    /// Whether data survives process exit.
    fn is_persistent(&self) -> bool;
}

pub use durable::DurableStore;
pub use mem::MemStore;

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise_contract(store: &dyn Store) {
        let cat = store.insert_word("cat", WordRole::Subject).unwrap();
        let eats = store.insert_word("eats", WordRole::Verb).unwrap();
        let fish = store.insert_word("fish", WordRole::Object).unwrap();
        let mouse = store.insert_word("mouse", WordRole::Object).unwrap();

        let first = store
            .insert_combination(TripleKey::new(cat.id, eats.id, fish.id))
            .unwrap();
        assert!(store.combination_exists(first.id).unwrap());

        let dup = store.insert_combination(TripleKey::new(cat.id, eats.id, fish.id));
        assert!(matches!(dup, Err(StoreError::DuplicateTriple { .. })));
        assert_eq!(store.combination_count().unwrap(), 1);

        let batch = store.insert_combinations(&[
            TripleKey::new(cat.id, eats.id, mouse.id),
            TripleKey::new(cat.id, eats.id, fish.id),
        ]);
        assert!(batch.is_err());
        assert_eq!(store.combination_count().unwrap(), 1);

        let batch = store
            .insert_combinations(&[TripleKey::new(cat.id, eats.id, mouse.id)])
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(store.find_by_verb(eats.id).unwrap().len(), 2);
        assert_eq!(store.count_referencing(cat.id).unwrap(), 2);

        let found = store.words(&[cat.id, fish.id, WordId::new(999).unwrap()]).unwrap();
        assert_eq!(found.len(), 2);

        assert_eq!(store.remove_word(mouse.id).unwrap(), Some(1));
        assert_eq!(store.combination_count().unwrap(), 1);
        assert_eq!(store.remove_word(mouse.id).unwrap(), None);

        assert_eq!(store.remove_by_verb(eats.id).unwrap(), 1);
        assert!(store.all_combinations().unwrap().is_empty());
        assert!(!store.remove_combination(first.id).unwrap());
    }

    #[test]
    fn mem_store_honours_contract() {
        exercise_contract(&MemStore::new());
    }

    #[test]
    fn durable_store_honours_contract() {
        let dir = tempfile::TempDir::new().unwrap();
        exercise_contract(&DurableStore::open(dir.path()).unwrap());
    }
}
