//! ACID-durable store backed by redb.
//!
//! Every mutation runs in a single write transaction, so the triple
//! uniqueness check and the insert it guards cannot interleave with another
//! writer, and bulk operations are all or nothing.
//!
//! Tables:
//!
//! - `words`: word id → bincode [`Word`]
//! - `combinations`: combination id → bincode [`Combination`]
//! - `triples`: `(verb, subject, object)` → combination id. Keys lead with the
//!   verb so a range scan doubles as the verb index.
//! - `meta`: id high-water marks

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadTransaction, ReadableTable, ReadableTableMetadata, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::graph::{Combination, CombinationId, TripleKey};
use crate::store::{CombinationStore, Store, StoreResult, WordStore};
use crate::word::{Word, WordId, WordRole};

const WORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("words");
const COMBINATIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("combinations");
const TRIPLES: TableDefinition<(u64, u64, u64), u64> = TableDefinition::new("triples");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_WORD_ID: &str = "next_word_id";
const NEXT_COMBINATION_ID: &str = "next_combination_id";

/// Database file name inside the data directory.
pub const DB_FILE: &str = "vnest.redb";

/// ACID-durable store using redb.
///
/// All writes go through transactions. Reads use MVCC snapshots.
pub struct DurableStore {
    db: Arc<Database>,
}

fn redb_err<E: std::fmt::Display>(op: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Redb {
        message: format!("{op} failed: {e}"),
    }
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization {
        message: format!("failed to encode record: {e}"),
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: format!("failed to decode record: {e}"),
    })
}

fn triple_row(key: TripleKey) -> (u64, u64, u64) {
    (key.verb.get(), key.subject.get(), key.object.get())
}

fn duplicate(key: TripleKey) -> StoreError {
    StoreError::DuplicateTriple {
        subject: key.subject.get(),
        verb: key.verb.get(),
        object: key.object.get(),
    }
}

/// Take the next id from the `meta` counter named `counter`.
fn allocate(txn: &WriteTransaction, counter: &'static str) -> StoreResult<NonZeroU64> {
    let mut meta = txn.open_table(META).map_err(redb_err("open_table"))?;
    let next = meta
        .get(counter)
        .map_err(redb_err("get"))?
        .map(|g| g.value())
        .unwrap_or(1);
    let id = NonZeroU64::new(next).ok_or(StoreError::IdsExhausted { kind: counter })?;
    let following = next
        .checked_add(1)
        .ok_or(StoreError::IdsExhausted { kind: counter })?;
    meta.insert(counter, following).map_err(redb_err("insert"))?;
    Ok(id)
}

/// Read every row of a bincode-valued table.
fn scan<T: DeserializeOwned>(
    txn: &ReadTransaction,
    def: TableDefinition<'static, u64, &'static [u8]>,
) -> StoreResult<Vec<T>> {
    let table = txn.open_table(def).map_err(redb_err("open_table"))?;
    let mut out = Vec::new();
    for entry in table.iter().map_err(redb_err("iter"))? {
        let (_, value) = entry.map_err(redb_err("iter"))?;
        out.push(decode(value.value())?);
    }
    Ok(out)
}

fn insert_in(txn: &WriteTransaction, key: TripleKey) -> StoreResult<Combination> {
    let mut triples = txn.open_table(TRIPLES).map_err(redb_err("open_table"))?;
    if triples.get(triple_row(key)).map_err(redb_err("get"))?.is_some() {
        return Err(duplicate(key));
    }
    let id = CombinationId::from(allocate(txn, NEXT_COMBINATION_ID)?);
    let combo = Combination::new(id, key);
    triples
        .insert(triple_row(key), id.get())
        .map_err(redb_err("insert"))?;
    let mut combos = txn.open_table(COMBINATIONS).map_err(redb_err("open_table"))?;
    combos
        .insert(id.get(), encode(&combo)?.as_slice())
        .map_err(redb_err("insert"))?;
    Ok(combo)
}

/// Remove the given combinations from both edge tables.
fn remove_in(txn: &WriteTransaction, victims: &[Combination]) -> StoreResult<()> {
    let mut triples = txn.open_table(TRIPLES).map_err(redb_err("open_table"))?;
    let mut combos = txn.open_table(COMBINATIONS).map_err(redb_err("open_table"))?;
    for combo in victims {
        triples
            .remove(triple_row(combo.key()))
            .map_err(redb_err("remove"))?;
        combos.remove(combo.id.get()).map_err(redb_err("remove"))?;
    }
    Ok(())
}

impl DurableStore {
    /// Open or create a durable store in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join(DB_FILE);
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;
        let store = Self { db: Arc::new(db) };
        // Create every table up front so read transactions never miss one.
        store.write(|txn| {
            txn.open_table(WORDS).map_err(redb_err("open_table"))?;
            txn.open_table(COMBINATIONS).map_err(redb_err("open_table"))?;
            txn.open_table(TRIPLES).map_err(redb_err("open_table"))?;
            txn.open_table(META).map_err(redb_err("open_table"))?;
            Ok(())
        })?;
        tracing::debug!(path = %db_path.display(), "opened durable store");
        Ok(store)
    }

    /// Run `f` inside a write transaction, committing only if it succeeds.
    fn write<T>(&self, f: impl FnOnce(&WriteTransaction) -> StoreResult<T>) -> StoreResult<T> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        let out = f(&txn)?;
        txn.commit().map_err(redb_err("commit"))?;
        Ok(out)
    }

    fn read<T>(&self, f: impl FnOnce(&ReadTransaction) -> StoreResult<T>) -> StoreResult<T> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        f(&txn)
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore").finish()
    }
}

impl WordStore for DurableStore {
    fn word(&self, id: WordId) -> StoreResult<Option<Word>> {
        self.read(|txn| {
            let table = txn.open_table(WORDS).map_err(redb_err("open_table"))?;
            let row = table.get(id.get()).map_err(redb_err("get"))?;
            row.map(|g| decode(g.value())).transpose()
        })
    }

    fn words(&self, ids: &[WordId]) -> StoreResult<HashMap<WordId, Word>> {
        self.read(|txn| {
            let table = txn.open_table(WORDS).map_err(redb_err("open_table"))?;
            let mut found = HashMap::with_capacity(ids.len());
            for id in ids {
                if let Some(row) = table.get(id.get()).map_err(redb_err("get"))? {
                    found.insert(*id, decode(row.value())?);
                }
            }
            Ok(found)
        })
    }

    fn words_by_role(&self, role: WordRole) -> StoreResult<Vec<Word>> {
        let mut words = self.all_words()?;
        words.retain(|w| w.role == role);
        Ok(words)
    }

    fn all_words(&self) -> StoreResult<Vec<Word>> {
        self.read(|txn| scan(txn, WORDS))
    }

    fn insert_word(&self, text: &str, role: WordRole) -> StoreResult<Word> {
        self.write(|txn| {
            let id = WordId::from(allocate(txn, NEXT_WORD_ID)?);
            let word = Word::new(id, text, role);
            let mut table = txn.open_table(WORDS).map_err(redb_err("open_table"))?;
            table
                .insert(id.get(), encode(&word)?.as_slice())
                .map_err(redb_err("insert"))?;
            Ok(word)
        })
    }

    fn update_word(&self, word: &Word) -> StoreResult<bool> {
        self.write(|txn| {
            let mut table = txn.open_table(WORDS).map_err(redb_err("open_table"))?;
            let exists = table.get(word.id.get()).map_err(redb_err("get"))?.is_some();
            if exists {
                table
                    .insert(word.id.get(), encode(word)?.as_slice())
                    .map_err(redb_err("insert"))?;
            }
            Ok(exists)
        })
    }

    fn remove_word(&self, id: WordId) -> StoreResult<Option<usize>> {
        self.write(|txn| {
            {
                let mut words = txn.open_table(WORDS).map_err(redb_err("open_table"))?;
                if words.remove(id.get()).map_err(redb_err("remove"))?.is_none() {
                    return Ok(None);
                }
            }
            let victims: Vec<Combination> = {
                let combos = txn.open_table(COMBINATIONS).map_err(redb_err("open_table"))?;
                let mut victims = Vec::new();
                for entry in combos.iter().map_err(redb_err("iter"))? {
                    let (_, value) = entry.map_err(redb_err("iter"))?;
                    let combo: Combination = decode(value.value())?;
                    if combo.references(id) {
                        victims.push(combo);
                    }
                }
                victims
            };
            remove_in(txn, &victims)?;
            Ok(Some(victims.len()))
        })
    }

    fn word_exists(&self, id: WordId) -> StoreResult<bool> {
        self.read(|txn| {
            let table = txn.open_table(WORDS).map_err(redb_err("open_table"))?;
            Ok(table.get(id.get()).map_err(redb_err("get"))?.is_some())
        })
    }
}

impl CombinationStore for DurableStore {
    fn find_by_triple(&self, key: TripleKey) -> StoreResult<Option<Combination>> {
        self.read(|txn| {
            let triples = txn.open_table(TRIPLES).map_err(redb_err("open_table"))?;
            let Some(id) = triples
                .get(triple_row(key))
                .map_err(redb_err("get"))?
                .map(|g| g.value())
            else {
                return Ok(None);
            };
            let combos = txn.open_table(COMBINATIONS).map_err(redb_err("open_table"))?;
            let row = combos.get(id).map_err(redb_err("get"))?;
            row.map(|g| decode(g.value())).transpose()
        })
    }

    fn find_by_verb(&self, verb: WordId) -> StoreResult<Vec<Combination>> {
        self.read(|txn| {
            let triples = txn.open_table(TRIPLES).map_err(redb_err("open_table"))?;
            let combos = txn.open_table(COMBINATIONS).map_err(redb_err("open_table"))?;
            let v = verb.get();
            let mut out = Vec::new();
            for entry in triples
                .range((v, 0u64, 0u64)..=(v, u64::MAX, u64::MAX))
                .map_err(redb_err("range"))?
            {
                let (_, id) = entry.map_err(redb_err("range"))?;
                if let Some(row) = combos.get(id.value()).map_err(redb_err("get"))? {
                    out.push(decode::<Combination>(row.value())?);
                }
            }
            out.sort_by_key(|c| c.id);
            Ok(out)
        })
    }

    fn all_combinations(&self) -> StoreResult<Vec<Combination>> {
        self.read(|txn| scan(txn, COMBINATIONS))
    }

    fn count_referencing(&self, word: WordId) -> StoreResult<usize> {
        Ok(self
            .all_combinations()?
            .iter()
            .filter(|c| c.references(word))
            .count())
    }

    fn insert_combination(&self, key: TripleKey) -> StoreResult<Combination> {
        self.write(|txn| insert_in(txn, key))
    }

    fn insert_combinations(&self, keys: &[TripleKey]) -> StoreResult<Vec<Combination>> {
        // A failure on any key aborts the transaction and discards the rest.
        self.write(|txn| keys.iter().map(|key| insert_in(txn, *key)).collect())
    }

    fn remove_combination(&self, id: CombinationId) -> StoreResult<bool> {
        self.write(|txn| {
            let combo: Option<Combination> = {
                let combos = txn.open_table(COMBINATIONS).map_err(redb_err("open_table"))?;
                let row = combos.get(id.get()).map_err(redb_err("get"))?;
                row.map(|g| decode(g.value())).transpose()?
            };
            match combo {
                Some(combo) => {
                    remove_in(txn, std::slice::from_ref(&combo))?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn remove_by_verb(&self, verb: WordId) -> StoreResult<usize> {
        self.write(|txn| {
            let v = verb.get();
            let victims: Vec<Combination> = {
                let triples = txn.open_table(TRIPLES).map_err(redb_err("open_table"))?;
                let combos = txn.open_table(COMBINATIONS).map_err(redb_err("open_table"))?;
                let mut victims = Vec::new();
                for entry in triples
                    .range((v, 0u64, 0u64)..=(v, u64::MAX, u64::MAX))
                    .map_err(redb_err("range"))?
                {
                    let (_, id) = entry.map_err(redb_err("range"))?;
                    if let Some(row) = combos.get(id.value()).map_err(redb_err("get"))? {
                        victims.push(decode(row.value())?);
                    }
                }
                victims
            };
            remove_in(txn, &victims)?;
            Ok(victims.len())
        })
    }

    fn combination_exists(&self, id: CombinationId) -> StoreResult<bool> {
        self.read(|txn| {
            let table = txn.open_table(COMBINATIONS).map_err(redb_err("open_table"))?;
            Ok(table.get(id.get()).map_err(redb_err("get"))?.is_some())
        })
    }

    fn combination_count(&self) -> StoreResult<usize> {
        self.read(|txn| {
            let table = txn.open_table(COMBINATIONS).map_err(redb_err("open_table"))?;
            let len = table.len().map_err(redb_err("len"))?;
            Ok(len as usize)
        })
    }
}

impl Store for DurableStore {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn words_persist_across_reopens() {
        let dir = TempDir::new().unwrap();
        let id = {
            let store = DurableStore::open(dir.path()).unwrap();
            store.insert_word("kissa", WordRole::Subject).unwrap().id
        };

        let store = DurableStore::open(dir.path()).unwrap();
        let word = store.word(id).unwrap().unwrap();
        assert_eq!(word.text, "kissa");
        assert_eq!(word.role, WordRole::Subject);

        // Allocator resumes after the persisted high-water mark.
        let next = store.insert_word("koira", WordRole::Subject).unwrap();
        assert!(next.id > id);
    }

    #[test]
    fn triple_index_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let key = {
            let store = DurableStore::open(dir.path()).unwrap();
            let s = store.insert_word("cat", WordRole::Subject).unwrap().id;
            let v = store.insert_word("eats", WordRole::Verb).unwrap().id;
            let o = store.insert_word("fish", WordRole::Object).unwrap().id;
            let key = TripleKey::new(s, v, o);
            store.insert_combination(key).unwrap();
            key
        };

        let store = DurableStore::open(dir.path()).unwrap();
        assert!(store.find_by_triple(key).unwrap().is_some());
        assert!(matches!(
            store.insert_combination(key),
            Err(StoreError::DuplicateTriple { .. })
        ));
        assert_eq!(store.combination_count().unwrap(), 1);
    }

    #[test]
    fn verb_range_does_not_leak_neighbours() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();
        let s = store.insert_word("cat", WordRole::Subject).unwrap().id;
        let v1 = store.insert_word("eats", WordRole::Verb).unwrap().id;
        let v2 = store.insert_word("sees", WordRole::Verb).unwrap().id;
        let o = store.insert_word("fish", WordRole::Object).unwrap().id;
        store.insert_combination(TripleKey::new(s, v1, o)).unwrap();
        store.insert_combination(TripleKey::new(s, v2, o)).unwrap();

        let eats = store.find_by_verb(v1).unwrap();
        assert_eq!(eats.len(), 1);
        assert_eq!(eats[0].verb, v1);

        assert_eq!(store.remove_by_verb(v1).unwrap(), 1);
        assert_eq!(store.find_by_verb(v2).unwrap().len(), 1);
    }

    #[test]
    fn failed_batch_leaves_no_trace() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();
        let s = store.insert_word("cat", WordRole::Subject).unwrap().id;
        let v = store.insert_word("eats", WordRole::Verb).unwrap().id;
        let o1 = store.insert_word("fish", WordRole::Object).unwrap().id;
        let o2 = store.insert_word("milk", WordRole::Object).unwrap().id;
        store.insert_combination(TripleKey::new(s, v, o1)).unwrap();

        let result = store.insert_combinations(&[
            TripleKey::new(s, v, o2),
            TripleKey::new(s, v, o1),
        ]);
        assert!(result.is_err());
        assert!(store.find_by_triple(TripleKey::new(s, v, o2)).unwrap().is_none());
        assert_eq!(store.combination_count().unwrap(), 1);
    }
}
