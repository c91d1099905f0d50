//! Engine facade: top-level API for the vnest-graph system.
//!
//! The `Engine` owns the store and provides the public interface for
//! managing words, creating and deleting allowed combinations, and
//! answering suggestion and validation queries. Fetch and persist
//! orchestration happens here; the decisions themselves are made by the
//! pure functions in [`crate::graph`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{
    CombinationError, ConfigError, InputError, StoreError, VnestResult, WordError,
};
use crate::graph::expand::{self, BatchOutcome};
use crate::graph::suggest::{self, Suggestions};
use crate::graph::validate::{self, Messages, Validation};
use crate::graph::{Combination, CombinationId, TripleKey};
use crate::store::{DurableStore, MemStore, Store};
use crate::word::{Word, WordId, WordRole};

/// Configuration for the vnest-graph engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Data directory for persistence. `None` for memory-only mode.
    pub data_dir: Option<PathBuf>,
    /// Texts used when rendering validation verdicts.
    pub messages: Messages,
}

/// The compatibility graph engine.
pub struct Engine {
    config: EngineConfig,
    store: Arc<dyn Store>,
}

impl Engine {
    /// Create a new engine with the given configuration.
    ///
    /// With a `data_dir` the engine opens (or creates) a redb database in it;
    /// without one everything lives in memory.
    pub fn new(config: EngineConfig) -> VnestResult<Self> {
        let store: Arc<dyn Store> = match config.data_dir {
            Some(ref dir) => {
                std::fs::create_dir_all(dir).map_err(|_| ConfigError::DataDir {
                    path: dir.display().to_string(),
                })?;
                Arc::new(DurableStore::open(dir)?)
            }
            None => Arc::new(MemStore::new()),
        };
        tracing::info!(
            persistent = store.is_persistent(),
            data_dir = ?config.data_dir,
            "initializing vnest engine"
        );
        Ok(Self { config, store })
    }

    /// Create an engine over an already-constructed store.
    pub fn with_store(config: EngineConfig, store: Arc<dyn Store>) -> Self {
        Self { config, store }
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the store handle.
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Whether data survives process exit.
    pub fn is_persistent(&self) -> bool {
        self.store.is_persistent()
    }

    // -----------------------------------------------------------------------
    // Words
    // -----------------------------------------------------------------------

    /// All words, or only those with `role`, ascending by id.
    pub fn list_words(&self, role: Option<WordRole>) -> VnestResult<Vec<Word>> {
        let words = match role {
            Some(role) => self.store.words_by_role(role)?,
            None => self.store.all_words()?,
        };
        tracing::debug!(role = ?role, count = words.len(), "listed words");
        Ok(words)
    }

    pub fn find_word(&self, id: WordId) -> VnestResult<Word> {
        Ok(self
            .store
            .word(id)?
            .ok_or(WordError::NotFound { id: id.get() })?)
    }

    /// Create a word. Surrounding whitespace is trimmed; blank text is rejected.
    pub fn create_word(&self, text: &str, role: WordRole) -> VnestResult<Word> {
        let text = non_blank(text)?;
        let word = self.store.insert_word(text, role)?;
        tracing::info!(id = %word.id, role = %role, text = %word.text, "created word");
        Ok(word)
    }

    /// Change a word's text and role.
    ///
    /// A role change is refused while any combination references the word,
    /// since those combinations were created under the old role.
    pub fn update_word(&self, id: WordId, text: &str, role: WordRole) -> VnestResult<Word> {
        let text = non_blank(text)?;
        let mut word = self.find_word(id)?;
        if word.role != role {
            let combinations = self.store.count_referencing(id)?;
            if combinations > 0 {
                return Err(WordError::RoleInUse {
                    id: id.get(),
                    from: word.role,
                    to: role,
                    combinations,
                }
                .into());
            }
        }
        word.revise(text, role);
        if !self.store.update_word(&word)? {
            return Err(WordError::NotFound { id: id.get() }.into());
        }
        tracing::info!(id = %id, role = %role, text = %word.text, "updated word");
        Ok(word)
    }

    /// Delete a word and every combination that references it.
    ///
    /// Returns the number of combinations removed with the word.
    pub fn delete_word(&self, id: WordId) -> VnestResult<usize> {
        let removed = self
            .store
            .remove_word(id)?
            .ok_or(WordError::NotFound { id: id.get() })?;
        tracing::info!(id = %id, cascaded = removed, "deleted word");
        Ok(removed)
    }

    /// Find a word with exactly this text and role, or create it.
    ///
    /// The flag is `true` when the word was created.
    pub fn ensure_word(&self, text: &str, role: WordRole) -> VnestResult<(Word, bool)> {
        let text = non_blank(text)?;
        if let Some(word) = self
            .store
            .words_by_role(role)?
            .into_iter()
            .find(|w| w.text == text)
        {
            return Ok((word, false));
        }
        Ok((self.create_word(text, role)?, true))
    }

    /// Batch lookup. Unknown ids are absent from the map.
    pub fn resolve_words(&self, ids: &[WordId]) -> VnestResult<HashMap<WordId, Word>> {
        Ok(self.store.words(ids)?)
    }

    // -----------------------------------------------------------------------
    // Combinations
    // -----------------------------------------------------------------------

    /// All combinations, or only those using `verb`, ascending by id.
    pub fn list_combinations(&self, verb: Option<WordId>) -> VnestResult<Vec<Combination>> {
        let combos = match verb {
            Some(verb) => self.store.find_by_verb(verb)?,
            None => self.store.all_combinations()?,
        };
        tracing::debug!(verb = ?verb.map(WordId::get), count = combos.len(), "listed combinations");
        Ok(combos)
    }

    /// Resolve a word for `role`, failing with a role-tagged `NotFound`.
    fn resolve_for(&self, role: WordRole, id: WordId) -> VnestResult<Word> {
        Ok(self.store.word(id)?.ok_or(CombinationError::NotFound {
            role,
            id: id.get(),
        })?)
    }

    /// Allow one subject/verb/object triple.
    ///
    /// Words are resolved in subject, verb, object order and the first
    /// missing one is reported. An existing triple fails with
    /// `AlreadyExists`, including when a concurrent writer inserts it first.
    pub fn create_combination(
        &self,
        subject: WordId,
        verb: WordId,
        object: WordId,
    ) -> VnestResult<Combination> {
        let s = self.resolve_for(WordRole::Subject, subject)?;
        let v = self.resolve_for(WordRole::Verb, verb)?;
        let o = self.resolve_for(WordRole::Object, object)?;

        let key = TripleKey::new(subject, verb, object);
        let already_exists = || CombinationError::AlreadyExists {
            subject: s.text.clone(),
            verb: v.text.clone(),
            object: o.text.clone(),
        };
        if self.store.find_by_triple(key)?.is_some() {
            return Err(already_exists().into());
        }

        let combo = match self.store.insert_combination(key) {
            Ok(combo) => combo,
            Err(StoreError::DuplicateTriple { .. }) => return Err(already_exists().into()),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(id = %combo.id, triple = %key, "created combination");
        Ok(combo)
    }

    /// Allow `verb` with every pair from `subjects` × `objects`.
    ///
    /// Subject and object ids that do not resolve are skipped and reported in
    /// the outcome; pairs already allowed are skipped and counted. All new
    /// combinations are inserted in one atomic write.
    pub fn create_batch(
        &self,
        verb: WordId,
        subjects: &[WordId],
        objects: &[WordId],
    ) -> VnestResult<BatchOutcome> {
        let verb_word = self.resolve_for(WordRole::Verb, verb)?;

        let ids: Vec<WordId> = subjects.iter().chain(objects).copied().collect();
        let resolved = self.store.words(&ids)?;
        let existing = expand::existing_pairs(&self.store.find_by_verb(verb)?);

        let plan = expand::plan_batch(verb, subjects, objects, &resolved, &existing);
        if !plan.skipped_subjects.is_empty() || !plan.skipped_objects.is_empty() {
            tracing::warn!(
                verb = %verb,
                skipped_subjects = ?plan.skipped_subjects,
                skipped_objects = ?plan.skipped_objects,
                "batch skipped unresolved word ids"
            );
        }

        let created = match self.store.insert_combinations(&plan.staged) {
            Ok(created) => created,
            Err(StoreError::DuplicateTriple {
                subject, object, ..
            }) => {
                let text = |raw: u64| {
                    WordId::new(raw)
                        .and_then(|id| resolved.get(&id))
                        .map(|w| w.text.clone())
                        .unwrap_or_else(|| raw.to_string())
                };
                return Err(CombinationError::AlreadyExists {
                    subject: text(subject),
                    verb: verb_word.text.clone(),
                    object: text(object),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            verb = %verb,
            created = created.len(),
            already_present = plan.already_present,
            "expanded batch"
        );
        Ok(BatchOutcome {
            created,
            skipped_subjects: plan.skipped_subjects,
            skipped_objects: plan.skipped_objects,
            already_present: plan.already_present,
        })
    }

    pub fn delete_combination(&self, id: CombinationId) -> VnestResult<()> {
        if !self.store.remove_combination(id)? {
            return Err(CombinationError::CombinationNotFound { id: id.get() }.into());
        }
        tracing::info!(id = %id, "deleted combination");
        Ok(())
    }

    /// Delete every combination using `verb`. The verb word must exist.
    pub fn delete_by_verb(&self, verb: WordId) -> VnestResult<usize> {
        if !self.store.word_exists(verb)? {
            return Err(CombinationError::NotFound {
                role: WordRole::Verb,
                id: verb.get(),
            }
            .into());
        }
        let removed = self.store.remove_by_verb(verb)?;
        tracing::info!(verb = %verb, removed, "deleted combinations by verb");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Verb-centric exercise data over all combinations.
    ///
    /// The per-verb lists are an over-approximation; see
    /// [`suggest`](crate::graph::suggest). `limit` is accepted for clients
    /// that send it but does not truncate the result.
    pub fn suggestions(&self, limit: Option<usize>) -> VnestResult<Suggestions> {
        let edges = self.store.all_combinations()?;
        let agg = suggest::aggregate(&edges);

        let mut ids = agg.verb_ids();
        ids.extend(agg.subject_ids());
        ids.extend(agg.object_ids());
        let words = self.store.words(&ids)?;

        let suggestions = suggest::assemble(&agg, &words);
        tracing::debug!(
            limit = ?limit,
            edges = edges.len(),
            verbs = suggestions.verbs.len(),
            "built suggestions"
        );
        Ok(suggestions)
    }

    /// Whether the triple is allowed, with the attempted sentence rendered.
    ///
    /// Missing words never cause an error; they render as placeholders.
    pub fn validate(
        &self,
        subject: WordId,
        verb: WordId,
        object: WordId,
    ) -> VnestResult<Validation> {
        let allowed = self
            .store
            .find_by_triple(TripleKey::new(subject, verb, object))?
            .is_some();
        let words = self.store.words(&[subject, verb, object])?;
        let result = validate::verdict(
            allowed,
            words.get(&subject),
            words.get(&verb),
            words.get(&object),
            &self.config.messages,
        );
        tracing::debug!(valid = result.valid, sentence = %result.sentence, "validated sentence");
        Ok(result)
    }

    /// Get system info (word counts per role, combination count).
    pub fn info(&self) -> VnestResult<EngineInfo> {
        Ok(EngineInfo {
            subjects: self.store.words_by_role(WordRole::Subject)?.len(),
            verbs: self.store.words_by_role(WordRole::Verb)?.len(),
            objects: self.store.words_by_role(WordRole::Object)?.len(),
            combinations: self.store.combination_count()?,
            persistent: self.store.is_persistent(),
        })
    }
}

fn non_blank(text: &str) -> Result<&str, InputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InputError::field("text", "Word text is required"));
    }
    Ok(trimmed)
}

/// Summary information about the engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInfo {
    pub subjects: usize,
    pub verbs: usize,
    pub objects: usize,
    pub combinations: usize,
    pub persistent: bool,
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "vnest engine info")?;
        writeln!(f, "  subjects:     {}", self.subjects)?;
        writeln!(f, "  verbs:        {}", self.verbs)?;
        writeln!(f, "  objects:      {}", self.objects)?;
        writeln!(f, "  combinations: {}", self.combinations)?;
        writeln!(f, "  persistent:   {}", self.persistent)?;
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VnestError;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default()).unwrap()
    }

    /// cat(1) eats(2) fish(3), plus dog(4) and mouse(5).
    fn seeded() -> (Engine, WordId, WordId, WordId, WordId, WordId) {
        let e = engine();
        let cat = e.create_word("cat", WordRole::Subject).unwrap().id;
        let eats = e.create_word("eats", WordRole::Verb).unwrap().id;
        let fish = e.create_word("fish", WordRole::Object).unwrap().id;
        let dog = e.create_word("dog", WordRole::Subject).unwrap().id;
        let mouse = e.create_word("mouse", WordRole::Object).unwrap().id;
        (e, cat, eats, fish, dog, mouse)
    }

    fn w(raw: u64) -> WordId {
        WordId::new(raw).unwrap()
    }

    #[test]
    fn create_memory_only_engine() {
        let info = engine().info().unwrap();
        assert!(!info.persistent);
        assert_eq!(info.combinations, 0);
    }

    #[test]
    fn engine_with_persistence() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = Engine::new(EngineConfig {
            data_dir: Some(dir.path().join("data")),
            ..Default::default()
        })
        .unwrap();
        assert!(engine.info().unwrap().persistent);
    }

    #[test]
    fn duplicate_create_fails_and_count_is_unchanged() {
        let (e, cat, eats, fish, _, _) = seeded();
        e.create_combination(cat, eats, fish).unwrap();
        let err = e.create_combination(cat, eats, fish).unwrap_err();
        assert!(matches!(
            err,
            VnestError::Combination(CombinationError::AlreadyExists { ref subject, .. }) if subject == "cat"
        ));
        assert_eq!(e.info().unwrap().combinations, 1);
    }

    #[test]
    fn first_missing_role_is_reported() {
        let (e, cat, eats, _, _, _) = seeded();
        let err = e.create_combination(w(99), w(98), w(97)).unwrap_err();
        assert!(matches!(
            err,
            VnestError::Combination(CombinationError::NotFound { role: WordRole::Subject, id: 99 })
        ));
        let err = e.create_combination(cat, eats, w(97)).unwrap_err();
        assert!(matches!(
            err,
            VnestError::Combination(CombinationError::NotFound { role: WordRole::Object, id: 97 })
        ));
        assert_eq!(e.info().unwrap().combinations, 0);
    }

    #[test]
    fn batch_creates_full_product() {
        let (e, cat, eats, fish, dog, mouse) = seeded();
        let outcome = e.create_batch(eats, &[cat, dog], &[fish, mouse]).unwrap();
        let keys: Vec<_> = outcome.created.iter().map(Combination::key).collect();
        assert_eq!(
            keys,
            vec![
                TripleKey::new(cat, eats, fish),
                TripleKey::new(cat, eats, mouse),
                TripleKey::new(dog, eats, fish),
                TripleKey::new(dog, eats, mouse),
            ]
        );
    }

    #[test]
    fn batch_is_idempotent() {
        let (e, cat, eats, fish, dog, mouse) = seeded();
        e.create_batch(eats, &[cat, dog], &[fish, mouse]).unwrap();
        let again = e.create_batch(eats, &[cat, dog], &[fish, mouse]).unwrap();
        assert_eq!(again.created_count(), 0);
        assert_eq!(again.already_present, 4);
        assert_eq!(e.info().unwrap().combinations, 4);
    }

    #[test]
    fn batch_skips_existing_triple() {
        let (e, cat, eats, fish, dog, mouse) = seeded();
        e.create_combination(cat, eats, fish).unwrap();
        let outcome = e.create_batch(eats, &[cat, dog], &[fish, mouse]).unwrap();
        assert_eq!(outcome.created_count(), 3);
        assert!(
            outcome
                .created
                .iter()
                .all(|c| c.key() != TripleKey::new(cat, eats, fish))
        );
    }

    #[test]
    fn batch_reports_unresolved_ids() {
        let (e, cat, eats, fish, _, _) = seeded();
        let outcome = e.create_batch(eats, &[cat, w(77)], &[fish, w(78)]).unwrap();
        assert_eq!(outcome.created_count(), 1);
        assert_eq!(outcome.skipped_subjects, vec![w(77)]);
        assert_eq!(outcome.skipped_objects, vec![w(78)]);
    }

    #[test]
    fn batch_with_missing_verb_fails() {
        let (e, cat, _, fish, _, _) = seeded();
        let err = e.create_batch(w(50), &[cat], &[fish]).unwrap_err();
        assert!(matches!(
            err,
            VnestError::Combination(CombinationError::NotFound { role: WordRole::Verb, id: 50 })
        ));
    }

    #[test]
    fn suggestions_do_not_imply_validity() {
        let (e, cat, eats, fish, dog, mouse) = seeded();
        e.create_combination(cat, eats, fish).unwrap();
        e.create_combination(dog, eats, mouse).unwrap();

        let s = e.suggestions(None).unwrap();
        assert_eq!(s.verbs.len(), 1);
        assert_eq!(s.verbs[0].compatible_subject_ids, vec![cat.get(), dog.get()]);
        assert_eq!(s.verbs[0].compatible_object_ids, vec![fish.get(), mouse.get()]);
        assert_eq!(s.subjects.len(), 2);
        assert_eq!(s.objects.len(), 2);

        assert!(!e.validate(cat, eats, mouse).unwrap().valid);
        assert!(e.validate(cat, eats, fish).unwrap().valid);
    }

    #[test]
    fn validation_rendering() {
        let (e, cat, eats, fish, _, _) = seeded();
        let absent = e.validate(cat, eats, fish).unwrap();
        assert!(!absent.valid);
        assert_eq!(absent.sentence, "cat eats fish");
        assert_eq!(absent.message, Messages::default().rejection);

        e.create_combination(cat, eats, fish).unwrap();
        let present = e.validate(cat, eats, fish).unwrap();
        assert!(present.valid);
        assert_eq!(present.sentence, "cat eats fish");
        assert_eq!(present.message, Messages::default().affirmation);

        let unknown = e.validate(w(404), eats, fish).unwrap();
        assert!(!unknown.valid);
        assert!(unknown.sentence.contains("[Unknown Subject]"));
    }

    #[test]
    fn delete_by_verb_requires_existing_verb() {
        let (e, _, eats, _, _, _) = seeded();
        assert_eq!(e.delete_by_verb(eats).unwrap(), 0);
        let err = e.delete_by_verb(w(123)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn delete_combination_unknown_id_is_not_found() {
        let (e, cat, eats, fish, _, _) = seeded();
        let combo = e.create_combination(cat, eats, fish).unwrap();
        e.delete_combination(combo.id).unwrap();
        let err = e.delete_combination(combo.id).unwrap_err();
        assert!(matches!(
            err,
            VnestError::Combination(CombinationError::CombinationNotFound { .. })
        ));
    }

    #[test]
    fn role_change_rejected_while_in_use() {
        let (e, cat, eats, fish, _, _) = seeded();
        e.create_combination(cat, eats, fish).unwrap();
        let err = e.update_word(cat, "cat", WordRole::Object).unwrap_err();
        assert!(matches!(err, VnestError::Word(WordError::RoleInUse { combinations: 1, .. })));

        let renamed = e.update_word(cat, "  kitten ", WordRole::Subject).unwrap();
        assert_eq!(renamed.text, "kitten");
        assert_eq!(e.validate(cat, eats, fish).unwrap().sentence, "kitten eats fish");
    }

    #[test]
    fn role_change_allowed_when_unused() {
        let (e, _, _, _, dog, _) = seeded();
        let word = e.update_word(dog, "dog", WordRole::Object).unwrap();
        assert_eq!(word.role, WordRole::Object);
    }

    #[test]
    fn blank_text_rejected() {
        let err = engine().create_word("   ", WordRole::Verb).unwrap_err();
        assert!(matches!(err, VnestError::Input(_)));
    }

    #[test]
    fn delete_word_cascades() {
        let (e, cat, eats, fish, dog, _) = seeded();
        e.create_batch(eats, &[cat, dog], &[fish]).unwrap();
        assert_eq!(e.delete_word(fish).unwrap(), 2);
        assert_eq!(e.info().unwrap().combinations, 0);
        assert!(e.find_word(fish).unwrap_err().is_not_found());
    }

    #[test]
    fn ensure_word_reuses_existing() {
        let (e, cat, _, _, _, _) = seeded();
        let (word, created) = e.ensure_word("cat", WordRole::Subject).unwrap();
        assert_eq!(word.id, cat);
        assert!(!created);
        let (_, created) = e.ensure_word("cat", WordRole::Object).unwrap();
        assert!(created);
    }

    #[test]
    fn info_counts_roles() {
        let (e, _, _, _, _, _) = seeded();
        let info = e.info().unwrap();
        assert_eq!((info.subjects, info.verbs, info.objects), (2, 1, 2));
        assert!(info.to_string().contains("combinations: 0"));
    }
}
