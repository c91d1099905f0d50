//! Request and response shapes for the HTTP boundary.
//!
//! Everything here is plain serde data so the CLI, the server and tests can
//! share it without pulling in the web stack. Requests carry optional fields
//! and are checked by `validate()`, which reports every offending field at
//! once as [`InputError::InvalidInput`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::{CombinationError, InputError, StoreError, VnestError, VnestResult, WordError};
use crate::graph::expand::BatchOutcome;
use crate::graph::validate::{Messages, render_sentence};
use crate::graph::{Combination, TripleKey};
use crate::word::{Word, WordId, WordReference, WordRole};

/// `{ "success": bool, "data": ... }` envelope used by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }

    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// Failure envelope: the field list for invalid input, the message otherwise.
    pub fn failure(err: &VnestError) -> Self {
        let data = match err {
            VnestError::Input(InputError::InvalidInput { errors }) => serde_json::json!(errors),
            other => serde_json::Value::String(other.to_string()),
        };
        Self {
            success: false,
            data: Some(data),
        }
    }
}

/// HTTP status for an engine failure.
pub fn status_code(err: &VnestError) -> u16 {
    match err {
        VnestError::Word(WordError::NotFound { .. })
        | VnestError::Combination(
            CombinationError::NotFound { .. } | CombinationError::CombinationNotFound { .. },
        ) => 404,
        VnestError::Combination(CombinationError::AlreadyExists { .. })
        | VnestError::Store(StoreError::DuplicateTriple { .. }) => 409,
        VnestError::Input(_) | VnestError::Word(WordError::RoleInUse { .. } | WordError::InvalidRole { .. }) => 400,
        VnestError::Store(_) | VnestError::Config(_) => 500,
    }
}

// ── Request validation helpers ───────────────────────────────────────────

/// Collects `field: message` entries while checking a request.
#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn push(&mut self, field: &str, message: &str) {
        self.0.push(format!("{field}: {message}"));
    }

    /// Check a required id: present and non-zero.
    fn id(&mut self, field: &str, raw: Option<u64>, missing: &str) -> Option<WordId> {
        match raw {
            None => {
                self.push(field, missing);
                None
            }
            Some(raw) => {
                let id = WordId::new(raw);
                if id.is_none() {
                    self.push(field, "IDs start at 1");
                }
                id
            }
        }
    }

    /// Check a required non-empty id list.
    fn ids(&mut self, field: &str, raw: Option<&[u64]>, missing: &str) -> Vec<WordId> {
        match raw {
            None | Some([]) => {
                self.push(field, missing);
                Vec::new()
            }
            Some(raw) => {
                if raw.contains(&0) {
                    self.push(field, "IDs start at 1");
                }
                raw.iter().filter_map(|r| WordId::new(*r)).collect()
            }
        }
    }

    fn finish(self) -> Result<(), InputError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(InputError::InvalidInput { errors: self.0 })
        }
    }
}

// ── Requests ─────────────────────────────────────────────────────────────

/// Body of `POST /api/combinations`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationRequest {
    pub subject_id: Option<u64>,
    pub verb_id: Option<u64>,
    pub object_id: Option<u64>,
}

impl CombinationRequest {
    pub fn validate(&self) -> Result<TripleKey, InputError> {
        triple(self.subject_id, self.verb_id, self.object_id)
    }
}

/// Body of `POST /api/suggestions/validate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub subject_id: Option<u64>,
    pub verb_id: Option<u64>,
    pub object_id: Option<u64>,
}

impl ValidationRequest {
    pub fn validate(&self) -> Result<TripleKey, InputError> {
        triple(self.subject_id, self.verb_id, self.object_id)
    }
}

fn triple(s: Option<u64>, v: Option<u64>, o: Option<u64>) -> Result<TripleKey, InputError> {
    let mut p = Problems::default();
    let s = p.id("subject_id", s, "Subject ID is required");
    let v = p.id("verb_id", v, "Verb ID is required");
    let o = p.id("object_id", o, "Object ID is required");
    p.finish()?;
    match (s, v, o) {
        (Some(s), Some(v), Some(o)) => Ok(TripleKey::new(s, v, o)),
        _ => Err(InputError::field("request", "incomplete triple")),
    }
}

/// Body of `POST /api/combinations/batch`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationBatchRequest {
    pub verb_id: Option<u64>,
    pub subject_ids: Option<Vec<u64>>,
    pub object_ids: Option<Vec<u64>>,
}

/// A checked batch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInput {
    pub verb: WordId,
    pub subjects: Vec<WordId>,
    pub objects: Vec<WordId>,
}

impl CombinationBatchRequest {
    pub fn validate(&self) -> Result<BatchInput, InputError> {
        let mut p = Problems::default();
        let verb = p.id("verb_id", self.verb_id, "Verb ID is required");
        let subjects = p.ids(
            "subject_ids",
            self.subject_ids.as_deref(),
            "At least one subject ID is required",
        );
        let objects = p.ids(
            "object_ids",
            self.object_ids.as_deref(),
            "At least one object ID is required",
        );
        p.finish()?;
        let verb = verb.ok_or_else(|| InputError::field("verb_id", "Verb ID is required"))?;
        Ok(BatchInput {
            verb,
            subjects,
            objects,
        })
    }
}

/// Body of `POST /api/words` and `PUT /api/words/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRequest {
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub role: Option<WordRole>,
}

impl WordRequest {
    /// Returns the trimmed text and the role.
    pub fn validate(&self) -> Result<(String, WordRole), InputError> {
        let mut p = Problems::default();
        let text = self.text.as_deref().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            p.push("text", "Text cannot be empty");
        }
        if self.role.is_none() {
            p.push("type", "Type must be specified (SUBJECT, VERB, or OBJECT)");
        }
        p.finish()?;
        let role = self
            .role
            .ok_or_else(|| InputError::field("type", "Type must be specified"))?;
        Ok((text.to_string(), role))
    }
}

/// Query of `GET /api/words`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WordsQuery {
    #[serde(rename = "type")]
    pub role: Option<WordRole>,
}

/// Query of `GET /api/combinations`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CombinationsQuery {
    pub verb_id: Option<u64>,
}

/// Query of `GET /api/suggestions`. Both fields are accepted and ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionsQuery {
    pub limit: Option<usize>,
    pub difficulty: Option<String>,
}

// ── Responses ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordView {
    pub id: u64,
    pub text: String,
    #[serde(rename = "type")]
    pub role: WordRole,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<&Word> for WordView {
    fn from(word: &Word) -> Self {
        Self {
            id: word.id.get(),
            text: word.text.clone(),
            role: word.role,
            created_at: word.created_at,
            updated_at: word.updated_at,
        }
    }
}

/// A combination with its words and rendered sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationView {
    pub id: u64,
    pub subject: WordReference,
    pub verb: WordReference,
    pub object: WordReference,
    pub sentence: String,
}

impl CombinationView {
    /// Build a view from a combination and its resolved words. A word missing
    /// from `words` is shown with its role placeholder.
    pub fn new(combo: &Combination, words: &HashMap<WordId, Word>, messages: &Messages) -> Self {
        let reference = |id: WordId, role| match words.get(&id) {
            Some(w) => WordReference::from(w),
            None => WordReference {
                id: id.get(),
                text: messages.placeholder(role).to_string(),
            },
        };
        Self {
            id: combo.id.get(),
            subject: reference(combo.subject, WordRole::Subject),
            verb: reference(combo.verb, WordRole::Verb),
            object: reference(combo.object, WordRole::Object),
            sentence: render_sentence(
                words.get(&combo.subject),
                words.get(&combo.verb),
                words.get(&combo.object),
                messages,
            ),
        }
    }
}

/// Render many combinations with a single word fetch.
pub fn combination_views(
    engine: &Engine,
    combos: &[Combination],
) -> VnestResult<Vec<CombinationView>> {
    let ids: Vec<WordId> = combos
        .iter()
        .flat_map(|c| [c.subject, c.verb, c.object])
        .collect();
    let words = engine.resolve_words(&ids)?;
    let messages = &engine.config().messages;
    Ok(combos
        .iter()
        .map(|c| CombinationView::new(c, &words, messages))
        .collect())
}

/// Response of `POST /api/combinations/batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub created: usize,
    pub combinations: Vec<CombinationView>,
    pub skipped_subject_ids: Vec<u64>,
    pub skipped_object_ids: Vec<u64>,
    pub already_present: usize,
}

impl BatchResponse {
    pub fn new(outcome: &BatchOutcome, combinations: Vec<CombinationView>) -> Self {
        Self {
            created: outcome.created_count(),
            combinations,
            skipped_subject_ids: outcome.skipped_subjects.iter().map(|id| id.get()).collect(),
            skipped_object_ids: outcome.skipped_objects.iter().map(|id| id.get()).collect(),
            already_present: outcome.already_present,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub persistent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;

    #[test]
    fn combination_request_reports_every_missing_field() {
        let err = CombinationRequest::default().validate().unwrap_err();
        let InputError::InvalidInput { errors } = err;
        assert_eq!(
            errors,
            vec![
                "subject_id: Subject ID is required",
                "verb_id: Verb ID is required",
                "object_id: Object ID is required",
            ]
        );
    }

    #[test]
    fn combination_request_parses_snake_case() {
        let req: CombinationRequest =
            serde_json::from_str(r#"{"subject_id":1,"verb_id":2,"object_id":3}"#).unwrap();
        let key = req.validate().unwrap();
        assert_eq!((key.subject.get(), key.verb.get(), key.object.get()), (1, 2, 3));
    }

    #[test]
    fn zero_id_is_invalid() {
        let req = ValidationRequest {
            subject_id: Some(0),
            verb_id: Some(1),
            object_id: Some(1),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn batch_request_requires_non_empty_lists() {
        let req: CombinationBatchRequest =
            serde_json::from_str(r#"{"verb_id":2,"subject_ids":[],"object_ids":[3]}"#).unwrap();
        let InputError::InvalidInput { errors } = req.validate().unwrap_err();
        assert_eq!(errors, vec!["subject_ids: At least one subject ID is required"]);
    }

    #[test]
    fn word_request_trims_and_checks_type() {
        let req: WordRequest = serde_json::from_str(r#"{"text":"  kissa ","type":"SUBJECT"}"#).unwrap();
        assert_eq!(req.validate().unwrap(), ("kissa".to_string(), WordRole::Subject));

        let InputError::InvalidInput { errors } = WordRequest::default().validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("text:"));
        assert!(errors[1].starts_with("type:"));
    }

    #[test]
    fn status_mapping() {
        let not_found: VnestError = WordError::NotFound { id: 1 }.into();
        assert_eq!(status_code(&not_found), 404);
        let exists: VnestError = CombinationError::AlreadyExists {
            subject: "a".into(),
            verb: "b".into(),
            object: "c".into(),
        }
        .into();
        assert_eq!(status_code(&exists), 409);
        let input: VnestError = InputError::field("text", "Text cannot be empty").into();
        assert_eq!(status_code(&input), 400);
        let store: VnestError = StoreError::Redb { message: "boom".into() }.into();
        assert_eq!(status_code(&store), 500);
    }

    #[test]
    fn failure_envelope_lists_fields() {
        let err: VnestError = InputError::InvalidInput {
            errors: vec!["text: Text cannot be empty".into()],
        }
        .into();
        let body = serde_json::to_value(ApiResponse::failure(&err)).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["data"][0], "text: Text cannot be empty");
    }

    #[test]
    fn views_render_sentences_and_wire_names() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let s = engine.create_word("Maanviljelijä", WordRole::Subject).unwrap();
        let v = engine.create_word("ajaa", WordRole::Verb).unwrap();
        let o = engine.create_word("traktoria", WordRole::Object).unwrap();
        let combo = engine.create_combination(s.id, v.id, o.id).unwrap();

        let views = combination_views(&engine, &[combo]).unwrap();
        assert_eq!(views[0].sentence, "Maanviljelijä ajaa traktoria");
        assert_eq!(views[0].verb.text, "ajaa");

        let json = serde_json::to_value(WordView::from(&s)).unwrap();
        assert_eq!(json["type"], "SUBJECT");
        assert!(json.get("created_at").is_some());
    }
}
