//! Export and import types for engine state.
//!
//! These types provide human-readable, text-resolved representations of
//! words and combinations suitable for JSON export, plus the sentence
//! records accepted by bulk ingest.

use serde::{Deserialize, Serialize};

use crate::api::combination_views;
use crate::engine::Engine;
use crate::error::{CombinationError, VnestError, VnestResult};
use crate::word::{Word, WordRole};

/// Exported word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordExport {
    /// Numeric word ID.
    pub id: u64,
    pub text: String,
    /// Role wire name (SUBJECT, VERB, OBJECT).
    #[serde(rename = "type")]
    pub role: WordRole,
    /// Creation timestamp (seconds since UNIX epoch).
    pub created_at: u64,
}

impl From<&Word> for WordExport {
    fn from(word: &Word) -> Self {
        Self {
            id: word.id.get(),
            text: word.text.clone(),
            role: word.role,
            created_at: word.created_at,
        }
    }
}

/// Exported combination with resolved texts for all positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationExport {
    pub id: u64,
    pub subject_id: u64,
    pub subject: String,
    pub verb_id: u64,
    pub verb: String,
    pub object_id: u64,
    pub object: String,
    /// Rendered sentence.
    pub sentence: String,
}

/// Everything in the engine, text-resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub words: Vec<WordExport>,
    pub combinations: Vec<CombinationExport>,
}

/// Collect all words and combinations.
pub fn snapshot(engine: &Engine) -> VnestResult<Snapshot> {
    let words = engine.list_words(None)?;
    let combos = engine.list_combinations(None)?;
    let combinations = combination_views(engine, &combos)?
        .into_iter()
        .map(|v| CombinationExport {
            id: v.id,
            subject_id: v.subject.id,
            subject: v.subject.text,
            verb_id: v.verb.id,
            verb: v.verb.text,
            object_id: v.object.id,
            object: v.object.text,
            sentence: v.sentence,
        })
        .collect();
    Ok(Snapshot {
        words: words.iter().map(WordExport::from).collect(),
        combinations,
    })
}

/// One allowed sentence given by its texts, as read by bulk ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceRecord {
    pub subject: String,
    pub verb: String,
    pub object: String,
}

/// Counts from a bulk ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub words_created: usize,
    pub combinations_created: usize,
    /// Sentences whose combination already existed.
    pub already_present: usize,
}

/// Allow every sentence in `records`, creating missing words by text and role.
///
/// Existing combinations are counted, not treated as errors.
pub fn ingest(engine: &Engine, records: &[SentenceRecord]) -> VnestResult<IngestReport> {
    let mut report = IngestReport::default();
    for record in records {
        let mut ensure = |text: &str, role| -> VnestResult<Word> {
            let (word, created) = engine.ensure_word(text, role)?;
            report.words_created += usize::from(created);
            Ok(word)
        };
        let s = ensure(&record.subject, WordRole::Subject)?;
        let v = ensure(&record.verb, WordRole::Verb)?;
        let o = ensure(&record.object, WordRole::Object)?;

        match engine.create_combination(s.id, v.id, o.id) {
            Ok(_) => report.combinations_created += 1,
            Err(VnestError::Combination(CombinationError::AlreadyExists { .. })) => {
                report.already_present += 1;
            }
            Err(e) => return Err(e),
        }
    }
    tracing::info!(
        sentences = records.len(),
        words_created = report.words_created,
        combinations_created = report.combinations_created,
        "ingested sentences"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;

    fn record(s: &str, v: &str, o: &str) -> SentenceRecord {
        SentenceRecord {
            subject: s.into(),
            verb: v.into(),
            object: o.into(),
        }
    }

    #[test]
    fn ingest_reuses_words_and_counts_duplicates() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let records = vec![
            record("kissa", "syö", "kalaa"),
            record("koira", "syö", "kalaa"),
            record("kissa", "syö", "kalaa"),
        ];
        let report = ingest(&engine, &records).unwrap();
        assert_eq!(report.words_created, 4);
        assert_eq!(report.combinations_created, 2);
        assert_eq!(report.already_present, 1);
    }

    #[test]
    fn snapshot_resolves_texts() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        ingest(&engine, &[record("cat", "eats", "fish")]).unwrap();
        let snap = snapshot(&engine).unwrap();
        assert_eq!(snap.words.len(), 3);
        assert_eq!(snap.combinations[0].sentence, "cat eats fish");
        assert_eq!(snap.combinations[0].verb, "eats");

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["words"][1]["type"], "VERB");
    }

    #[test]
    fn sentence_records_parse_from_json() {
        let parsed: Vec<SentenceRecord> =
            serde_json::from_str(r#"[{"subject":"a","verb":"b","object":"c"}]"#).unwrap();
        assert_eq!(parsed, vec![record("a", "b", "c")]);
    }
}
