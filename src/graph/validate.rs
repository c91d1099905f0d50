//! Exact-triple verdicts and sentence rendering.
//!
//! Validation never fails on a missing word: unresolved roles are rendered
//! with a placeholder and the verdict is simply `valid: false`.

use serde::{Deserialize, Serialize};

use crate::word::{Word, WordRole};

/// User-facing texts used when rendering verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Messages {
    #[serde(default = "default_affirmation")]
    pub affirmation: String,
    #[serde(default = "default_rejection")]
    pub rejection: String,
    #[serde(default = "default_unknown_subject")]
    pub unknown_subject: String,
    #[serde(default = "default_unknown_verb")]
    pub unknown_verb: String,
    #[serde(default = "default_unknown_object")]
    pub unknown_object: String,
}

fn default_affirmation() -> String {
    "Oikein! Hyvä lause.".into()
}

fn default_rejection() -> String {
    "Väärin. Tuo lause ei ole sallittu.".into()
}

fn default_unknown_subject() -> String {
    "[Unknown Subject]".into()
}

fn default_unknown_verb() -> String {
    "[Unknown Verb]".into()
}

fn default_unknown_object() -> String {
    "[Unknown Object]".into()
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            affirmation: default_affirmation(),
            rejection: default_rejection(),
            unknown_subject: default_unknown_subject(),
            unknown_verb: default_unknown_verb(),
            unknown_object: default_unknown_object(),
        }
    }
}

impl Messages {
    /// Placeholder for an unresolved word in `role`.
    pub fn placeholder(&self, role: WordRole) -> &str {
        match role {
            WordRole::Subject => &self.unknown_subject,
            WordRole::Verb => &self.unknown_verb,
            WordRole::Object => &self.unknown_object,
        }
    }
}

/// Verdict for a candidate sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    pub sentence: String,
    pub message: String,
}

/// Join the three texts with single spaces, substituting placeholders for
/// any word that did not resolve.
pub fn render_sentence(
    subject: Option<&Word>,
    verb: Option<&Word>,
    object: Option<&Word>,
    messages: &Messages,
) -> String {
    let part = |word: Option<&Word>, role| match word {
        Some(w) => w.text.clone(),
        None => messages.placeholder(role).to_string(),
    };
    format!(
        "{} {} {}",
        part(subject, WordRole::Subject),
        part(verb, WordRole::Verb),
        part(object, WordRole::Object)
    )
}

/// Build the verdict for a triple. `allowed` is the result of the exact
/// triple lookup.
pub fn verdict(
    allowed: bool,
    subject: Option<&Word>,
    verb: Option<&Word>,
    object: Option<&Word>,
    messages: &Messages,
) -> Validation {
    Validation {
        valid: allowed,
        sentence: render_sentence(subject, verb, object, messages),
        message: if allowed {
            messages.affirmation.clone()
        } else {
            messages.rejection.clone()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::WordId;

    fn word(id: u64, text: &str, role: WordRole) -> Word {
        Word::new(WordId::new(id).unwrap(), text, role)
    }

    #[test]
    fn renders_all_resolved_words() {
        let (s, v, o) = (
            word(1, "cat", WordRole::Subject),
            word(2, "eats", WordRole::Verb),
            word(3, "fish", WordRole::Object),
        );
        let m = Messages::default();
        assert_eq!(render_sentence(Some(&s), Some(&v), Some(&o), &m), "cat eats fish");
    }

    #[test]
    fn placeholders_fill_missing_roles() {
        let v = word(2, "eats", WordRole::Verb);
        let m = Messages::default();
        assert_eq!(
            render_sentence(None, Some(&v), None, &m),
            "[Unknown Subject] eats [Unknown Object]"
        );
    }

    #[test]
    fn verdict_picks_message_by_validity() {
        let m = Messages::default();
        let yes = verdict(true, None, None, None, &m);
        assert!(yes.valid);
        assert_eq!(yes.message, m.affirmation);
        let no = verdict(false, None, None, None, &m);
        assert!(!no.valid);
        assert_eq!(no.message, m.rejection);
    }

    #[test]
    fn messages_fill_defaults_from_partial_toml() {
        let m: Messages = toml::from_str(r#"affirmation = "Right!""#).unwrap();
        assert_eq!(m.affirmation, "Right!");
        assert_eq!(m.unknown_verb, "[Unknown Verb]");
    }
}
