//! Rich diagnostic error types for the vnest-graph engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so callers know exactly
//! what went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

use crate::word::WordRole;

/// Top-level error type for the vnest-graph engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum VnestError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Word(#[from] WordError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Combination(#[from] CombinationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

impl VnestError {
    /// Whether this error means a referenced entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VnestError::Word(WordError::NotFound { .. })
                | VnestError::Combination(
                    CombinationError::NotFound { .. } | CombinationError::CombinationNotFound { .. }
                )
        )
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(vnest::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(vnest::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             This may indicate corruption; try running with a fresh data directory."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(vnest::store::serde),
        help(
            "Failed to serialize or deserialize a stored record. \
             This usually means the stored data format has changed between versions."
        )
    )]
    Serialization { message: String },

    #[error("duplicate triple: ({subject}, {verb}, {object})")]
    #[diagnostic(
        code(vnest::store::duplicate_triple),
        help("A combination for this exact subject/verb/object triple is already stored.")
    )]
    DuplicateTriple { subject: u64, verb: u64, object: u64 },

    #[error("identifier space exhausted for {kind}")]
    #[diagnostic(
        code(vnest::store::ids_exhausted),
        help("The allocator cannot hand out more than u64::MAX identifiers.")
    )]
    IdsExhausted { kind: &'static str },
}

// ---------------------------------------------------------------------------
// Word errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum WordError {
    #[error("word not found with ID: {id}")]
    #[diagnostic(
        code(vnest::word::not_found),
        help("List words with `vnest word list` to find a valid identifier.")
    )]
    NotFound { id: u64 },

    #[error("cannot change role of word {id} from {from} to {to}: it is used by {combinations} combination(s)")]
    #[diagnostic(
        code(vnest::word::role_in_use),
        help(
            "Combinations assume the role a word had when they were created. \
             Delete the combinations that use this word first, or change only its text."
        )
    )]
    RoleInUse {
        id: u64,
        from: WordRole,
        to: WordRole,
        combinations: usize,
    },

    #[error("invalid word role: {role}")]
    #[diagnostic(
        code(vnest::word::invalid_role),
        help("Valid roles are: SUBJECT, VERB, OBJECT.")
    )]
    InvalidRole { role: String },
}

// ---------------------------------------------------------------------------
// Combination errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CombinationError {
    #[error("{role} word not found with ID: {id}")]
    #[diagnostic(
        code(vnest::combination::word_not_found),
        help("Every combination must reference an existing word for each of its three roles.")
    )]
    NotFound { role: WordRole, id: u64 },

    #[error("combination already exists: {subject} {verb} {object}")]
    #[diagnostic(
        code(vnest::combination::already_exists),
        help("This exact subject/verb/object triple is already allowed. No action needed.")
    )]
    AlreadyExists {
        subject: String,
        verb: String,
        object: String,
    },

    #[error("allowed combination not found with ID: {id}")]
    #[diagnostic(
        code(vnest::combination::not_found),
        help("List combinations with `vnest combo list` to find a valid identifier.")
    )]
    CombinationNotFound { id: u64 },
}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InputError {
    #[error("invalid input: {}", .errors.join(", "))]
    #[diagnostic(
        code(vnest::input::invalid),
        help("Fix the listed fields and resend the request.")
    )]
    InvalidInput { errors: Vec<String> },
}

impl InputError {
    /// Single-field convenience constructor.
    pub fn field(field: &str, message: &str) -> Self {
        InputError::InvalidInput {
            errors: vec![format!("{field}: {message}")],
        }
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(vnest::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(vnest::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(vnest::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("data directory error: {path}")]
    #[diagnostic(
        code(vnest::config::data_dir),
        help(
            "The data directory could not be accessed. \
             Ensure the path exists and has read/write permissions."
        )
    )]
    DataDir { path: String },
}

/// Convenience alias for functions returning vnest-graph results.
pub type VnestResult<T> = std::result::Result<T, VnestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_vnest_error() {
        let err = StoreError::DuplicateTriple {
            subject: 1,
            verb: 2,
            object: 3,
        };
        let top: VnestError = err.into();
        assert!(matches!(
            top,
            VnestError::Store(StoreError::DuplicateTriple { .. })
        ));
    }

    #[test]
    fn not_found_classification() {
        let err: VnestError = CombinationError::NotFound {
            role: WordRole::Verb,
            id: 7,
        }
        .into();
        assert!(err.is_not_found());

        let err: VnestError = WordError::NotFound { id: 7 }.into();
        assert!(err.is_not_found());

        let err: VnestError = CombinationError::AlreadyExists {
            subject: "cat".into(),
            verb: "eats".into(),
            object: "fish".into(),
        }
        .into();
        assert!(!err.is_not_found());
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = CombinationError::NotFound {
            role: WordRole::Subject,
            id: 42,
        };
        assert_eq!(err.to_string(), "subject word not found with ID: 42");

        let err = CombinationError::AlreadyExists {
            subject: "cat".into(),
            verb: "eats".into(),
            object: "fish".into(),
        };
        assert_eq!(err.to_string(), "combination already exists: cat eats fish");
    }

    #[test]
    fn invalid_input_lists_fields() {
        let err = InputError::InvalidInput {
            errors: vec![
                "subject_ids: at least one subject ID is required".into(),
                "object_ids: at least one object ID is required".into(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("subject_ids"));
        assert!(msg.contains("object_ids"));
    }
}
