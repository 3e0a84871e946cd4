use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a validation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Required,
    TooShort,
    TooLong,
    PatternMismatch,
    OutOfRange,
    BelowMinimumCount,
    AboveMaximumCount,
    TypeMismatch,
    InvalidChoice,
    RuleViolation,
    InvalidTransition,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Required => "required",
            ErrorKind::TooShort => "too_short",
            ErrorKind::TooLong => "too_long",
            ErrorKind::PatternMismatch => "pattern_mismatch",
            ErrorKind::OutOfRange => "out_of_range",
            ErrorKind::BelowMinimumCount => "below_minimum_count",
            ErrorKind::AboveMaximumCount => "above_maximum_count",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::InvalidChoice => "invalid_choice",
            ErrorKind::RuleViolation => "rule_violation",
            ErrorKind::InvalidTransition => "invalid_transition",
        }
    }
}

/// A user-recoverable problem attached to a field or collection item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationError {
    /// JSON pointer: `/field`, `/collection` or `/collection/0/field`.
    pub path: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn field(name: &str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(format!("/{}", name), kind, message)
    }

    pub fn item(
        collection: &str,
        index: usize,
        field: &str,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::new(format!("/{}/{}/{}", collection, index, field), kind, message)
    }
}

/// Malformed static definitions, rejected before any session starts.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("form '{0}' declares no steps")]
    NoSteps(String),
    #[error("step indices must be contiguous from 1; found {found} at position {position}")]
    StepIndex { position: usize, found: usize },
    #[error("duplicate field or collection name '{0}'")]
    DuplicateName(String),
    #[error("'{0}' is a reserved name")]
    ReservedName(String),
    #[error("step {step} references undeclared field '{name}'")]
    UndeclaredField { step: usize, name: String },
    #[error("step {step} references undeclared collection '{name}'")]
    UndeclaredCollection { step: usize, name: String },
    #[error("'{name}' is owned by steps {first} and {second}")]
    MultipleOwners {
        name: String,
        first: usize,
        second: usize,
    },
    #[error("'{0}' is declared but no step owns it")]
    Unowned(String),
    #[error("expression on '{owner}' references unknown name '{name}'")]
    UnknownReference { owner: String, name: String },
    #[error("invalid pattern on '{field}': {source}")]
    Pattern {
        field: String,
        #[source]
        source: regex::Error,
    },
    #[error("default for '{0}' is not one of its choices")]
    DefaultNotInChoices(String),
    #[error("enum field '{0}' declares no choices")]
    MissingChoices(String),
    #[error("derivation '{rule}' references unknown field '{name}'")]
    DerivationField { rule: String, name: String },
    #[error("derivation rules form a cycle through '{0}'")]
    DerivationCycle(String),
    #[error("collection '{collection}' references unknown field '{name}'")]
    CollectionField { collection: String, name: String },
    #[error("invalid prefill glob '{pattern}': {source}")]
    PrefillGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Failures of collection edits.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollectionError {
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),
    #[error("collection '{collection}' has no field '{field}'")]
    UnknownField { collection: String, field: String },
    #[error("collection '{collection}' has no item {index}")]
    IndexOutOfRange { collection: String, index: usize },
    #[error("collection '{collection}' cannot drop below {minimum} item(s)")]
    BelowMinimumCount { collection: String, minimum: usize },
    #[error("collection '{collection}' cannot exceed {maximum} item(s)")]
    AboveMaximumCount { collection: String, maximum: usize },
    #[error("collection '{0}' has no key field")]
    NotKeyed(String),
}

impl CollectionError {
    /// Projection onto the user-facing error taxonomy.
    pub fn to_validation_error(&self) -> ValidationError {
        match self {
            CollectionError::BelowMinimumCount {
                collection,
                minimum,
            } => ValidationError::field(
                collection,
                ErrorKind::BelowMinimumCount,
                format!("at least {} item(s) required", minimum),
            ),
            CollectionError::AboveMaximumCount {
                collection,
                maximum,
            } => ValidationError::field(
                collection,
                ErrorKind::AboveMaximumCount,
                format!("at most {} item(s) allowed", maximum),
            ),
            other => ValidationError::new("", ErrorKind::InvalidTransition, other.to_string()),
        }
    }
}
