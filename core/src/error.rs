//! Error types shared across the core crate.

use compact_str::CompactString;
use thiserror::Error;

/// Result alias used throughout `pebble-core`.
pub type Result<T> = core::result::Result<T, Error>;

/// Kinds of constraint violation the driver can classify for us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    Check,
    NotNull,
}

/// Core error type.
///
/// Variants map onto the abstract error kinds in the design ("Error handling
/// design"): tag/metadata problems, preload/relationship problems, statement
/// shape problems, not-found, constraint violations, and cancellation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("metadata error: {0}")]
    Metadata(CompactString),

    #[error("unknown option '{option}' in tag for column '{column}'")]
    UnknownOption {
        column: CompactString,
        option: CompactString,
    },

    #[error("conflicting options for column '{column}': {detail}")]
    ConflictingOptions {
        column: CompactString,
        detail: CompactString,
    },

    #[error("invalid relationship on field '{field}': {detail}")]
    InvalidRelationship {
        field: CompactString,
        detail: CompactString,
    },

    #[error("unknown relationship '{0}' in preload path")]
    UnknownRelationship(CompactString),

    #[error("insert shape mismatch: row {row} has columns {found:?}, expected {expected:?}")]
    InsertShapeMismatch {
        row: usize,
        expected: Vec<CompactString>,
        found: Vec<CompactString>,
    },

    #[error("no rows found")]
    NotFound,

    #[error("constraint violation ({kind:?}): {detail}")]
    ConstraintViolation {
        kind: ConstraintKind,
        detail: CompactString,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("schema drift cannot be represented as forward-safe DDL: {0}")]
    SchemaDriftUnrepresentable(CompactString),

    #[error("driver error: {0}")]
    Driver(CompactString),

    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn metadata(msg: impl Into<CompactString>) -> Self {
        Error::Metadata(msg.into())
    }

    pub fn driver(msg: impl core::fmt::Display) -> Self {
        Error::Driver(CompactString::from(msg.to_string()))
    }
}
