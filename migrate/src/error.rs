//! Error type for `pebble-migrate` (introspection, diffing, planning).

use compact_str::CompactString;
use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = core::result::Result<T, MigrateError>;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("introspection query against '{query}' failed: {detail}")]
    Introspection {
        query: CompactString,
        detail: CompactString,
    },

    #[error("introspected row for table '{table}' is missing required column '{column}'")]
    MalformedRow {
        table: CompactString,
        column: CompactString,
    },

    /// Mirrors `pebble_core::Error::SchemaDriftUnrepresentable` (spec.md §7):
    /// the Differ found a change the Planner cannot express as forward-safe
    /// DDL, most commonly an enum value removed or reordered.
    #[error("schema drift cannot be represented as forward-safe DDL: {0}")]
    SchemaDriftUnrepresentable(CompactString),

    #[error(transparent)]
    Driver(#[from] pebble_core::Error),
}

impl MigrateError {
    pub fn introspection(query: impl Into<CompactString>, detail: impl core::fmt::Display) -> Self {
        MigrateError::Introspection {
            query: query.into(),
            detail: CompactString::from(detail.to_string()),
        }
    }
}
