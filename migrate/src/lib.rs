//! Schema introspection, diffing, and migration planning (C4-C6, spec.md §4.8-§4.10).
//!
//! Three stages, each independently testable against hand-built fixtures:
//! [`introspect`] reads the live catalog into `TableMetadata`, [`diff`]
//! compares that against the Tag Parser's own `TableMetadata`, and [`plan`]
//! turns the resulting `SchemaDiff` into ordered, idempotent DDL.

pub mod diff;
pub mod error;
pub mod introspect;
pub mod plan;

pub use diff::{diff_schemas, ColumnDiff, EnumValuesAdded, SchemaDiff, TableDiff};
pub use error::{MigrateError, Result};
pub use introspect::introspect;
pub use plan::{plan_migration, MigrationPlan, MigrationScript, PlannerOptions};
