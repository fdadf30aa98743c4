//! Pebble: a compile-time-typed Postgres query builder with schema
//! introspection and migration planning.

mod pebble;

pub use crate::pebble::Pebble;

pub use pebble_core::config::{PebbleConfig, PebbleConfigBuilder};
pub use pebble_core::error::{ConstraintKind, Error, Result};
pub use pebble_core::registry::{default_registry, Registry, Table};
pub use pebble_core::schema::{
    ColumnMetadata, ForeignKeyMetadata, IndexMetadata, PrimaryKey, RelationshipMetadata, TableMetadata,
};
pub use pebble_core::scanner::{FromRow, ToRow};
pub use pebble_core::statement::{DeleteStatement, InsertStatement, RenderedSql, SelectStatement, UpdateStatement};
pub use pebble_core::transaction::TransactionHandle;
pub use pebble_core::value::SqlValue;
pub use pebble_core::driver::{Driver, Executor, Row};

pub use pebble_macros::Table;

#[cfg(feature = "postgres")]
pub use pebble_postgres::PgDriver;

/// Everything needed to build and run queries with a single
/// `use pebble::prelude::*;` import, the way the teacher's
/// `drizzle_rs::prelude` collects its own builder/driver/macro surface.
pub mod prelude {
    pub use crate::{Pebble, PebbleConfig};

    pub use pebble_core::driver::{Driver, Executor};
    pub use pebble_core::error::{Error, Result};
    pub use pebble_core::expr::{
        array_contains, array_contained_by, array_overlap, between, eq, exists, full_text_match, group,
        gt, gte, ilike, in_, in_subquery, is_not_null, is_null, json_contains, json_contained_by,
        json_has_all_keys, json_has_any_key, json_has_key, json_path, json_path_text, like, lt, lte,
        neq, not, not_exists, not_in, not_regex, quantified, raw, regex, regex_i,
    };
    pub use pebble_core::expr::{Cte, OrderBy};
    pub use pebble_core::registry::{default_registry, Registry, Table as PebbleTable};
    pub use pebble_core::scanner::{FromRow, ToRow};
    pub use pebble_core::schema::TableMetadata;
    pub use pebble_core::statement::{DeleteStatement, InsertStatement, SelectStatement, UpdateStatement};
    pub use pebble_core::value::SqlValue;

    pub use pebble_macros::Table;

    #[cfg(feature = "postgres")]
    pub use pebble_postgres::PgDriver;
}
