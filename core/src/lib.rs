//! Core of the pebble ORM: the Type Mapper (C1), Tag Parser (C2), Schema
//! Registry (C3), Scanner/Valuer (C7), Expression Builder (C8), Statement
//! Builder (C9), Preloader (C10), and Transaction Surface (C11).
//!
//! `pebble-migrate` (C4/C5/C6) and `pebble-postgres` (the concrete `Driver`)
//! are separate crates built on top of the types exported here; this crate
//! has no dependency on either.

pub mod config;
pub mod convert;
pub mod driver;
pub mod error;
pub mod expr;
pub mod preload;
pub mod registry;
pub mod scanner;
pub mod schema;
pub mod statement;
pub mod tag;
pub mod transaction;
pub mod types;
pub mod value;

pub use config::PebbleConfig;
pub use convert::FromSqlValue;
pub use driver::{Driver, Executor, Row, Transaction as DriverTransaction};
pub use error::{Error, Result};
pub use registry::{default_registry, Registry, Table};
pub use schema::{
    ColumnMetadata, ForeignKeyMetadata, IndexMetadata, PrimaryKey, RelationshipMetadata,
    TableMetadata,
};
pub use scanner::{FromRow, ToRow};
pub use statement::{DeleteStatement, InsertStatement, RenderedSql, SelectStatement, UpdateStatement};
pub use transaction::TransactionHandle;
pub use value::SqlValue;

/// Re-exports used by `#[derive(Table)]`-generated code so a struct
/// annotated with `#[po(...)]` doesn't need `async-trait`/`once_cell` as
/// direct dependencies of its own crate.
#[doc(hidden)]
pub mod __private {
    pub use async_trait;
    pub use once_cell;
}
