//! Driver contract (spec.md §6): the one thing the core consumes from
//! outside. `pebble-postgres` provides the concrete `tokio-postgres`
//! implementation; this crate only depends on the trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::scanner::ColumnSource;
use crate::value::SqlValue;

/// One query result row, boxed so `Driver`/`Transaction` can stay
/// object-safe across driver implementations.
pub type Row = Box<dyn ColumnSource + Send + Sync>;

/// The driver-agnostic execution surface shared by the pool-bound handle and
/// a transaction handle (spec.md §4.11: "same builder entry points").
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<u64>;
    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Row>>;

    /// Runs `query` and requires exactly one row, surfacing `NotFound`
    /// otherwise (spec.md §7).
    async fn query_one(&self, sql: &str, args: &[SqlValue]) -> Result<Row> {
        let mut rows = self.query(sql, args).await?;
        if rows.is_empty() {
            return Err(crate::error::Error::NotFound);
        }
        Ok(rows.remove(0))
    }
}

/// A connection or pool handle capable of starting transactions.
#[async_trait]
pub trait Driver: Executor {
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}

/// An open transaction (spec.md §4.11). `commit`/`rollback` take `&self` and
/// are safe to call more than once: a `rollback` issued after a successful
/// `commit` is a documented no-op rather than an error.
#[async_trait]
pub trait Transaction: Executor {
    async fn savepoint(&self, name: &str) -> Result<()>;
    async fn rollback_to_savepoint(&self, name: &str) -> Result<()>;
    async fn release_savepoint(&self, name: &str) -> Result<()>;
    async fn commit(&self) -> Result<()>;
    async fn rollback(&self) -> Result<()>;
}
