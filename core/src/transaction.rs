//! Transaction Surface (C11, spec.md §4.11): a thin handle wrapping a
//! driver transaction with the savepoint primitives, plus idempotent
//! commit/rollback semantics.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::driver::{Executor, Row, Transaction as DriverTransaction};
use crate::error::Result;
use crate::value::SqlValue;

/// A transaction handle bound to one `Begin` (spec.md §4.11).
///
/// Terminal builder calls against `TransactionHandle` take no context
/// argument — unlike the pool-bound path, the cancellation context is
/// captured once, at `Begin` time, and threaded through by the concrete
/// driver transaction underneath.
pub struct TransactionHandle {
    inner: Box<dyn DriverTransaction>,
    finished: AtomicBool,
}

impl TransactionHandle {
    pub fn new(inner: Box<dyn DriverTransaction>) -> Self {
        Self {
            inner,
            finished: AtomicBool::new(false),
        }
    }

    pub async fn savepoint(&self, name: &str) -> Result<()> {
        self.inner.savepoint(name).await
    }

    pub async fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
        self.inner.rollback_to_savepoint(name).await
    }

    pub async fn release_savepoint(&self, name: &str) -> Result<()> {
        self.inner.release_savepoint(name).await
    }

    /// Commits the transaction. A second call (after a first successful
    /// commit) is a no-op (spec.md §4.11).
    pub async fn commit(&self) -> Result<()> {
        if self.finished.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.commit().await
    }

    /// Rolls back the transaction. Safe to call multiple times; a rollback
    /// issued after a successful commit is a documented no-op rather than an
    /// error (spec.md §4.11).
    pub async fn rollback(&self) -> Result<()> {
        if self.finished.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.rollback().await
    }
}

#[async_trait::async_trait]
impl Executor for TransactionHandle {
    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<u64> {
        self.inner.execute(sql, args).await
    }

    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Row>> {
        self.inner.query(sql, args).await
    }
}
