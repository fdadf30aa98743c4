//! Savepoint rollback semantics, end to end (spec.md §8 scenario 6): begin,
//! insert A, savepoint, insert B, roll back to the savepoint, commit — the
//! post-commit store has A but not B.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pebble_core::driver::{Executor, Row, Transaction as DriverTransaction};
use pebble_core::error::Result;
use pebble_core::transaction::TransactionHandle;
use pebble_core::value::SqlValue;

/// A transaction double that journals `execute` calls into a pending log
/// and only folds that log into the shared "committed" store on `commit`.
/// Savepoints mark a position in the pending log to roll back to.
struct JournalingTx {
    committed: Arc<Mutex<Vec<String>>>,
    pending: Mutex<Vec<String>>,
    savepoints: Mutex<HashMap<String, usize>>,
}

impl JournalingTx {
    fn new(committed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            committed,
            pending: Mutex::new(Vec::new()),
            savepoints: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Executor for JournalingTx {
    async fn execute(&self, sql: &str, _args: &[SqlValue]) -> Result<u64> {
        self.pending.lock().unwrap().push(sql.to_string());
        Ok(1)
    }

    async fn query(&self, _sql: &str, _args: &[SqlValue]) -> Result<Vec<Row>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl DriverTransaction for JournalingTx {
    async fn savepoint(&self, name: &str) -> Result<()> {
        let marker = self.pending.lock().unwrap().len();
        self.savepoints.lock().unwrap().insert(name.to_string(), marker);
        Ok(())
    }

    async fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
        let marker = *self.savepoints.lock().unwrap().get(name).expect("unknown savepoint");
        self.pending.lock().unwrap().truncate(marker);
        Ok(())
    }

    async fn release_savepoint(&self, name: &str) -> Result<()> {
        self.savepoints.lock().unwrap().remove(name);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut pending = self.pending.lock().unwrap();
        self.committed.lock().unwrap().extend(pending.drain(..));
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.pending.lock().unwrap().clear();
        Ok(())
    }
}

#[tokio::test]
async fn rollback_to_savepoint_drops_only_the_work_after_it() {
    let committed = Arc::new(Mutex::new(Vec::new()));
    let handle = TransactionHandle::new(Box::new(JournalingTx::new(committed.clone())));

    handle.execute("INSERT INTO rows VALUES ('A')", &[]).await.unwrap();
    handle.savepoint("s1").await.unwrap();
    handle.execute("INSERT INTO rows VALUES ('B')", &[]).await.unwrap();
    handle.rollback_to_savepoint("s1").await.unwrap();
    handle.commit().await.unwrap();

    let rows = committed.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].contains('A'));
    assert!(rows.iter().all(|r| !r.contains('B')));
}

#[tokio::test]
async fn full_rollback_commits_nothing() {
    let committed = Arc::new(Mutex::new(Vec::new()));
    let handle = TransactionHandle::new(Box::new(JournalingTx::new(committed.clone())));

    handle.execute("INSERT INTO rows VALUES ('A')", &[]).await.unwrap();
    handle.rollback().await.unwrap();

    assert!(committed.lock().unwrap().is_empty());
    // A rollback after a rollback is a documented no-op, not an error.
    handle.commit().await.unwrap();
    assert!(committed.lock().unwrap().is_empty());
}
