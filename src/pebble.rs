//! The top-level handle applications hold onto, pairing a driver with the
//! config that governs statement timeouts and the default schema (spec.md
//! §4.11). Grounded on the teacher's `src/core.rs` `Drizzle` struct, cut down
//! to the async/object-safe `Driver` surface `pebble-core` exposes instead
//! of the teacher's generic `Connection<Value = ...>` parameter.

use std::future::Future;
use std::sync::Arc;

use pebble_core::config::PebbleConfig;
use pebble_core::driver::{Driver, Executor, Row};
use pebble_core::error::Result;
use pebble_core::transaction::TransactionHandle;
use pebble_core::value::SqlValue;

/// Holds a driver and the config applied to statements run through it.
pub struct Pebble<D: Driver + 'static> {
    driver: Arc<D>,
    config: PebbleConfig,
}

impl<D: Driver + 'static> Clone for Pebble<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            config: self.config.clone(),
        }
    }
}

impl<D: Driver + 'static> Pebble<D> {
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, PebbleConfig::default())
    }

    pub fn with_config(driver: D, config: PebbleConfig) -> Self {
        Self {
            driver: Arc::new(driver),
            config,
        }
    }

    pub fn config(&self) -> &PebbleConfig {
        &self.config
    }

    /// The raw escape hatch (spec.md §4.9's `.where_raw()`/`.having_raw()`
    /// companions at the connection level): run SQL text directly.
    pub async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<u64> {
        self.driver.execute(sql, args).await
    }

    pub async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Row>> {
        self.driver.query(sql, args).await
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back on
    /// `Err`. Mirrors the teacher's `Drizzle::transaction`, adapted to an
    /// async closure over the async `Driver`/`Transaction` traits.
    pub async fn transaction<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Arc<TransactionHandle>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let handle = Arc::new(TransactionHandle::new(self.driver.begin().await?));
        let inner = Arc::clone(&handle);
        match f(inner).await {
            Ok(value) => {
                handle.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let _ = handle.rollback().await;
                Err(err)
            }
        }
    }
}
