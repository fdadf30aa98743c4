//! Shared test doubles for the repo-root integration tests, mirroring the
//! teacher's `tests/common/` helper module.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use pebble_core::driver::{Executor, Row};
use pebble_core::error::{Error, Result};
use pebble_core::value::SqlValue;

/// One in-memory "table": column names plus its rows, each row a plain
/// `Vec<SqlValue>` aligned to `columns`.
pub struct MemTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<SqlValue>>,
}

pub struct MemRow {
    columns: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl pebble_core::scanner::ColumnSource for MemRow {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, idx: usize) -> &str {
        self.columns[idx]
    }

    fn value(&self, idx: usize) -> Result<SqlValue> {
        Ok(self.values[idx].clone())
    }
}

/// An `Executor` over a fixed set of named in-memory tables. Queries are
/// matched by which table the SQL selects `FROM`, not by parsing the SQL in
/// full — good enough to drive the builder's own `batched_select_by_any`
/// output and count how many round trips a preload makes (spec.md §8
/// scenarios 3 and 4).
pub struct MockExecutor {
    tables: Mutex<std::collections::HashMap<&'static str, MemTable>>,
    pub query_count: AtomicUsize,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(std::collections::HashMap::new()),
            query_count: AtomicUsize::new(0),
        }
    }

    pub fn with_table(self, name: &'static str, table: MemTable) -> Self {
        self.tables.lock().unwrap().insert(name, table);
        self
    }

    fn table_from_sql(sql: &str) -> Option<&str> {
        let from = sql.find(" FROM ")?;
        let rest = &sql[from + 6..];
        rest.split_whitespace().next()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, _sql: &str, _args: &[SqlValue]) -> Result<u64> {
        Ok(1)
    }

    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Row>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        let table_name = Self::table_from_sql(sql)
            .ok_or_else(|| Error::metadata(format!("mock executor could not find a table in: {sql}")))?;
        let tables = self.tables.lock().unwrap();
        let table = tables
            .get(table_name)
            .ok_or_else(|| Error::metadata(format!("mock executor has no table '{table_name}'")))?;

        // Every query this suite issues is `col = ANY($1)`; find the column
        // by name and keep rows whose value matches one of the bound keys.
        let keys: Vec<String> = match args.first() {
            Some(SqlValue::Array(items)) => items.iter().map(|v| format!("{v:?}")).collect(),
            Some(other) => vec![format!("{other:?}")],
            None => return Ok(rows_to_boxed(table, &table.rows)),
        };

        let fk_col = sql
            .split("WHERE ")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap_or("");
        let col_idx = table.columns.iter().position(|c| *c == fk_col);

        let matched: Vec<Vec<SqlValue>> = match col_idx {
            Some(idx) => table
                .rows
                .iter()
                .filter(|row| keys.contains(&format!("{:?}", row[idx])))
                .cloned()
                .collect(),
            None => table.rows.clone(),
        };

        Ok(rows_to_boxed(table, &matched))
    }
}

fn rows_to_boxed(table: &MemTable, rows: &[Vec<SqlValue>]) -> Vec<Row> {
    rows.iter()
        .map(|values| -> Row {
            Box::new(MemRow {
                columns: table.columns.clone(),
                values: values.clone(),
            })
        })
        .collect()
}
