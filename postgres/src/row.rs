//! `ColumnSource` adapter over `tokio_postgres::Row` (spec.md §6).

use pebble_core::driver::Row as DynRow;
use pebble_core::error::Result;
use pebble_core::scanner::ColumnSource;
use pebble_core::value::SqlValue;

use crate::value::column_value;

pub(crate) struct PgRow(tokio_postgres::Row);

impl PgRow {
    pub(crate) fn boxed(row: tokio_postgres::Row) -> DynRow {
        Box::new(PgRow(row))
    }
}

impl ColumnSource for PgRow {
    fn column_count(&self) -> usize {
        self.0.columns().len()
    }

    fn column_name(&self, idx: usize) -> &str {
        self.0.columns()[idx].name()
    }

    fn value(&self, idx: usize) -> Result<SqlValue> {
        column_value(&self.0, idx)
    }
}
