//! Scanner / Valuer (C7, spec.md §4.4): row -> record and record -> column
//! value conversion, JSONB marshal/unmarshal, and the smart-default
//! omission rule applied at INSERT time.

use compact_str::CompactString;

use crate::error::{Error, Result};
use crate::schema::{ColumnMetadata, TableMetadata};
use crate::value::SqlValue;

/// A driver-agnostic view over one result row: column descriptors plus
/// per-column value access, aligned to the row's own column order (which
/// need not match `TableMetadata::columns` order — the scanner looks each
/// target up by name).
pub trait ColumnSource {
    fn column_count(&self) -> usize;
    fn column_name(&self, idx: usize) -> &str;
    fn value(&self, idx: usize) -> Result<SqlValue>;

    fn index_of(&self, name: &str) -> Option<usize> {
        (0..self.column_count()).find(|&i| self.column_name(i) == name)
    }
}

/// Implemented (typically via `#[derive(Table)]`) by a host record type that
/// can be built from a scanned row.
///
/// Discovers column descriptors from the driver, builds a sparse target set
/// aligned to the row's own column order via `ColumnMetadata::go_field`, and
/// drops unknown/missing columns (spec.md §4.4). JSONB decode and
/// null-handling for JSONB columns are the generated impl's responsibility;
/// `decode_json` below is the shared helper it calls.
pub trait FromRow: Sized {
    fn from_row(src: &dyn ColumnSource) -> Result<Self>;
}

/// Decodes a JSONB/JSON column's text payload into `T`. A SQL `NULL` column
/// yields `Ok(None)`; generated code unwraps that into a zero-valued field
/// or a `None` pointer per the host field's own nullability (spec.md §4.4).
#[cfg(feature = "json")]
pub fn decode_json<T: serde::de::DeserializeOwned>(value: &SqlValue) -> Result<Option<T>> {
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Json(text) | SqlValue::Text(text) => {
            Ok(Some(serde_json::from_str(text).map_err(Error::from)?))
        }
        other => Err(Error::metadata(format!(
            "expected JSON text for jsonb column, found {}",
            other.type_name()
        ))),
    }
}

/// Encodes `value` to a JSON text `SqlValue` (never a byte array — Postgres
/// accepts text directly as `jsonb`; a byte array is liable to be
/// re-encoded as `bytea` by the wire driver, per spec.md §4.4).
#[cfg(feature = "json")]
pub fn encode_json<T: serde::Serialize>(value: &T) -> Result<SqlValue> {
    Ok(SqlValue::Json(serde_json::to_string(value).map_err(Error::from)?))
}

/// One column's raw value and whether the host field held its zero value,
/// as computed by the generated `ToRow` impl (host-type zero-ness, e.g. via
/// `T: Default + PartialEq`, not merely `SqlValue`-level emptiness).
#[derive(Debug, Clone)]
pub struct FieldValue {
    pub column: String,
    pub value: SqlValue,
    pub is_zero: bool,
}

impl FieldValue {
    pub fn new(column: impl Into<String>, value: impl Into<SqlValue>, is_zero: bool) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
            is_zero,
        }
    }
}

/// Implemented (typically via `#[derive(Table)]`) by a host record type that
/// can be decomposed into column/value pairs for INSERT and UPDATE.
pub trait ToRow {
    /// All declared columns in declared order, each flagged with whether the
    /// host field held its zero value.
    fn to_fields(&self) -> Vec<FieldValue>;
}

/// Applies the smart-default rule (spec.md §3.1, §4.4) to produce the
/// `(columns, values)` pair for an INSERT: a column is omitted when the
/// host value is zero *and* the column has either a server-side default, an
/// identity clause, or is an auto-increment primary key.
pub fn project_insert(metadata: &TableMetadata, fields: &[FieldValue]) -> (Vec<String>, Vec<SqlValue>) {
    let mut columns = Vec::with_capacity(fields.len());
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        if field.is_zero && should_omit(metadata, &field.column) {
            continue;
        }
        columns.push(field.column.clone());
        values.push(field.value.clone());
    }
    (columns, values)
}

fn should_omit(metadata: &TableMetadata, column: &str) -> bool {
    metadata
        .column(column)
        .map(ColumnMetadata::has_smart_default)
        .unwrap_or(false)
}

/// Validates that every row in a multi-row INSERT projects onto the same
/// column set as the first row (spec.md §4.6: `InsertShapeMismatch`).
pub fn check_uniform_shape(rows: &[Vec<String>]) -> Result<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    for (i, row) in rows.iter().enumerate().skip(1) {
        if row != first {
            return Err(Error::InsertShapeMismatch {
                row: i,
                expected: first.iter().map(CompactString::from).collect(),
                found: row.iter().map(CompactString::from).collect(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnMetadata;

    fn users_table() -> TableMetadata {
        let mut t = TableMetadata::new("users");
        let mut id = ColumnMetadata::new("id", "ID", "uuid");
        id.is_primary_key = true;
        id.default = Some("gen_random_uuid()".into());
        let email = ColumnMetadata::new("email", "Email", "text");
        let mut age = ColumnMetadata::new("age", "Age", "integer");
        age.nullable = false;
        let mut created_at = ColumnMetadata::new("created_at", "CreatedAt", "timestamptz");
        created_at.default = Some("now()".into());
        t.columns = vec![id, email, age, created_at];
        t
    }

    #[test]
    fn omits_defaulted_zero_columns() {
        let table = users_table();
        let fields = vec![
            FieldValue::new("id", SqlValue::Text(String::new()), true),
            FieldValue::new("email", "a@b.c", false),
            FieldValue::new("age", 28i32, false),
            FieldValue::new("created_at", SqlValue::Null, true),
        ];
        let (columns, values) = project_insert(&table, &fields);
        assert_eq!(columns, vec!["email", "age"]);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn includes_nonzero_defaulted_column() {
        let table = users_table();
        let fields = vec![FieldValue::new(
            "created_at",
            SqlValue::Text("2024-01-01T00:00:00Z".into()),
            false,
        )];
        let (columns, _) = project_insert(&table, &fields);
        assert_eq!(columns, vec!["created_at"]);
    }

    #[test]
    fn detects_shape_mismatch() {
        let rows = vec![
            vec!["email".to_string(), "age".to_string()],
            vec!["email".to_string()],
        ];
        let err = check_uniform_shape(&rows).unwrap_err();
        assert!(matches!(err, Error::InsertShapeMismatch { .. }));
    }
}
