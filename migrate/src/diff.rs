//! Differ (C5, spec.md §4.9): structural diff of two `TableMetadata` sets.
//!
//! Grounded on the teacher's `migrations/src/postgres/diff.rs` — HashMap
//! keyed add/drop/altered comparisons at every level — generalized to
//! operate on `pebble_core::schema::TableMetadata` directly instead of a
//! drizzle-kit entity snapshot, and ordered deterministically per spec.md
//! §4.9 ("columns by declared order, indexes and foreign keys by name
//! lexicographically") rather than left to `HashMap` iteration order.

use std::collections::HashMap;

use tracing::debug;

use pebble_core::schema::{ColumnMetadata, EnumType, ForeignKeyMetadata, IndexMetadata, TableMetadata};

use crate::error::{MigrateError, Result};

/// Full diff between the in-code schema and the introspected database
/// schema (spec.md §4.9).
#[derive(Debug, Clone, Default)]
pub struct SchemaDiff {
    pub tables_added: Vec<TableMetadata>,
    pub tables_dropped: Vec<String>,
    pub tables_modified: Vec<TableDiff>,
}

impl SchemaDiff {
    pub fn has_changes(&self) -> bool {
        !self.tables_added.is_empty()
            || !self.tables_dropped.is_empty()
            || self.tables_modified.iter().any(TableDiff::has_changes)
    }

    pub fn is_empty(&self) -> bool {
        !self.has_changes()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableDiff {
    pub name: String,
    pub schema: String,
    pub columns_added: Vec<ColumnMetadata>,
    pub columns_dropped: Vec<String>,
    pub columns_modified: Vec<ColumnDiff>,
    pub indexes_added: Vec<IndexMetadata>,
    pub indexes_dropped: Vec<IndexMetadata>,
    pub foreign_keys_added: Vec<ForeignKeyMetadata>,
    pub foreign_keys_dropped: Vec<ForeignKeyMetadata>,
    pub enum_values_added: Vec<EnumValuesAdded>,
}

impl TableDiff {
    pub fn has_changes(&self) -> bool {
        !self.columns_added.is_empty()
            || !self.columns_dropped.is_empty()
            || !self.columns_modified.is_empty()
            || !self.indexes_added.is_empty()
            || !self.indexes_dropped.is_empty()
            || !self.foreign_keys_added.is_empty()
            || !self.foreign_keys_dropped.is_empty()
            || !self.enum_values_added.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ColumnDiff {
    pub name: String,
    pub old: ColumnMetadata,
    pub new: ColumnMetadata,
}

#[derive(Debug, Clone)]
pub struct EnumValuesAdded {
    pub enum_name: String,
    pub values: Vec<String>,
}

/// Compares `code` (built by the Tag Parser) against `db` (built by the
/// Introspector) and produces a `SchemaDiff`, or `SchemaDriftUnrepresentable`
/// if an enum had a value removed or reordered — Postgres cannot drop an
/// enum member without recreating the type (spec.md §4.9, §7).
pub fn diff_schemas(code: &[TableMetadata], db: &[TableMetadata]) -> Result<SchemaDiff> {
    let code_by_name: HashMap<&str, &TableMetadata> = code.iter().map(|t| (t.name.as_str(), t)).collect();
    let db_by_name: HashMap<&str, &TableMetadata> = db.iter().map(|t| (t.name.as_str(), t)).collect();

    let mut tables_added: Vec<TableMetadata> = code
        .iter()
        .filter(|t| !db_by_name.contains_key(t.name.as_str()))
        .cloned()
        .collect();
    tables_added.sort_by(|a, b| a.name.cmp(&b.name));

    let mut tables_dropped: Vec<String> = db
        .iter()
        .filter(|t| !code_by_name.contains_key(t.name.as_str()))
        .map(|t| t.name.clone())
        .collect();
    tables_dropped.sort();

    let mut common_names: Vec<&str> = code_by_name
        .keys()
        .filter(|name| db_by_name.contains_key(*name))
        .copied()
        .collect();
    common_names.sort();

    let mut tables_modified = Vec::new();
    for name in common_names {
        let diff = diff_table(code_by_name[name], db_by_name[name])?;
        if diff.has_changes() {
            tables_modified.push(diff);
        }
    }

    debug!(
        tables_added = tables_added.len(),
        tables_dropped = tables_dropped.len(),
        tables_modified = tables_modified.len(),
        "pebble.diff"
    );

    Ok(SchemaDiff {
        tables_added,
        tables_dropped,
        tables_modified,
    })
}

fn diff_table(code: &TableMetadata, db: &TableMetadata) -> Result<TableDiff> {
    let code_cols: HashMap<&str, &ColumnMetadata> = code.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let db_cols: HashMap<&str, &ColumnMetadata> = db.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    // Columns kept in declared (code) order, per spec.md §4.9.
    let columns_added: Vec<ColumnMetadata> = code
        .columns
        .iter()
        .filter(|c| !db_cols.contains_key(c.name.as_str()))
        .cloned()
        .collect();

    let mut columns_dropped: Vec<String> = db
        .columns
        .iter()
        .filter(|c| !code_cols.contains_key(c.name.as_str()))
        .map(|c| c.name.clone())
        .collect();
    columns_dropped.sort();

    let columns_modified: Vec<ColumnDiff> = code
        .columns
        .iter()
        .filter_map(|new| {
            let old = db_cols.get(new.name.as_str())?;
            if *old != new {
                Some(ColumnDiff {
                    name: new.name.clone(),
                    old: (*old).clone(),
                    new: new.clone(),
                })
            } else {
                None
            }
        })
        .collect();

    let code_idx: HashMap<&str, &IndexMetadata> = code.indexes.iter().map(|i| (i.name.as_str(), i)).collect();
    let db_idx: HashMap<&str, &IndexMetadata> = db.indexes.iter().map(|i| (i.name.as_str(), i)).collect();

    // Name *and* structural signature both have to match, or it's a
    // drop+add (spec.md §4.9: "a rename with identical body is a
    // drop+add").
    let mut indexes_added: Vec<IndexMetadata> = code
        .indexes
        .iter()
        .filter(|i| db_idx.get(i.name.as_str()).copied() != Some(i))
        .cloned()
        .collect();
    indexes_added.sort_by(|a, b| a.name.cmp(&b.name));

    let mut indexes_dropped: Vec<IndexMetadata> = db
        .indexes
        .iter()
        .filter(|i| code_idx.get(i.name.as_str()).copied() != Some(i))
        .cloned()
        .collect();
    indexes_dropped.sort_by(|a, b| a.name.cmp(&b.name));

    let code_fk: HashMap<&str, &ForeignKeyMetadata> = code.foreign_keys.iter().map(|f| (f.name.as_str(), f)).collect();
    let db_fk: HashMap<&str, &ForeignKeyMetadata> = db.foreign_keys.iter().map(|f| (f.name.as_str(), f)).collect();

    let mut foreign_keys_added: Vec<ForeignKeyMetadata> = code
        .foreign_keys
        .iter()
        .filter(|f| db_fk.get(f.name.as_str()).copied() != Some(f))
        .cloned()
        .collect();
    foreign_keys_added.sort_by(|a, b| a.name.cmp(&b.name));

    let mut foreign_keys_dropped: Vec<ForeignKeyMetadata> = db
        .foreign_keys
        .iter()
        .filter(|f| code_fk.get(f.name.as_str()).copied() != Some(f))
        .cloned()
        .collect();
    foreign_keys_dropped.sort_by(|a, b| a.name.cmp(&b.name));

    let enum_values_added = diff_enums(&code.enum_types, &db.enum_types)?;

    Ok(TableDiff {
        name: code.name.clone(),
        schema: code.schema.clone(),
        columns_added,
        columns_dropped,
        columns_modified,
        indexes_added,
        indexes_dropped,
        foreign_keys_added,
        foreign_keys_dropped,
        enum_values_added,
    })
}

fn diff_enums(code: &[EnumType], db: &[EnumType]) -> Result<Vec<EnumValuesAdded>> {
    let db_by_name: HashMap<&str, &EnumType> = db.iter().map(|e| (e.name.as_str(), e)).collect();
    let mut result = Vec::new();
    for code_enum in code {
        let Some(db_enum) = db_by_name.get(code_enum.name.as_str()) else {
            continue;
        };
        let removed_or_reordered = db_enum.values.len() > code_enum.values.len()
            || db_enum
                .values
                .iter()
                .zip(code_enum.values.iter())
                .any(|(old, new)| old != new);
        if removed_or_reordered {
            return Err(MigrateError::SchemaDriftUnrepresentable(
                format!(
                    "enum '{}' changed from {:?} to {:?}: Postgres cannot remove or reorder enum values without recreating the type",
                    code_enum.name, db_enum.values, code_enum.values
                )
                .into(),
            ));
        }
        let added: Vec<String> = code_enum.values[db_enum.values.len()..].to_vec();
        if !added.is_empty() {
            result.push(EnumValuesAdded {
                enum_name: code_enum.name.clone(),
                values: added,
            });
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pebble_core::schema::{ColumnMetadata, IndexColumn};

    fn table(name: &str, columns: Vec<ColumnMetadata>) -> TableMetadata {
        let mut t = TableMetadata::new(name);
        t.columns = columns;
        t
    }

    #[test]
    fn diff_is_symmetric_and_empty_for_identical_schemas() {
        let t = table("users", vec![ColumnMetadata::new("id", "Id", "uuid")]);
        let diff = diff_schemas(std::slice::from_ref(&t), std::slice::from_ref(&t)).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn detects_added_and_dropped_tables() {
        let code = vec![table("users", vec![])];
        let db = vec![table("legacy", vec![])];
        let diff = diff_schemas(&code, &db).unwrap();
        assert_eq!(diff.tables_added.len(), 1);
        assert_eq!(diff.tables_dropped, vec!["legacy".to_string()]);
    }

    #[test]
    fn detects_added_and_dropped_columns() {
        let code = vec![table(
            "users",
            vec![ColumnMetadata::new("id", "Id", "uuid"), ColumnMetadata::new("email", "Email", "text")],
        )];
        let db = vec![table(
            "users",
            vec![ColumnMetadata::new("id", "Id", "uuid"), ColumnMetadata::new("legacy_col", "LegacyCol", "text")],
        )];
        let diff = diff_schemas(&code, &db).unwrap();
        assert_eq!(diff.tables_modified.len(), 1);
        let t = &diff.tables_modified[0];
        assert_eq!(t.columns_added.len(), 1);
        assert_eq!(t.columns_added[0].name, "email");
        assert_eq!(t.columns_dropped, vec!["legacy_col".to_string()]);
    }

    #[test]
    fn index_rename_with_same_body_is_drop_plus_add() {
        let mut old_idx = IndexMetadata {
            name: "idx_users_email_old".into(),
            columns: vec![IndexColumn::new("email")],
            include: vec![],
            r#where: None,
            index_type: pebble_core::schema::IndexType::Btree,
            unique: false,
            concurrent: false,
        };
        let mut new_idx = old_idx.clone();
        new_idx.name = "idx_users_email".into();

        let mut code_table = table("users", vec![]);
        code_table.indexes = vec![new_idx.clone()];
        let mut db_table = table("users", vec![]);
        old_idx.name = "idx_users_email_old".into();
        db_table.indexes = vec![old_idx];

        let diff = diff_schemas(std::slice::from_ref(&code_table), std::slice::from_ref(&db_table)).unwrap();
        let t = &diff.tables_modified[0];
        assert_eq!(t.indexes_added.len(), 1);
        assert_eq!(t.indexes_dropped.len(), 1);
    }

    #[test]
    fn enum_value_removal_is_a_hard_error() {
        let mut code_table = table("orders", vec![]);
        code_table.enum_types = vec![EnumType {
            name: "order_status".into(),
            values: vec!["pending".into()],
        }];
        let mut db_table = table("orders", vec![]);
        db_table.enum_types = vec![EnumType {
            name: "order_status".into(),
            values: vec!["pending".into(), "shipped".into()],
        }];
        let err = diff_schemas(std::slice::from_ref(&code_table), std::slice::from_ref(&db_table)).unwrap_err();
        assert!(matches!(err, MigrateError::SchemaDriftUnrepresentable(_)));
    }

    #[test]
    fn enum_value_addition_is_append_only() {
        let mut code_table = table("orders", vec![]);
        code_table.enum_types = vec![EnumType {
            name: "order_status".into(),
            values: vec!["pending".into(), "shipped".into()],
        }];
        let mut db_table = table("orders", vec![]);
        db_table.enum_types = vec![EnumType {
            name: "order_status".into(),
            values: vec!["pending".into()],
        }];
        let diff = diff_schemas(std::slice::from_ref(&code_table), std::slice::from_ref(&db_table)).unwrap();
        let t = &diff.tables_modified[0];
        assert_eq!(t.enum_values_added.len(), 1);
        assert_eq!(t.enum_values_added[0].values, vec!["shipped".to_string()]);
    }
}
