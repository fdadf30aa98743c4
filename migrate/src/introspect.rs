//! Introspector (C4, spec.md §4.8): builds `TableMetadata` from the live
//! Postgres catalog for every non-system table in the target schema.
//!
//! Grounded on the teacher's `migrations/src/postgres/introspect.rs`: raw
//! catalog queries feed plain `Raw*` row structs, which pure folding
//! functions turn into the canonical schema graph. That split keeps the
//! folding logic testable against hand-built fixtures without a running
//! database (SPEC_FULL.md's test-tooling decision) — only [`introspect`]
//! itself touches an `Executor`.
//!
//! The emitted shape must be structurally equal to what the Tag Parser (C2)
//! produces for an equivalent host type, so the Differ (C5) can diff the two
//! without caring which side it's looking at.

use std::collections::BTreeMap;

use pebble_core::driver::Executor;
use pebble_core::schema::{
    ColumnForeignKey, ColumnMetadata, EnumType, ForeignKeyMetadata, Generated, Identity,
    IdentityGeneration, IndexColumn, IndexMetadata, IndexType, NullsPosition, PrimaryKey,
    ReferentialAction, SortDirection, TableMetadata,
};
use pebble_core::types::SqlType;
use pebble_core::value::SqlValue;

use crate::error::{MigrateError, Result};

/// Raw catalog SQL, one query per entity kind. `$1` is always the target
/// schema name.
pub mod queries {
    pub const TABLES: &str = r#"
        SELECT table_name
        FROM information_schema.tables
        WHERE table_schema = $1 AND table_type = 'BASE TABLE'
        ORDER BY table_name
    "#;

    pub const COLUMNS: &str = r#"
        SELECT
            c.table_name,
            c.column_name,
            CASE WHEN c.data_type = 'ARRAY'
                THEN substring(c.udt_name from 2) || '[]'
                WHEN c.data_type = 'USER-DEFINED'
                THEN c.udt_name
                ELSE c.data_type
            END AS sql_type,
            c.is_nullable = 'YES' AS nullable,
            c.column_default,
            c.is_identity = 'YES' AS is_identity,
            c.identity_generation,
            c.is_generated = 'ALWAYS' AS is_generated,
            c.generation_expression,
            c.ordinal_position,
            c.collation_name
        FROM information_schema.columns c
        WHERE c.table_schema = $1
        ORDER BY c.table_name, c.ordinal_position
    "#;

    /// `pg_constraint` with `unnest(conkey) WITH ORDINALITY` to recover
    /// per-column ordinal position inside composite primary keys.
    pub const PRIMARY_KEYS: &str = r#"
        SELECT
            t.relname AS table_name,
            con.conname AS constraint_name,
            a.attname AS column_name,
            k.ord
        FROM pg_constraint con
        JOIN pg_class t ON t.oid = con.conrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        JOIN unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord) ON true
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
        WHERE con.contype = 'p' AND n.nspname = $1
        ORDER BY t.relname, k.ord
    "#;

    pub const UNIQUE_COLUMNS: &str = r#"
        SELECT
            t.relname AS table_name,
            con.conname AS constraint_name,
            a.attname AS column_name,
            k.ord
        FROM pg_constraint con
        JOIN pg_class t ON t.oid = con.conrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        JOIN unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord) ON true
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
        WHERE con.contype = 'u' AND n.nspname = $1
        ORDER BY t.relname, con.conname, k.ord
    "#;

    pub const CHECK_CONSTRAINTS: &str = r#"
        SELECT
            t.relname AS table_name,
            con.conname AS constraint_name,
            pg_get_expr(con.conbin, con.conrelid) AS expression,
            a.attname AS column_name
        FROM pg_constraint con
        JOIN pg_class t ON t.oid = con.conrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        LEFT JOIN unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord) ON true
        LEFT JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
        WHERE con.contype = 'c' AND n.nspname = $1
        ORDER BY t.relname, con.conname, k.ord
    "#;

    pub const FOREIGN_KEYS: &str = r#"
        SELECT
            t.relname AS table_name,
            con.conname AS constraint_name,
            a.attname AS column_name,
            ft.relname AS target_table,
            fa.attname AS target_column,
            con.confupdtype AS on_update,
            con.confdeltype AS on_delete,
            k.ord
        FROM pg_constraint con
        JOIN pg_class t ON t.oid = con.conrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        JOIN pg_class ft ON ft.oid = con.confrelid
        JOIN unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord) ON true
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
        JOIN unnest(con.confkey) WITH ORDINALITY AS fk(attnum, ord) ON fk.ord = k.ord
        JOIN pg_attribute fa ON fa.attrelid = ft.oid AND fa.attnum = fk.attnum
        WHERE con.contype = 'f' AND n.nspname = $1
        ORDER BY t.relname, con.conname, k.ord
    "#;

    /// Excludes the primary key's own backing index (`indisprimary`) — that
    /// one is already covered by `PRIMARY_KEYS`. Column ordinals come from
    /// `generate_series` over `indkey`'s length since `indkey` is a plain
    /// `int2vector`, not a settable-returning row source.
    pub const INDEXES: &str = r#"
        SELECT
            t.relname AS table_name,
            i.relname AS index_name,
            ix.indisunique AS is_unique,
            am.amname AS method,
            ix.indisvalid AS is_valid,
            pg_get_expr(ix.indpred, ix.indrelid) AS where_clause,
            gs.ord,
            pg_get_indexdef(ix.indexrelid, gs.ord + 1, true) AS column_expr
        FROM pg_index ix
        JOIN pg_class t ON t.oid = ix.indrelid
        JOIN pg_class i ON i.oid = ix.indexrelid
        JOIN pg_am am ON am.oid = i.relam
        JOIN pg_namespace n ON n.oid = t.relnamespace
        CROSS JOIN LATERAL generate_series(0, ix.indnkeyatts - 1) AS gs(ord)
        WHERE NOT ix.indisprimary AND n.nspname = $1
        ORDER BY t.relname, i.relname, gs.ord
    "#;

    pub const ENUMS: &str = r#"
        SELECT t.typname AS enum_name, e.enumlabel AS value, e.enumsortorder
        FROM pg_type t
        JOIN pg_enum e ON e.enumtypid = t.oid
        JOIN pg_namespace n ON n.oid = t.typnamespace
        WHERE n.nspname = $1
        ORDER BY t.typname, e.enumsortorder
    "#;
}

// ---- raw row shapes (plain data, no driver dependency) ---------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RawColumnRow {
    pub table: String,
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub is_identity: bool,
    pub identity_generation: Option<String>,
    pub is_generated: bool,
    pub generation_expression: Option<String>,
    pub collation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawConstraintColumnRow {
    pub table: String,
    pub constraint_name: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawCheckRow {
    pub table: String,
    pub constraint_name: String,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawForeignKeyRow {
    pub table: String,
    pub constraint_name: String,
    pub column: String,
    pub target_table: String,
    pub target_column: String,
    /// Raw `pg_constraint.confupdtype`/`confdeltype` char: `a`, `r`, `c`,
    /// `n`, `d` for no-action/restrict/cascade/set-null/set-default.
    pub on_update: char,
    pub on_delete: char,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawIndexColumnRow {
    pub table: String,
    pub index_name: String,
    pub is_unique: bool,
    pub method: String,
    pub where_clause: Option<String>,
    pub column_expr: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEnumValueRow {
    pub enum_name: String,
    pub value: String,
}

fn action_from_char(c: char) -> ReferentialAction {
    match c {
        'r' => ReferentialAction::Restrict,
        'c' => ReferentialAction::Cascade,
        'n' => ReferentialAction::SetNull,
        'd' => ReferentialAction::SetDefault,
        _ => ReferentialAction::NoAction,
    }
}

/// Folds every raw query result into one `TableMetadata` per table,
/// structurally equal to the Tag Parser's output for the same schema.
#[allow(clippy::too_many_arguments)]
pub fn fold_tables(
    schema: &str,
    table_names: &[String],
    columns: &[RawColumnRow],
    primary_keys: &[RawConstraintColumnRow],
    unique_columns: &[RawConstraintColumnRow],
    checks: &[RawCheckRow],
    foreign_keys: &[RawForeignKeyRow],
    index_columns: &[RawIndexColumnRow],
    enum_values: &[RawEnumValueRow],
) -> Vec<TableMetadata> {
    let enums_by_name = fold_enums(enum_values);

    let pk_by_table = group_constraint_columns(primary_keys);
    let unique_by_table = group_unique_constraints(unique_columns);
    let checks_by_table = group_checks(checks);
    let fks_by_table = group_foreign_keys(foreign_keys);
    let indexes_by_table = group_indexes(index_columns);

    table_names
        .iter()
        .map(|table_name| {
            let mut table = TableMetadata::new(table_name.clone());
            table.schema = schema.to_string();

            let pk_columns = pk_by_table.get(table_name);
            let unique_single: std::collections::HashSet<&str> = unique_by_table
                .get(table_name)
                .map(|groups| {
                    groups
                        .values()
                        .filter(|cols| cols.len() == 1)
                        .map(|cols| cols[0].as_str())
                        .collect()
                })
                .unwrap_or_default();
            let checks_for_table = checks_by_table.get(table_name);

            table.columns = columns
                .iter()
                .filter(|c| &c.table == table_name)
                .map(|raw| fold_column(raw, pk_columns, &unique_single, checks_for_table, &fks_by_table, table_name))
                .collect();

            if let Some((name, cols)) = pk_columns {
                table.primary_key = Some(PrimaryKey {
                    name: name.clone(),
                    columns: cols.clone(),
                });
            }

            table.indexes = indexes_by_table
                .get(table_name)
                .map(|groups| fold_indexes(groups))
                .unwrap_or_default();
            table.indexes.sort_by(|a, b| a.name.cmp(&b.name));

            table.foreign_keys = fks_by_table
                .get(table_name)
                .map(|groups| fold_foreign_keys(groups))
                .unwrap_or_default();
            table.foreign_keys.sort_by(|a, b| a.name.cmp(&b.name));

            table.enum_types = table
                .columns
                .iter()
                .filter_map(|c| enums_by_name.get(&c.sql_type).cloned())
                .collect();

            table
        })
        .collect()
}

fn fold_column(
    raw: &RawColumnRow,
    pk_columns: Option<&(String, Vec<String>)>,
    unique_single: &std::collections::HashSet<&str>,
    checks_for_table: Option<&BTreeMap<String, String>>,
    fks_by_table: &BTreeMap<String, BTreeMap<String, (String, String, Vec<(String, String)>, char, char)>>,
    table_name: &str,
) -> ColumnMetadata {
    let sql_type = SqlType::parse(&raw.sql_type).render();
    let is_pk = pk_columns
        .map(|(_, cols)| cols.iter().any(|c| c == &raw.name))
        .unwrap_or(false);

    let mut column = ColumnMetadata::new(&raw.name, snake_to_pascal(&raw.name), sql_type);
    column.nullable = raw.nullable && !is_pk;
    column.unique = unique_single.contains(raw.name.as_str());
    column.default = raw.default.clone();
    column.is_primary_key = is_pk;
    column.is_jsonb = raw.sql_type.eq_ignore_ascii_case("jsonb") || raw.sql_type.eq_ignore_ascii_case("json");
    column.collation = raw.collation.clone();
    column.auto_increment = raw
        .default
        .as_deref()
        .map(|d| d.contains("nextval("))
        .unwrap_or(false);

    if raw.is_identity {
        column.identity = Some(Identity {
            generation: match raw.identity_generation.as_deref() {
                Some("ALWAYS") => IdentityGeneration::Always,
                _ => IdentityGeneration::ByDefault,
            },
        });
    }

    if raw.is_generated {
        if let Some(expr) = &raw.generation_expression {
            column.generated = Some(Generated {
                expression: expr.clone(),
                stored: true,
            });
        }
    }

    if let Some(checks) = checks_for_table {
        column.check = checks.get(&raw.name).cloned();
    }

    if let Some(fks) = fks_by_table.get(table_name) {
        for (_, (target_table, _name, cols, on_update, on_delete)) in fks {
            if let Some((_, target_col)) = cols.iter().find(|(c, _)| c == &raw.name) {
                if cols.len() == 1 {
                    column.foreign_key = Some(ColumnForeignKey {
                        target_table: target_table.clone(),
                        target_column: target_col.clone(),
                        on_delete: action_from_char(*on_delete),
                        on_update: action_from_char(*on_update),
                    });
                }
            }
        }
    }

    column
}

fn snake_to_pascal(name: &str) -> String {
    name.split('_')
        .filter(|seg| !seg.is_empty())
        .map(|seg| {
            let mut chars = seg.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn group_constraint_columns(rows: &[RawConstraintColumnRow]) -> BTreeMap<String, (String, Vec<String>)> {
    let mut grouped: BTreeMap<String, (String, Vec<String>)> = BTreeMap::new();
    for row in rows {
        let entry = grouped
            .entry(row.table.clone())
            .or_insert_with(|| (row.constraint_name.clone(), Vec::new()));
        entry.1.push(row.column.clone());
    }
    grouped
}

/// Unlike `group_constraint_columns` (one constraint per table, used for
/// primary keys), a table may carry several distinct `UNIQUE` constraints —
/// grouped here by constraint name so columns from unrelated constraints are
/// never merged into one signature.
fn group_unique_constraints(rows: &[RawConstraintColumnRow]) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
    let mut grouped: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.table.clone())
            .or_default()
            .entry(row.constraint_name.clone())
            .or_default()
            .push(row.column.clone());
    }
    grouped
}

fn group_checks(rows: &[RawCheckRow]) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut grouped: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.table.clone())
            .or_default()
            .insert(row.constraint_name.clone(), row.expression.clone());
    }
    grouped
}

type FkGroup = BTreeMap<String, (String, String, Vec<(String, String)>, char, char)>;

fn group_foreign_keys(rows: &[RawForeignKeyRow]) -> BTreeMap<String, FkGroup> {
    let mut grouped: BTreeMap<String, FkGroup> = BTreeMap::new();
    for row in rows {
        let entry = grouped
            .entry(row.table.clone())
            .or_default()
            .entry(row.constraint_name.clone())
            .or_insert_with(|| {
                (
                    row.target_table.clone(),
                    row.constraint_name.clone(),
                    Vec::new(),
                    row.on_update,
                    row.on_delete,
                )
            });
        entry.2.push((row.column.clone(), row.target_column.clone()));
    }
    grouped
}

fn fold_foreign_keys(groups: &FkGroup) -> Vec<ForeignKeyMetadata> {
    groups
        .iter()
        .map(|(name, (target_table, _, cols, on_update, on_delete))| ForeignKeyMetadata {
            name: name.clone(),
            columns: cols.iter().map(|(c, _)| c.clone()).collect(),
            target_table: target_table.clone(),
            target_columns: cols.iter().map(|(_, t)| t.clone()).collect(),
            on_delete: action_from_char(*on_delete),
            on_update: action_from_char(*on_update),
        })
        .collect()
}

fn group_indexes(rows: &[RawIndexColumnRow]) -> BTreeMap<String, BTreeMap<String, Vec<RawIndexColumnRow>>> {
    let mut grouped: BTreeMap<String, BTreeMap<String, Vec<RawIndexColumnRow>>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.table.clone())
            .or_default()
            .entry(row.index_name.clone())
            .or_default()
            .push(row.clone());
    }
    grouped
}

/// Single-column unique indexes fold into `ColumnMetadata::unique` instead
/// (handled in `fold_column` via `unique_single`), so only indexes with more
/// than one column, or non-unique indexes, end up in `TableMetadata::indexes`
/// — matching what the Tag Parser can express (spec.md §4.2 has no
/// multi-column `unique` bare option, only `index(...)`).
fn fold_indexes(groups: &BTreeMap<String, Vec<RawIndexColumnRow>>) -> Vec<IndexMetadata> {
    groups
        .values()
        .filter(|cols| !(cols.len() == 1 && cols[0].is_unique))
        .map(|cols| {
            let first = &cols[0];
            IndexMetadata {
                name: first.index_name.clone(),
                columns: cols
                    .iter()
                    .map(|c| IndexColumn {
                        expression: c.column_expr.clone(),
                        direction: SortDirection::Asc,
                        nulls: NullsPosition::Default,
                        operator_class: None,
                    })
                    .collect(),
                include: Vec::new(),
                r#where: first.where_clause.clone(),
                index_type: IndexType::parse(&first.method),
                unique: first.is_unique,
                concurrent: false,
            }
        })
        .collect()
}

fn fold_enums(rows: &[RawEnumValueRow]) -> BTreeMap<String, EnumType> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.enum_name.clone()).or_default().push(row.value.clone());
    }
    grouped
        .into_iter()
        .map(|(name, values)| {
            (
                name.clone(),
                EnumType {
                    name,
                    values,
                },
            )
        })
        .collect()
}

// ---- driver-backed entry point ---------------------------------------------

fn text(row: &pebble_core::driver::Row, idx: usize) -> Result<String> {
    match row.value(idx).map_err(MigrateError::Driver)? {
        SqlValue::Text(s) => Ok(s),
        SqlValue::Null => Ok(String::new()),
        other => Ok(other.type_name().to_string()),
    }
}

fn opt_text(row: &pebble_core::driver::Row, idx: usize) -> Result<Option<String>> {
    match row.value(idx).map_err(MigrateError::Driver)? {
        SqlValue::Null => Ok(None),
        SqlValue::Text(s) => Ok(Some(s)),
        other => Ok(Some(other.type_name().to_string())),
    }
}

fn boolean(row: &pebble_core::driver::Row, idx: usize) -> Result<bool> {
    match row.value(idx).map_err(MigrateError::Driver)? {
        SqlValue::Bool(b) => Ok(b),
        _ => Ok(false),
    }
}

/// Queries the live catalog and builds one `TableMetadata` per non-system
/// table in `schema` (spec.md §4.8). The heavy lifting is in [`fold_tables`];
/// this function only shuttles rows from `executor` into the `Raw*` shapes
/// it expects.
pub async fn introspect(executor: &dyn Executor, schema: &str) -> Result<Vec<TableMetadata>> {
    let args = [SqlValue::Text(schema.to_string())];

    let table_rows = executor
        .query(queries::TABLES, &args)
        .await
        .map_err(|e| MigrateError::introspection("TABLES", e))?;
    let table_names: Vec<String> = table_rows.iter().map(|r| text(r, 0)).collect::<Result<_>>()?;

    let column_rows = executor
        .query(queries::COLUMNS, &args)
        .await
        .map_err(|e| MigrateError::introspection("COLUMNS", e))?;
    let columns = column_rows
        .iter()
        .map(|r| {
            Ok(RawColumnRow {
                table: text(r, 0)?,
                name: text(r, 1)?,
                sql_type: text(r, 2)?,
                nullable: boolean(r, 3)?,
                default: opt_text(r, 4)?,
                is_identity: boolean(r, 5)?,
                identity_generation: opt_text(r, 6)?,
                is_generated: boolean(r, 7)?,
                generation_expression: opt_text(r, 8)?,
                collation: opt_text(r, 10)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let pk_rows = executor
        .query(queries::PRIMARY_KEYS, &args)
        .await
        .map_err(|e| MigrateError::introspection("PRIMARY_KEYS", e))?;
    let primary_keys = constraint_columns(&pk_rows)?;

    let unique_rows = executor
        .query(queries::UNIQUE_COLUMNS, &args)
        .await
        .map_err(|e| MigrateError::introspection("UNIQUE_COLUMNS", e))?;
    let unique_columns = constraint_columns(&unique_rows)?;

    let check_rows = executor
        .query(queries::CHECK_CONSTRAINTS, &args)
        .await
        .map_err(|e| MigrateError::introspection("CHECK_CONSTRAINTS", e))?;
    let checks = check_rows
        .iter()
        .map(|r| {
            Ok(RawCheckRow {
                table: text(r, 0)?,
                constraint_name: text(r, 1)?,
                expression: text(r, 2)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let fk_rows = executor
        .query(queries::FOREIGN_KEYS, &args)
        .await
        .map_err(|e| MigrateError::introspection("FOREIGN_KEYS", e))?;
    let foreign_keys = fk_rows
        .iter()
        .map(|r| {
            Ok(RawForeignKeyRow {
                table: text(r, 0)?,
                constraint_name: text(r, 1)?,
                column: text(r, 2)?,
                target_table: text(r, 3)?,
                target_column: text(r, 4)?,
                on_update: text(r, 5)?.chars().next().unwrap_or('a'),
                on_delete: text(r, 6)?.chars().next().unwrap_or('a'),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let index_rows = executor
        .query(queries::INDEXES, &args)
        .await
        .map_err(|e| MigrateError::introspection("INDEXES", e))?;
    let index_columns = index_rows
        .iter()
        .map(|r| {
            Ok(RawIndexColumnRow {
                table: text(r, 0)?,
                index_name: text(r, 1)?,
                is_unique: boolean(r, 2)?,
                method: text(r, 3)?,
                where_clause: opt_text(r, 5)?,
                column_expr: text(r, 7)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let enum_rows = executor
        .query(queries::ENUMS, &args)
        .await
        .map_err(|e| MigrateError::introspection("ENUMS", e))?;
    let enum_values = enum_rows
        .iter()
        .map(|r| {
            Ok(RawEnumValueRow {
                enum_name: text(r, 0)?,
                value: text(r, 1)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(fold_tables(
        schema,
        &table_names,
        &columns,
        &primary_keys,
        &unique_columns,
        &checks,
        &foreign_keys,
        &index_columns,
        &enum_values,
    ))
}

fn constraint_columns(rows: &[pebble_core::driver::Row]) -> Result<Vec<RawConstraintColumnRow>> {
    rows.iter()
        .map(|r| {
            Ok(RawConstraintColumnRow {
                table: text(r, 0)?,
                constraint_name: text(r, 1)?,
                column: text(r, 2)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_columns() -> Vec<RawColumnRow> {
        vec![
            RawColumnRow {
                table: "users".into(),
                name: "id".into(),
                sql_type: "uuid".into(),
                nullable: false,
                default: Some("gen_random_uuid()".into()),
                is_identity: false,
                identity_generation: None,
                is_generated: false,
                generation_expression: None,
                collation: None,
            },
            RawColumnRow {
                table: "users".into(),
                name: "email".into(),
                sql_type: "text".into(),
                nullable: false,
                default: None,
                is_identity: false,
                identity_generation: None,
                is_generated: false,
                generation_expression: None,
                collation: None,
            },
            RawColumnRow {
                table: "users".into(),
                name: "tenant_seq".into(),
                sql_type: "bigint".into(),
                nullable: false,
                default: None,
                is_identity: true,
                identity_generation: Some("BY DEFAULT".into()),
                is_generated: false,
                generation_expression: None,
                collation: None,
            },
        ]
    }

    #[test]
    fn folds_primary_key_and_identity() {
        let tables = fold_tables(
            "public",
            &["users".to_string()],
            &users_columns(),
            &[RawConstraintColumnRow {
                table: "users".into(),
                constraint_name: "users_pkey".into(),
                column: "id".into(),
            }],
            &[RawConstraintColumnRow {
                table: "users".into(),
                constraint_name: "users_email_key".into(),
                column: "email".into(),
            }],
            &[],
            &[],
            &[],
            &[],
        );
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.primary_key.as_ref().unwrap().columns, vec!["id"]);
        let id = table.column("id").unwrap();
        assert!(id.is_primary_key);
        assert!(!id.nullable, "primary key columns are never nullable");
        let email = table.column("email").unwrap();
        assert!(email.unique);
        let seq = table.column("tenant_seq").unwrap();
        assert_eq!(
            seq.identity.as_ref().unwrap().generation,
            IdentityGeneration::ByDefault
        );
    }

    #[test]
    fn multi_column_unique_becomes_index_not_column_flag() {
        let tables = fold_tables(
            "public",
            &["memberships".to_string()],
            &[
                RawColumnRow {
                    table: "memberships".into(),
                    name: "org_id".into(),
                    sql_type: "uuid".into(),
                    nullable: false,
                    default: None,
                    is_identity: false,
                    identity_generation: None,
                    is_generated: false,
                    generation_expression: None,
                    collation: None,
                },
                RawColumnRow {
                    table: "memberships".into(),
                    name: "user_id".into(),
                    sql_type: "uuid".into(),
                    nullable: false,
                    default: None,
                    is_identity: false,
                    identity_generation: None,
                    is_generated: false,
                    generation_expression: None,
                    collation: None,
                },
            ],
            &[],
            &[
                RawConstraintColumnRow {
                    table: "memberships".into(),
                    constraint_name: "memberships_org_id_user_id_key".into(),
                    column: "org_id".into(),
                },
                RawConstraintColumnRow {
                    table: "memberships".into(),
                    constraint_name: "memberships_org_id_user_id_key".into(),
                    column: "user_id".into(),
                },
            ],
            &[],
            &[],
            &[],
            &[],
        );
        let table = &tables[0];
        assert!(!table.column("org_id").unwrap().unique);
        assert!(!table.column("user_id").unwrap().unique);
        assert_eq!(table.indexes.len(), 1);
        assert!(table.indexes[0].unique);
        assert_eq!(table.indexes[0].columns.len(), 2);
    }

    #[test]
    fn folds_enum_column() {
        let tables = fold_tables(
            "public",
            &["orders".to_string()],
            &[RawColumnRow {
                table: "orders".into(),
                name: "status".into(),
                sql_type: "order_status".into(),
                nullable: false,
                default: None,
                is_identity: false,
                identity_generation: None,
                is_generated: false,
                generation_expression: None,
                collation: None,
            }],
            &[],
            &[],
            &[],
            &[],
            &[],
            &[
                RawEnumValueRow {
                    enum_name: "order_status".into(),
                    value: "pending".into(),
                },
                RawEnumValueRow {
                    enum_name: "order_status".into(),
                    value: "shipped".into(),
                },
            ],
        );
        let table = &tables[0];
        assert_eq!(table.enum_types.len(), 1);
        assert_eq!(table.enum_types[0].values, vec!["pending", "shipped"]);
    }
}
