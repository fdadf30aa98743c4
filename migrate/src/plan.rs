//! Planner (C6, spec.md §4.10): turns a `SchemaDiff` into ordered,
//! idempotent forward (`up`) and reverse (`down`) DDL scripts.
//!
//! Grounded on the teacher's `migrations/src/sqlgen/postgres.rs`: direct
//! SQL-string generation off the diff, one function per DDL shape, rather
//! than an intermediate JSON statement format. `CREATE INDEX CONCURRENTLY`
//! is carved out as a sibling, non-transactional statement per spec.md
//! §4.10 rather than bundled into the same batch as everything else.

use tracing::debug;

use pebble_core::schema::{
    ColumnMetadata, ForeignKeyMetadata, IndexColumn, IndexMetadata, NullsPosition, SortDirection, TableMetadata,
};

use crate::diff::{ColumnDiff, SchemaDiff, TableDiff};

/// Options controlling DDL emission (spec.md §4.10). Defaults match the
/// spec's stated defaults exactly.
#[derive(Debug, Clone)]
pub struct PlannerOptions {
    pub if_not_exists: bool,
    pub concurrent: bool,
    pub include_downs: bool,
    /// Schema new tables are assumed to live in (SPEC_FULL.md §3 expansion).
    pub schema: String,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            if_not_exists: true,
            concurrent: false,
            include_downs: true,
            schema: "public".to_string(),
        }
    }
}

/// The two DDL scripts a single migration plan emits. Transactional
/// statements and `CREATE INDEX CONCURRENTLY` siblings are kept apart so a
/// caller can wrap the former in a transaction while running the latter
/// outside one (spec.md §4.10).
#[derive(Debug, Clone, Default)]
pub struct MigrationScript {
    pub transactional: Vec<String>,
    pub concurrent: Vec<String>,
}

impl MigrationScript {
    /// Every statement, transactional first then concurrent, each already
    /// `;`-terminated — the shape written to a single `.sql` file (spec.md
    /// §6, "Migration file layout").
    pub fn statements(&self) -> Vec<String> {
        self.transactional
            .iter()
            .chain(self.concurrent.iter())
            .cloned()
            .collect()
    }
}

/// A drafted plan: up and down scripts for one `SchemaDiff` (spec.md §4.10
/// state machine: `Drafted -> Applied` or `Drafted -> Reverted`; the Planner
/// only ever produces the `Drafted` state — it does not execute).
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    pub up: MigrationScript,
    pub down: MigrationScript,
}

fn qualify(schema: &str, name: &str) -> String {
    if schema.is_empty() || schema == "public" {
        format!("\"{name}\"")
    } else {
        format!("\"{schema}\".\"{name}\"")
    }
}

fn if_not_exists(enabled: bool) -> &'static str {
    if enabled {
        "IF NOT EXISTS "
    } else {
        ""
    }
}

fn if_exists(enabled: bool) -> &'static str {
    if enabled {
        "IF EXISTS "
    } else {
        ""
    }
}

/// Plans `diff` into up/down scripts per `options` (spec.md §4.10).
pub fn plan_migration(diff: &SchemaDiff, options: &PlannerOptions) -> MigrationPlan {
    let mut plan = MigrationPlan::default();
    let mut enums_created = std::collections::HashSet::new();

    // Up: enum creates before table creates; table creates before index
    // creates; new foreign keys last. A new table's enum types can be
    // shared with another new table in the same batch, so dedupe by name.
    for table in &diff.tables_added {
        for enum_type in &table.enum_types {
            if enums_created.insert(enum_type.name.clone()) {
                plan.up
                    .transactional
                    .push(create_enum_sql(&table.schema, &enum_type.name, &enum_type.values));
            }
        }
    }
    for table in &diff.tables_added {
        plan.up.transactional.push(create_table_sql(table, options));
    }
    for table in &diff.tables_added {
        for index in &table.indexes {
            push_create_index(&mut plan.up, &table.schema, &table.name, index, options);
        }
    }
    for table in &diff.tables_added {
        for fk in &table.foreign_keys {
            plan.up
                .transactional
                .push(add_foreign_key_sql(&table.schema, &table.name, fk, options));
        }
    }

    for table_diff in &diff.tables_modified {
        plan.up.transactional.extend(alter_table_up(table_diff, options));
        for added in &table_diff.enum_values_added {
            for value in &added.values {
                plan.up.transactional.push(format!(
                    "ALTER TYPE {} ADD VALUE IF NOT EXISTS '{}';",
                    qualify(&table_diff.schema, &added.enum_name),
                    escape_literal(value)
                ));
            }
        }
        for index in &table_diff.indexes_added {
            push_create_index(&mut plan.up, &table_diff.schema, &table_diff.name, index, options);
        }
        for index in &table_diff.indexes_dropped {
            plan.up
                .transactional
                .push(drop_index_sql(&table_diff.schema, &index.name, options));
        }
        for fk in &table_diff.foreign_keys_added {
            plan.up
                .transactional
                .push(add_foreign_key_sql(&table_diff.schema, &table_diff.name, fk, options));
        }
        for fk in &table_diff.foreign_keys_dropped {
            plan.up
                .transactional
                .push(drop_constraint_sql(&table_diff.schema, &table_diff.name, &fk.name, options));
        }
    }

    for name in &diff.tables_dropped {
        plan.up.transactional.push(drop_table_sql(&options.schema, name, options));
    }

    // Down: reverse order, inverse operations — drop FKs first, then
    // indexes, then tables, then enums (spec.md §4.10).
    if options.include_downs {
        for name in &diff.tables_dropped {
            // A dropped table can't be reconstructed from a name alone;
            // down-migrating past a drop is inherently lossy and is left as
            // a no-op placeholder documented in the script header by the
            // caller, matching the teacher's own unrepresentable-drop note
            // in `generate_alter_enum`.
            let _ = name;
        }
        for table_diff in diff.tables_modified.iter().rev() {
            for fk in &table_diff.foreign_keys_added {
                plan.down
                    .transactional
                    .push(drop_constraint_sql(&table_diff.schema, &table_diff.name, &fk.name, options));
            }
            for fk in &table_diff.foreign_keys_dropped {
                plan.down
                    .transactional
                    .push(add_foreign_key_sql(&table_diff.schema, &table_diff.name, fk, options));
            }
            for index in &table_diff.indexes_added {
                plan.down
                    .transactional
                    .push(drop_index_sql(&table_diff.schema, &index.name, options));
            }
            for index in &table_diff.indexes_dropped {
                push_create_index(&mut plan.down, &table_diff.schema, &table_diff.name, index, options);
            }
            plan.down.transactional.extend(alter_table_down(table_diff, options));
        }
        for table in diff.tables_added.iter().rev() {
            for fk in &table.foreign_keys {
                plan.down
                    .transactional
                    .push(drop_constraint_sql(&table.schema, &table.name, &fk.name, options));
            }
            for index in &table.indexes {
                plan.down
                    .transactional
                    .push(drop_index_sql(&table.schema, &index.name, options));
            }
            plan.down.transactional.push(drop_table_sql(&table.schema, &table.name, options));
        }
        let mut enums_dropped = std::collections::HashSet::new();
        for table in diff.tables_added.iter().rev() {
            for enum_type in table.enum_types.iter().rev() {
                if enums_dropped.insert(enum_type.name.clone()) {
                    plan.down
                        .transactional
                        .push(drop_type_sql(&table.schema, &enum_type.name, options));
                }
            }
        }
    }

    debug!(
        up_statements = plan.up.transactional.len() + plan.up.concurrent.len(),
        down_statements = plan.down.transactional.len() + plan.down.concurrent.len(),
        "pebble.plan"
    );

    plan
}

fn push_create_index(
    script: &mut MigrationScript,
    schema: &str,
    table: &str,
    index: &IndexMetadata,
    options: &PlannerOptions,
) {
    let sql = create_index_sql(schema, table, index, options);
    if options.concurrent || index.concurrent {
        script.concurrent.push(sql);
    } else {
        script.transactional.push(sql);
    }
}

fn create_enum_sql(schema: &str, name: &str, values: &[String]) -> String {
    let values_sql = values
        .iter()
        .map(|v| format!("'{}'", escape_literal(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TYPE {} AS ENUM ({});", qualify(schema, name), values_sql)
}

fn drop_type_sql(schema: &str, name: &str, options: &PlannerOptions) -> String {
    format!("DROP TYPE {}{};", if_exists(options.if_not_exists), qualify(schema, name))
}

fn create_table_sql(table: &TableMetadata, options: &PlannerOptions) -> String {
    let mut parts: Vec<String> = table.columns.iter().map(column_sql).collect();

    if let Some(pk) = &table.primary_key {
        let cols = pk.columns.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
        parts.push(format!("CONSTRAINT \"{}\" PRIMARY KEY ({})", pk.name, cols));
    }

    for column in &table.columns {
        if column.unique && !column.is_primary_key {
            parts.push(format!(
                "CONSTRAINT \"{}_{}_key\" UNIQUE (\"{}\")",
                table.name, column.name, column.name
            ));
        }
        if let Some(check) = &column.check {
            parts.push(format!("CONSTRAINT \"{}_{}_check\" CHECK ({})", table.name, column.name, check));
        }
    }

    format!(
        "CREATE TABLE {}{} (\n    {}\n);",
        if_not_exists(options.if_not_exists),
        qualify(&table.schema, &table.name),
        parts.join(",\n    ")
    )
}

fn drop_table_sql(schema: &str, name: &str, options: &PlannerOptions) -> String {
    format!(
        "DROP TABLE {}{};",
        if_exists(options.if_not_exists),
        qualify(schema, name)
    )
}

fn column_sql(column: &ColumnMetadata) -> String {
    let mut parts = vec![format!("\"{}\"", column.name), column.sql_type.clone()];

    if !column.nullable {
        parts.push("NOT NULL".to_string());
    }
    if let Some(default) = &column.default {
        parts.push(format!("DEFAULT {default}"));
    }
    if let Some(generated) = &column.generated {
        let storage = if generated.stored { "STORED" } else { "VIRTUAL" };
        parts.push(format!("GENERATED ALWAYS AS ({}) {storage}", generated.expression));
    }
    if let Some(identity) = &column.identity {
        let kind = match identity.generation {
            pebble_core::schema::IdentityGeneration::Always => "ALWAYS",
            pebble_core::schema::IdentityGeneration::ByDefault => "BY DEFAULT",
        };
        parts.push(format!("GENERATED {kind} AS IDENTITY"));
    }
    if let Some(collation) = &column.collation {
        parts.push(format!("COLLATE \"{collation}\""));
    }

    parts.join(" ")
}

fn index_column_sql(column: &IndexColumn) -> String {
    let mut parts = vec![column.expression.clone()];
    if let Some(opclass) = &column.operator_class {
        parts.push(opclass.clone());
    }
    if column.direction == SortDirection::Desc {
        parts.push("DESC".to_string());
    }
    match column.nulls {
        NullsPosition::First => parts.push("NULLS FIRST".to_string()),
        NullsPosition::Last => parts.push("NULLS LAST".to_string()),
        NullsPosition::Default => {}
    }
    parts.join(" ")
}

fn create_index_sql(schema: &str, table: &str, index: &IndexMetadata, options: &PlannerOptions) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    let concurrently = if options.concurrent || index.concurrent {
        "CONCURRENTLY "
    } else {
        ""
    };
    let cols = index.columns.iter().map(index_column_sql).collect::<Vec<_>>().join(", ");
    let include = if index.include.is_empty() {
        String::new()
    } else {
        format!(" INCLUDE ({})", index.include.join(", "))
    };
    let where_clause = index
        .r#where
        .as_ref()
        .map(|w| format!(" WHERE {w}"))
        .unwrap_or_default();

    format!(
        "CREATE {unique}{concurrently}INDEX {}\"{}\" ON {} USING {} ({}){include}{where_clause};",
        if_not_exists(options.if_not_exists),
        index.name,
        qualify(schema, table),
        index.index_type.as_sql(),
        cols
    )
}

fn drop_index_sql(schema: &str, name: &str, options: &PlannerOptions) -> String {
    format!(
        "DROP INDEX {}{};",
        if_exists(options.if_not_exists),
        qualify(schema, name)
    )
}

// Postgres has no `ADD CONSTRAINT IF NOT EXISTS`; the Planner relies on the
// Differ never re-emitting a constraint it reports as unchanged.
fn add_foreign_key_sql(schema: &str, table: &str, fk: &ForeignKeyMetadata, _options: &PlannerOptions) -> String {
    let cols = fk.columns.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
    let target_cols = fk.target_columns.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
    format!(
        "ALTER TABLE {} ADD CONSTRAINT \"{}\" FOREIGN KEY ({}) REFERENCES {}({}) ON UPDATE {} ON DELETE {};",
        qualify(schema, table),
        fk.name,
        cols,
        qualify(schema, &fk.target_table),
        target_cols,
        fk.on_update.as_sql(),
        fk.on_delete.as_sql()
    )
}

fn drop_constraint_sql(schema: &str, table: &str, name: &str, options: &PlannerOptions) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT {}\"{}\";",
        qualify(schema, table),
        if_exists(options.if_not_exists),
        name
    )
}

fn alter_table_up(diff: &TableDiff, options: &PlannerOptions) -> Vec<String> {
    let table_ref = qualify(&diff.schema, &diff.name);
    let mut statements = Vec::new();

    for column in &diff.columns_added {
        statements.push(format!(
            "ALTER TABLE {} ADD COLUMN {}{};",
            table_ref,
            if_not_exists(options.if_not_exists),
            column_sql(column)
        ));
    }
    for name in &diff.columns_dropped {
        statements.push(format!(
            "ALTER TABLE {} DROP COLUMN {}\"{}\";",
            table_ref,
            if_exists(options.if_not_exists),
            name
        ));
    }
    for changed in &diff.columns_modified {
        statements.extend(alter_column(&table_ref, changed, Direction::Forward));
    }

    statements
}

fn alter_table_down(diff: &TableDiff, options: &PlannerOptions) -> Vec<String> {
    let table_ref = qualify(&diff.schema, &diff.name);
    let mut statements = Vec::new();

    // Column drops in down are generated from column-added in up, and vice
    // versa (spec.md §4.10).
    for column in &diff.columns_added {
        statements.push(format!(
            "ALTER TABLE {} DROP COLUMN {}\"{}\";",
            table_ref,
            if_exists(options.if_not_exists),
            column.name
        ));
    }
    for name in &diff.columns_dropped {
        let _ = name;
    }
    for changed in diff.columns_modified.iter().rev() {
        statements.extend(alter_column(&table_ref, changed, Direction::Reverse));
    }

    statements
}

enum Direction {
    Forward,
    Reverse,
}

fn alter_column(table_ref: &str, diff: &ColumnDiff, direction: Direction) -> Vec<String> {
    let (from, to) = match direction {
        Direction::Forward => (&diff.old, &diff.new),
        Direction::Reverse => (&diff.new, &diff.old),
    };
    let col_ref = format!("\"{}\"", diff.name);
    let mut statements = Vec::new();

    if from.sql_type != to.sql_type {
        statements.push(format!(
            "ALTER TABLE {table_ref} ALTER COLUMN {col_ref} SET DATA TYPE {} USING {col_ref}::{};",
            to.sql_type, to.sql_type
        ));
    }
    if from.nullable != to.nullable {
        if to.nullable {
            statements.push(format!("ALTER TABLE {table_ref} ALTER COLUMN {col_ref} DROP NOT NULL;"));
        } else {
            statements.push(format!("ALTER TABLE {table_ref} ALTER COLUMN {col_ref} SET NOT NULL;"));
        }
    }
    if from.default != to.default {
        match &to.default {
            Some(default) => statements.push(format!(
                "ALTER TABLE {table_ref} ALTER COLUMN {col_ref} SET DEFAULT {default};"
            )),
            None => statements.push(format!("ALTER TABLE {table_ref} ALTER COLUMN {col_ref} DROP DEFAULT;")),
        }
    }

    statements
}

fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_schemas;
    use pebble_core::schema::{ColumnMetadata, EnumType, PrimaryKey};

    #[test]
    fn creates_table_before_its_indexes_and_fks() {
        let mut id = ColumnMetadata::new("id", "Id", "uuid");
        id.is_primary_key = true;
        let mut email = ColumnMetadata::new("email", "Email", "text");
        email.nullable = false;

        let mut table = TableMetadata::new("users");
        table.columns = vec![id, email];
        table.primary_key = Some(PrimaryKey {
            name: "users_pkey".into(),
            columns: vec!["id".into()],
        });
        table.indexes = vec![IndexMetadata {
            name: "idx_users_email".into(),
            columns: vec![IndexColumn::new("email")],
            include: vec![],
            r#where: None,
            index_type: pebble_core::schema::IndexType::Btree,
            unique: false,
            concurrent: false,
        }];

        let diff = SchemaDiff {
            tables_added: vec![table],
            tables_dropped: vec![],
            tables_modified: vec![],
        };
        let plan = plan_migration(&diff, &PlannerOptions::default());
        let create_table_pos = plan.up.transactional.iter().position(|s| s.starts_with("CREATE TABLE")).unwrap();
        let create_index_pos = plan
            .up
            .transactional
            .iter()
            .position(|s| s.starts_with("CREATE  INDEX") || s.starts_with("CREATE INDEX"))
            .unwrap();
        assert!(create_table_pos < create_index_pos);
        assert!(plan.up.transactional[0].contains("IF NOT EXISTS"));
    }

    #[test]
    fn concurrent_index_goes_to_sibling_script() {
        let mut table = TableMetadata::new("users");
        table.indexes = vec![IndexMetadata {
            name: "idx_users_email".into(),
            columns: vec![IndexColumn::new("email")],
            include: vec![],
            r#where: None,
            index_type: pebble_core::schema::IndexType::Btree,
            unique: false,
            concurrent: true,
        }];
        let diff = SchemaDiff {
            tables_added: vec![table],
            tables_dropped: vec![],
            tables_modified: vec![],
        };
        let plan = plan_migration(&diff, &PlannerOptions::default());
        assert_eq!(plan.up.concurrent.len(), 1);
        assert!(plan.up.concurrent[0].contains("CONCURRENTLY"));
        assert!(plan.up.transactional.iter().all(|s| !s.contains("CONCURRENTLY")));
    }

    #[test]
    fn enum_created_before_table_that_references_it() {
        let mut status = ColumnMetadata::new("status", "Status", "order_status");
        status.nullable = false;
        let mut table = TableMetadata::new("orders");
        table.columns = vec![status];
        table.enum_types = vec![EnumType {
            name: "order_status".into(),
            values: vec!["pending".into(), "shipped".into()],
        }];

        let diff = SchemaDiff {
            tables_added: vec![table],
            tables_dropped: vec![],
            tables_modified: vec![],
        };
        let plan = plan_migration(&diff, &PlannerOptions::default());
        let enum_pos = plan.up.transactional.iter().position(|s| s.starts_with("CREATE TYPE")).unwrap();
        let table_pos = plan.up.transactional.iter().position(|s| s.starts_with("CREATE TABLE")).unwrap();
        assert!(enum_pos < table_pos);
    }

    #[test]
    fn round_trip_plan_has_matching_down_for_added_column() {
        let code = vec![{
            let mut t = TableMetadata::new("users");
            t.columns = vec![
                ColumnMetadata::new("id", "Id", "uuid"),
                ColumnMetadata::new("nickname", "Nickname", "text"),
            ];
            t
        }];
        let db = vec![{
            let mut t = TableMetadata::new("users");
            t.columns = vec![ColumnMetadata::new("id", "Id", "uuid")];
            t
        }];
        let diff = diff_schemas(&code, &db).unwrap();
        let plan = plan_migration(&diff, &PlannerOptions::default());
        assert!(plan.up.transactional.iter().any(|s| s.contains("ADD COLUMN") && s.contains("nickname")));
        assert!(plan.down.transactional.iter().any(|s| s.contains("DROP COLUMN") && s.contains("nickname")));
    }
}
