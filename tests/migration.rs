//! Schema diff + migration planning for an enum-value addition (spec.md §8
//! scenario 5): the up script adds the new value via `ADD VALUE IF NOT
//! EXISTS`, and nothing else changes.

use pebble_core::schema::{ColumnMetadata, EnumType, TableMetadata};
use pebble_migrate::diff::diff_schemas;
use pebble_migrate::plan::{plan_migration, PlannerOptions};

fn orders_table(status_values: &[&str]) -> TableMetadata {
    let mut table = TableMetadata::new("orders");
    let mut id = ColumnMetadata::new("id", "Id", "bigint");
    id.auto_increment = true;
    id.is_primary_key = true;
    table.columns.push(id);

    let mut status = ColumnMetadata::new("status", "Status", "orders_status");
    status.nullable = false;
    table.columns.push(status);

    table.enum_types.push(EnumType {
        name: "orders_status".to_string(),
        values: status_values.iter().map(|s| s.to_string()).collect(),
    });
    table
}

#[test]
fn enum_value_addition_emits_a_single_add_value_statement() {
    let code = vec![orders_table(&["pending", "shipped", "deleted"])];
    let db = vec![orders_table(&["pending", "shipped"])];

    let diff = diff_schemas(&code, &db).expect("adding an enum value is representable");
    assert!(diff.has_changes());
    assert_eq!(diff.tables_modified.len(), 1);
    assert_eq!(diff.tables_modified[0].enum_values_added.len(), 1);
    assert_eq!(
        diff.tables_modified[0].enum_values_added[0].values,
        vec!["deleted".to_string()]
    );

    let plan = plan_migration(&diff, &PlannerOptions::default());
    let up_statements = plan.up.statements();
    assert_eq!(
        up_statements,
        vec!["ALTER TYPE \"orders_status\" ADD VALUE IF NOT EXISTS 'deleted';".to_string()]
    );
}

#[test]
fn enum_value_removal_is_unrepresentable() {
    let code = vec![orders_table(&["pending"])];
    let db = vec![orders_table(&["pending", "shipped"])];

    let err = diff_schemas(&code, &db).unwrap_err();
    assert!(matches!(err, pebble_migrate::error::MigrateError::SchemaDriftUnrepresentable(_)));
}
