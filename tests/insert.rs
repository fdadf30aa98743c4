//! Insert projection with smart-default column omission, end to end
//! (spec.md §8 scenario 1): a zero-valued `id`/`created_at` backed by a
//! server-side default drops out of the column list; `email`/`age` do not.

use pebble_core::scanner::{project_insert, FieldValue};
use pebble_core::schema::{ColumnMetadata, TableMetadata};
use pebble_core::statement::InsertStatement;
use pebble_core::value::SqlValue;

fn users_table() -> TableMetadata {
    let mut table = TableMetadata::new("users");
    let mut id = ColumnMetadata::new("id", "Id", "bigint");
    id.auto_increment = true;
    id.is_primary_key = true;
    table.columns.push(id);

    table.columns.push(ColumnMetadata::new("email", "Email", "text"));
    table.columns.push(ColumnMetadata::new("age", "Age", "integer"));

    let mut created_at = ColumnMetadata::new("created_at", "CreatedAt", "timestamptz");
    created_at.default = Some("now()".to_string());
    table.columns.push(created_at);

    table
}

#[test]
fn zero_valued_defaulted_columns_are_omitted_from_insert() {
    let table = users_table();

    let fields = vec![
        FieldValue::new("id", SqlValue::Int(0), true),
        FieldValue::new("email", SqlValue::Text("a@b.c".into()), false),
        FieldValue::new("age", SqlValue::Int(28), false),
        FieldValue::new("created_at", SqlValue::Null, true),
    ];

    let (columns, values) = project_insert(&table, &fields);
    assert_eq!(columns, vec!["email", "age"]);
    assert_eq!(
        values,
        vec![SqlValue::Text("a@b.c".into()), SqlValue::Int(28)]
    );

    let rendered = InsertStatement::new("users")
        .row(columns, values)
        .unwrap()
        .returning(vec!["*".to_string()])
        .render();

    assert_eq!(
        rendered.sql,
        "INSERT INTO users (email, age) VALUES ($1, $2) RETURNING *"
    );
    assert_eq!(
        rendered.args,
        vec![SqlValue::Text("a@b.c".into()), SqlValue::Int(28)]
    );
}

#[test]
fn zero_column_without_a_server_default_is_kept() {
    let table = users_table();

    // `age` has no default/identity, so its zero value is not smart-default
    // material even though it is the zero value; only `created_at` (zero +
    // a default) drops out here.
    let fields = vec![
        FieldValue::new("id", SqlValue::Int(7), false),
        FieldValue::new("email", SqlValue::Text("a@b.c".into()), false),
        FieldValue::new("age", SqlValue::Int(0), true),
        FieldValue::new("created_at", SqlValue::Null, true),
    ];

    let (columns, _values) = project_insert(&table, &fields);
    assert_eq!(columns, vec!["id", "email", "age"]);
}
