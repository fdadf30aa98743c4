//! End-to-end compound filter rendering (spec.md §8 scenario 2).

use pebble_core::expr::{gte, like, OrderBy};
use pebble_core::statement::SelectStatement;
use pebble_core::value::SqlValue;

#[test]
fn compound_filter_renders_in_clause_order() {
    let stmt = SelectStatement::new("users")
        .filter(vec![gte("age", 18), like("email", "%@x.com")])
        .order(vec![OrderBy::desc("created_at")])
        .limit(10);

    let rendered = stmt.render();

    assert_eq!(
        rendered.sql,
        "SELECT * FROM users WHERE age >= $1 AND email LIKE $2 ORDER BY created_at DESC LIMIT 10"
    );
    assert_eq!(rendered.args, vec![SqlValue::Int(18), SqlValue::Text("%@x.com".to_string())]);
}

#[test]
fn building_twice_is_byte_identical() {
    let build = || {
        SelectStatement::new("users")
            .filter(vec![gte("age", 18)])
            .order(vec![OrderBy::asc("id")])
            .render()
    };
    let first = build();
    let second = build();
    assert_eq!(first.sql, second.sql);
    assert_eq!(first.args, second.args);
}

#[test]
fn count_and_exists_terminals_share_the_where_clause() {
    let stmt = SelectStatement::new("users").filter(vec![gte("age", 18)]);

    let count = stmt.count();
    assert_eq!(count.sql, "SELECT COUNT(*) FROM users WHERE age >= $1");
    assert_eq!(count.args, vec![SqlValue::Int(18)]);

    let exists = stmt.exists();
    assert_eq!(exists.sql, "SELECT EXISTS(SELECT 1 FROM users WHERE age >= $1)");
    assert_eq!(exists.args, vec![SqlValue::Int(18)]);
}
