//! UPDATE statement assembly (spec.md §4.6). The smart-default omission
//! rule does not apply to UPDATE (spec.md §9, Open Question resolved in
//! SPEC_FULL.md) — every `(column, value)` pair passed in here is written,
//! including explicit zero values.

use tracing::trace;

use crate::expr::{render_conditions, Condition};
use crate::value::SqlValue;

use super::RenderedSql;

#[derive(Debug, Clone, Default)]
pub struct UpdateStatement {
    pub table: String,
    set: Vec<(String, SqlValue)>,
    pub conditions: Vec<Condition>,
    pub returning: Vec<String>,
}

impl UpdateStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set: Vec::new(),
            conditions: Vec::new(),
            returning: Vec::new(),
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set.push((column.into(), value.into()));
        self
    }

    pub fn filter(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn returning(mut self, columns: Vec<String>) -> Self {
        self.returning = columns;
        self
    }

    /// Renders `UPDATE table SET ... [WHERE ...] [RETURNING ...]`, with SET
    /// assignments numbered before the WHERE clause so `$n` stays
    /// contiguous across both (spec.md §8).
    pub fn render(&self) -> RenderedSql {
        let mut next_param = 1usize;
        let mut args = Vec::new();
        let mut sql = format!("UPDATE {} SET ", self.table);

        let assignments: Vec<String> = self
            .set
            .iter()
            .map(|(column, value)| {
                let p = next_param;
                next_param += 1;
                args.push(value.clone());
                format!("{column} = ${p}")
            })
            .collect();
        sql.push_str(&assignments.join(", "));

        if !self.conditions.is_empty() {
            let (frag, frag_args) = render_conditions(&self.conditions, &mut next_param);
            sql.push_str(" WHERE ");
            sql.push_str(&frag);
            args.extend(frag_args);
        }

        if !self.returning.is_empty() {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.returning.join(", "));
        }

        let rendered = RenderedSql::new(sql, args);
        trace!(sql = %rendered.sql, params = rendered.args.len(), "pebble.update");
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::eq;

    #[test]
    fn numbers_set_before_where() {
        let stmt = UpdateStatement::new("users")
            .set("email", "new@x.com")
            .set("age", 0i32)
            .filter(vec![eq("id", 1i32)])
            .returning(vec!["id".into()]);
        let rendered = stmt.render();
        assert_eq!(
            rendered.sql,
            "UPDATE users SET email = $1, age = $2 WHERE id = $3 RETURNING id"
        );
        assert_eq!(rendered.args.len(), 3);
        assert_eq!(rendered.args[1], SqlValue::Int(0));
    }
}
