//! DELETE statement assembly (spec.md §4.6).

use tracing::trace;

use crate::expr::{render_conditions, Condition};

use super::RenderedSql;

#[derive(Debug, Clone, Default)]
pub struct DeleteStatement {
    pub table: String,
    pub conditions: Vec<Condition>,
    pub returning: Vec<String>,
}

impl DeleteStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
            returning: Vec::new(),
        }
    }

    pub fn filter(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn returning(mut self, columns: Vec<String>) -> Self {
        self.returning = columns;
        self
    }

    pub fn render(&self) -> RenderedSql {
        let mut next_param = 1usize;
        let mut sql = format!("DELETE FROM {}", self.table);
        let mut args = Vec::new();

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
        trace!(sql = %rendered.sql, params = rendered.args.len(), "pebble.delete");
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::eq;
    use crate::value::SqlValue;

    #[test]
    fn renders_delete_with_filter_and_returning() {
        let stmt = DeleteStatement::new("sessions")
            .filter(vec![eq("user_id", 7i32)])
            .returning(vec!["id".into()]);
        let rendered = stmt.render();
        assert_eq!(
            rendered.sql,
            "DELETE FROM sessions WHERE user_id = $1 RETURNING id"
        );
        assert_eq!(rendered.args, vec![SqlValue::Int(7)]);
    }

    #[test]
    fn renders_unconditional_delete() {
        let stmt = DeleteStatement::new("sessions");
        let rendered = stmt.render();
        assert_eq!(rendered.sql, "DELETE FROM sessions");
    }
}
