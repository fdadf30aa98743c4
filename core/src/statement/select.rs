//! SELECT statement assembly (spec.md §4.6).

use tracing::trace;

use crate::expr::{render_conditions, render_with_clause, Condition, Cte, OrderBy};

use super::RenderedSql;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub on: String,
    pub lateral: bool,
}

impl Join {
    pub fn inner(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            kind: JoinKind::Inner,
            table: table.into(),
            on: on.into(),
            lateral: false,
        }
    }
    pub fn left(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            kind: JoinKind::Left,
            table: table.into(),
            on: on.into(),
            lateral: false,
        }
    }
    pub fn right(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            kind: JoinKind::Right,
            table: table.into(),
            on: on.into(),
            lateral: false,
        }
    }
    pub fn full(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            kind: JoinKind::Full,
            table: table.into(),
            on: on.into(),
            lateral: false,
        }
    }

    /// Marks this join `LATERAL`, allowing `table` to reference columns from
    /// preceding `FROM`/`JOIN` items (e.g. a correlated subquery).
    pub fn lateral(mut self) -> Self {
        self.lateral = true;
        self
    }
}

/// A SELECT statement under construction.
///
/// Clauses render in a fixed order — CTEs, columns, FROM, joins, WHERE,
/// GROUP BY, HAVING, ORDER BY, LIMIT, OFFSET, FOR UPDATE — and all share one
/// positional-parameter counter so `$n` stays strictly increasing across the
/// whole statement (spec.md §8).
#[derive(Debug, Clone, Default)]
pub struct SelectStatement {
    pub ctes: Vec<Cte>,
    pub table: String,
    pub distinct: bool,
    pub columns: Vec<String>,
    pub joins: Vec<Join>,
    pub conditions: Vec<Condition>,
    pub group_by: Vec<String>,
    pub having: Vec<Condition>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub for_update: bool,
}

impl SelectStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec!["*".to_string()],
            ..Default::default()
        }
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn select(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn filter(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn group(mut self, columns: Vec<String>) -> Self {
        self.group_by = columns;
        self
    }

    pub fn having(mut self, conditions: Vec<Condition>) -> Self {
        self.having = conditions;
        self
    }

    pub fn order(mut self, order_by: Vec<OrderBy>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    pub fn cte(mut self, cte: Cte) -> Self {
        self.ctes.push(cte);
        self
    }

    /// Renders `FROM table [JOIN ...] [WHERE ...] [GROUP BY ...] [HAVING
    /// ...]` — the clauses shared by the `All`/`First` row-returning form
    /// and the `Count`/`Exists` terminals below, so the three stay in sync
    /// on joins and filtering (spec.md §4.6).
    fn render_body(&self, next_param: &mut usize) -> (String, Vec<crate::value::SqlValue>) {
        let mut sql = String::new();
        let mut args = Vec::new();

        sql.push_str("FROM ");
        sql.push_str(&self.table);

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.kind.as_sql());
            sql.push(' ');
            if join.lateral {
                sql.push_str("LATERAL ");
            }
            sql.push_str(&join.table);
            sql.push_str(" ON ");
            sql.push_str(&join.on);
        }

        if !self.conditions.is_empty() {
            let (frag, frag_args) = render_conditions(&self.conditions, next_param);
            sql.push_str(" WHERE ");
            sql.push_str(&frag);
            args.extend(frag_args);
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if !self.having.is_empty() {
            let (frag, frag_args) = render_conditions(&self.having, next_param);
            sql.push_str(" HAVING ");
            sql.push_str(&frag);
            args.extend(frag_args);
        }

        (sql, args)
    }

    pub fn render(&self) -> RenderedSql {
        let mut next_param = 1usize;
        let mut sql = String::new();
        let mut args = Vec::new();

        if !self.ctes.is_empty() {
            let (frag, frag_args) = render_with_clause(&self.ctes, &mut next_param);
            sql.push_str(&frag);
            sql.push(' ');
            args.extend(frag_args);
        }

        sql.push_str("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.columns.join(", "));
        sql.push(' ');

        let (body, body_args) = self.render_body(&mut next_param);
        sql.push_str(&body);
        args.extend(body_args);

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(
                &self
                    .order_by
                    .iter()
                    .map(OrderBy::render)
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        if self.for_update {
            sql.push_str(" FOR UPDATE");
        }

        let rendered = RenderedSql::new(sql, args);
        trace!(sql = %rendered.sql, params = rendered.args.len(), "pebble.select");
        rendered
    }

    /// The `Count` terminal (spec.md §4.6, C9): `SELECT COUNT(*) FROM ...`
    /// over the same FROM/JOIN/WHERE/GROUP BY/HAVING clauses as `render()`,
    /// ignoring the row-shaping clauses (`ORDER BY`/`LIMIT`/`OFFSET`/
    /// `FOR UPDATE`/`DISTINCT`) that don't affect a scalar count.
    pub fn count(&self) -> RenderedSql {
        let mut next_param = 1usize;
        let mut sql = String::new();
        let mut args = Vec::new();

        if !self.ctes.is_empty() {
            let (frag, frag_args) = render_with_clause(&self.ctes, &mut next_param);
            sql.push_str(&frag);
            sql.push(' ');
            args.extend(frag_args);
        }

        sql.push_str("SELECT COUNT(*) ");
        let (body, body_args) = self.render_body(&mut next_param);
        sql.push_str(&body);
        args.extend(body_args);

        let rendered = RenderedSql::new(sql, args);
        trace!(sql = %rendered.sql, params = rendered.args.len(), "pebble.count");
        rendered
    }

    /// The `Exists` terminal (spec.md §4.6, C9): `SELECT EXISTS(SELECT 1
    /// FROM ...)` over the same clauses as `count()`, for a boolean
    /// presence check instead of a row count.
    pub fn exists(&self) -> RenderedSql {
        let mut next_param = 1usize;
        let mut sql = String::new();
        let mut args = Vec::new();

        if !self.ctes.is_empty() {
            let (frag, frag_args) = render_with_clause(&self.ctes, &mut next_param);
            sql.push_str(&frag);
            sql.push(' ');
            args.extend(frag_args);
        }

        sql.push_str("SELECT EXISTS(SELECT 1 ");
        let (body, body_args) = self.render_body(&mut next_param);
        sql.push_str(&body);
        sql.push(')');
        args.extend(body_args);

        let rendered = RenderedSql::new(sql, args);
        trace!(sql = %rendered.sql, params = rendered.args.len(), "pebble.exists");
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{eq, gte};
    use crate::value::SqlValue;

    #[test]
    fn renders_basic_select() {
        let stmt = SelectStatement::new("users").filter(vec![gte("age", 18i32)]);
        let rendered = stmt.render();
        assert_eq!(rendered.sql, "SELECT * FROM users WHERE age >= $1");
        assert_eq!(rendered.args, vec![SqlValue::Int(18)]);
    }

    #[test]
    fn renders_join_and_order_and_limit() {
        let stmt = SelectStatement::new("orders")
            .select(vec!["orders.id".into(), "users.email".into()])
            .join(Join::left("users", "users.id = orders.user_id"))
            .filter(vec![eq("orders.status", "paid")])
            .order(vec![OrderBy::desc("orders.created_at")])
            .limit(10)
            .offset(20);
        let rendered = stmt.render();
        assert_eq!(
            rendered.sql,
            "SELECT orders.id, users.email FROM orders LEFT JOIN users ON users.id = orders.user_id WHERE orders.status = $1 ORDER BY orders.created_at DESC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn renders_lateral_join() {
        let stmt = SelectStatement::new("authors").join(Join::left(
            "(SELECT * FROM posts WHERE posts.author_id = authors.id LIMIT 1) recent_post",
            "true",
        ).lateral());
        let rendered = stmt.render();
        assert!(rendered.sql.contains("LEFT JOIN LATERAL (SELECT * FROM posts"));
    }

    #[test]
    fn cte_numbering_flows_into_where_clause() {
        let cte = Cte::new("recent", "SELECT id FROM orders WHERE created_at > $1", vec![SqlValue::Int(1)]);
        let stmt = SelectStatement::new("recent")
            .cte(cte)
            .filter(vec![eq("status", "paid")]);
        let rendered = stmt.render();
        assert_eq!(
            rendered.sql,
            "WITH recent AS (SELECT id FROM orders WHERE created_at > $1) SELECT * FROM recent WHERE status = $2"
        );
        assert_eq!(rendered.args.len(), 2);
    }

    #[test]
    fn count_renders_aggregate_over_the_same_filter() {
        let stmt = SelectStatement::new("users").filter(vec![gte("age", 18i32)]);
        let rendered = stmt.count();
        assert_eq!(rendered.sql, "SELECT COUNT(*) FROM users WHERE age >= $1");
        assert_eq!(rendered.args, vec![SqlValue::Int(18)]);
    }

    #[test]
    fn exists_renders_a_boolean_presence_check() {
        let stmt = SelectStatement::new("users").filter(vec![eq("email", "a@b.c")]);
        let rendered = stmt.exists();
        assert_eq!(
            rendered.sql,
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)"
        );
        assert_eq!(rendered.args, vec![SqlValue::Text("a@b.c".to_string())]);
    }

    #[test]
    fn count_and_exists_ignore_order_limit_and_for_update() {
        let stmt = SelectStatement::new("users")
            .order(vec![OrderBy::desc("created_at")])
            .limit(10)
            .for_update();
        assert_eq!(stmt.count().sql, "SELECT COUNT(*) FROM users");
        assert_eq!(stmt.exists().sql, "SELECT EXISTS(SELECT 1 FROM users)");
    }
}
