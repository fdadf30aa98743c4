//! INSERT statement assembly (spec.md §4.6): multi-row VALUES, smart-default
//! column omission (applied upstream by the Scanner, C7), ON CONFLICT, and
//! RETURNING.

use tracing::trace;

use crate::error::Result;
use crate::scanner::check_uniform_shape;
use crate::value::SqlValue;

use super::RenderedSql;

/// `ON CONFLICT` behavior.
#[derive(Debug, Clone)]
pub enum OnConflict {
    DoNothing { target: Vec<String> },
    DoUpdate { target: Vec<String>, set: Vec<String> },
}

/// An INSERT statement under construction. Each row is an already-projected
/// `(columns, values)` pair — the caller (typically generated `ToRow` code
/// plus `scanner::project_insert`) has already applied the smart-default
/// omission rule per row, so every row here is ready to go on the wire
/// as-is.
#[derive(Debug, Clone, Default)]
pub struct InsertStatement {
    pub table: String,
    rows: Vec<(Vec<String>, Vec<SqlValue>)>,
    pub on_conflict: Option<OnConflict>,
    pub returning: Vec<String>,
}

impl InsertStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: Vec::new(),
            on_conflict: None,
            returning: Vec::new(),
        }
    }

    /// Adds one projected row. Returns an error immediately if its column
    /// set diverges from rows already added (spec.md §4.6: `InsertShapeMismatch`).
    pub fn row(mut self, columns: Vec<String>, values: Vec<SqlValue>) -> Result<Self> {
        let mut shapes: Vec<Vec<String>> = self.rows.iter().map(|(c, _)| c.clone()).collect();
        shapes.push(columns.clone());
        check_uniform_shape(&shapes)?;
        self.rows.push((columns, values));
        Ok(self)
    }

    pub fn on_conflict(mut self, clause: OnConflict) -> Self {
        self.on_conflict = Some(clause);
        self
    }

    pub fn returning(mut self, columns: Vec<String>) -> Self {
        self.returning = columns;
        self
    }

    pub fn render(&self) -> RenderedSql {
        let mut next_param = 1usize;
        let mut args = Vec::new();
        let mut sql = format!("INSERT INTO {}", self.table);

        let Some((columns, _)) = self.rows.first() else {
            sql.push_str(" DEFAULT VALUES");
            let rendered = RenderedSql::new(sql, args);
            trace!(sql = %rendered.sql, params = rendered.args.len(), "pebble.insert");
            return rendered;
        };

        sql.push_str(&format!(" ({})", columns.join(", ")));
        sql.push_str(" VALUES ");
        let mut row_fragments = Vec::with_capacity(self.rows.len());
        for (_, values) in &self.rows {
            let placeholders: Vec<String> = values
                .iter()
                .map(|_| {
                    let p = next_param;
                    next_param += 1;
                    format!("${p}")
                })
                .collect();
            row_fragments.push(format!("({})", placeholders.join(", ")));
            args.extend(values.iter().cloned());
        }
        sql.push_str(&row_fragments.join(", "));

        if let Some(on_conflict) = &self.on_conflict {
            match on_conflict {
                OnConflict::DoNothing { target } => {
                    sql.push_str(" ON CONFLICT");
                    if !target.is_empty() {
                        sql.push_str(&format!(" ({})", target.join(", ")));
                    }
                    sql.push_str(" DO NOTHING");
                }
                OnConflict::DoUpdate { target, set } => {
                    sql.push_str(&format!(" ON CONFLICT ({}) DO UPDATE SET ", target.join(", ")));
                    let assignments: Vec<String> =
                        set.iter().map(|c| format!("{c} = EXCLUDED.{c}")).collect();
                    sql.push_str(&assignments.join(", "));
                }
            }
        }

        if !self.returning.is_empty() {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.returning.join(", "));
        }

        let rendered = RenderedSql::new(sql, args);
        trace!(sql = %rendered.sql, params = rendered.args.len(), "pebble.insert");
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_single_row_with_returning() {
        let stmt = InsertStatement::new("users")
            .row(
                vec!["email".into(), "age".into()],
                vec![SqlValue::Text("a@b.c".into()), SqlValue::Int(28)],
            )
            .unwrap()
            .returning(vec!["id".into()]);
        let rendered = stmt.render();
        assert_eq!(
            rendered.sql,
            "INSERT INTO users (email, age) VALUES ($1, $2) RETURNING id"
        );
        assert_eq!(rendered.args.len(), 2);
    }

    #[test]
    fn renders_multi_row_insert() {
        let stmt = InsertStatement::new("users")
            .row(vec!["email".into()], vec![SqlValue::Text("a@b.c".into())])
            .unwrap()
            .row(vec!["email".into()], vec![SqlValue::Text("x@y.z".into())])
            .unwrap();
        let rendered = stmt.render();
        assert_eq!(
            rendered.sql,
            "INSERT INTO users (email) VALUES ($1), ($2)"
        );
    }

    #[test]
    fn rejects_mismatched_row_shapes() {
        let err = InsertStatement::new("users")
            .row(vec!["email".into()], vec![SqlValue::Text("a@b.c".into())])
            .unwrap()
            .row(
                vec!["email".into(), "age".into()],
                vec![SqlValue::Text("x@y.z".into()), SqlValue::Int(1)],
            );
        assert!(err.is_err());
    }

    #[test]
    fn renders_on_conflict_do_update() {
        let stmt = InsertStatement::new("users")
            .row(
                vec!["id".into(), "email".into()],
                vec![SqlValue::Int(1), SqlValue::Text("a@b.c".into())],
            )
            .unwrap()
            .on_conflict(OnConflict::DoUpdate {
                target: vec!["id".into()],
                set: vec!["email".into()],
            });
        let rendered = stmt.render();
        assert!(rendered.sql.ends_with("ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email"));
    }
}
