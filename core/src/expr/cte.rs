//! CTEs (spec.md §4.5): named fragments with optional column lists, and
//! recursive CTEs joined by `UNION ALL`.

use crate::value::SqlValue;

#[derive(Debug, Clone)]
pub struct Cte {
    pub name: String,
    pub columns: Vec<String>,
    pub query_sql: String,
    pub query_args: Vec<SqlValue>,
    /// For a recursive CTE, the recursive term joined to `query_sql` (the
    /// base term) by `UNION ALL`.
    pub recursive_sql: Option<String>,
    pub recursive_args: Vec<SqlValue>,
}

impl Cte {
    pub fn new(name: impl Into<String>, query_sql: impl Into<String>, query_args: Vec<SqlValue>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            query_sql: query_sql.into(),
            query_args,
            recursive_sql: None,
            recursive_args: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn recursive(mut self, recursive_sql: impl Into<String>, recursive_args: Vec<SqlValue>) -> Self {
        self.recursive_sql = Some(recursive_sql.into());
        self.recursive_args = recursive_args;
        self
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive_sql.is_some()
    }

    /// Renders `name [(cols)] AS (base [UNION ALL recursive])`, renumbering
    /// its locally-`$n`-placeholdered bodies against the shared counter.
    pub fn render(&self, next_param: &mut usize) -> (String, Vec<SqlValue>) {
        let mut sql = self.name.clone();
        if !self.columns.is_empty() {
            sql.push_str(&format!("({})", self.columns.join(", ")));
        }
        sql.push_str(" AS (");
        let (base_sql, mut args) = renumber(&self.query_sql, &self.query_args, next_param);
        sql.push_str(&base_sql);
        if let Some(recursive_sql) = &self.recursive_sql {
            sql.push_str(" UNION ALL ");
            let (rec_sql, rec_args) = renumber(recursive_sql, &self.recursive_args, next_param);
            sql.push_str(&rec_sql);
            args.extend(rec_args);
        }
        sql.push(')');
        (sql, args)
    }
}

fn renumber(sql: &str, args: &[SqlValue], next_param: &mut usize) -> (String, Vec<SqlValue>) {
    let base = *next_param;
    *next_param += args.len();
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.char_indices().peekable();
    while let Some((_, ch)) = chars.next() {
        if ch == '$' {
            let mut digits = String::new();
            while let Some((_, d)) = chars.peek() {
                if d.is_ascii_digit() {
                    digits.push(*d);
                    chars.next();
                } else {
                    break;
                }
            }
            if digits.is_empty() {
                out.push('$');
            } else {
                let local: usize = digits.parse().unwrap_or(1);
                out.push_str(&format!("${}", base + local - 1));
            }
        } else {
            out.push(ch);
        }
    }
    (out, args.to_vec())
}

/// Renders `WITH [RECURSIVE] cte1 AS (...), cte2 AS (...)` for a list of
/// CTEs, advancing `next_param` past all of them.
pub fn render_with_clause(ctes: &[Cte], next_param: &mut usize) -> (String, Vec<SqlValue>) {
    if ctes.is_empty() {
        return (String::new(), Vec::new());
    }
    let recursive = ctes.iter().any(Cte::is_recursive);
    let mut sql = String::from(if recursive { "WITH RECURSIVE " } else { "WITH " });
    let mut args = Vec::new();
    for (i, cte) in ctes.iter().enumerate() {
        let (frag, frag_args) = cte.render(next_param);
        sql.push_str(&frag);
        args.extend(frag_args);
        if i + 1 < ctes.len() {
            sql.push_str(", ");
        }
    }
    (sql, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_simple_cte() {
        let cte = Cte::new("recent", "SELECT id FROM orders WHERE created_at > $1", vec![SqlValue::Int(1)]);
        let mut counter = 1usize;
        let (sql, args) = render_with_clause(&[cte], &mut counter);
        assert_eq!(sql, "WITH recent AS (SELECT id FROM orders WHERE created_at > $1)");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn renders_recursive_cte() {
        let cte = Cte::new("tree", "SELECT id, parent_id FROM nodes WHERE id = $1", vec![SqlValue::Int(1)])
            .recursive(
                "SELECT n.id, n.parent_id FROM nodes n JOIN tree t ON n.parent_id = t.id",
                vec![],
            );
        let mut counter = 1usize;
        let (sql, args) = render_with_clause(&[cte], &mut counter);
        assert!(sql.starts_with("WITH RECURSIVE tree AS ("));
        assert!(sql.contains("UNION ALL"));
        assert_eq!(args.len(), 1);
    }
}
