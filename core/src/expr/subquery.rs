//! Subquery integration (spec.md §4.5): a condition may carry a pre-rendered
//! subquery string together with its own parameter-numbered args.

use crate::value::SqlValue;

/// A subquery fragment whose SQL text uses its own local placeholders,
/// renumbered against the enclosing statement's shared counter when it is
/// spliced in.
///
/// The stored `sql` uses `$1`, `$2`, ... placeholders starting from 1, as if
/// the subquery were its own standalone statement; `render` rewrites those
/// to the caller's current counter position.
#[derive(Debug, Clone)]
pub struct RawSubquery {
    sql: String,
    args: Vec<SqlValue>,
}

impl RawSubquery {
    pub fn new(sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Renumbers this subquery's local `$n` placeholders starting at
    /// `*next_param`, advances the counter past them, and returns the
    /// rewritten SQL plus its args (in order).
    pub fn render(&self, next_param: &mut usize) -> (String, Vec<SqlValue>) {
        let base = *next_param;
        *next_param += self.args.len();
        let mut out = String::with_capacity(self.sql.len());
        let mut chars = self.sql.char_indices().peekable();
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
        (out, self.args.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renumbers_local_placeholders() {
        let sub = RawSubquery::new(
            "SELECT id FROM posts WHERE author_id = $1 AND published = $2",
            vec![SqlValue::Int(1), SqlValue::Bool(true)],
        );
        let mut counter = 3usize;
        let (sql, args) = sub.render(&mut counter);
        assert_eq!(
            sql,
            "SELECT id FROM posts WHERE author_id = $3 AND published = $4"
        );
        assert_eq!(args.len(), 2);
        assert_eq!(counter, 5);
    }
}
