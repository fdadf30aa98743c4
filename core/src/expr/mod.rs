//! Expression Builder (C8, spec.md §4.5): predicates, JSONB/array/full-text
//! operators, ordering, grouping, subquery and CTE fragments — all sharing
//! one positional-parameter counter with the Statement Builder (C9).

mod cte;
mod order;
mod subquery;

pub use cte::{render_with_clause, Cte};
pub use order::{NullsOrder, OrderBy, OrderDirection};
pub use subquery::RawSubquery;

use crate::value::SqlValue;

/// Logical operator. On a `Condition`, `logic` names the operator used to
/// join this condition to the *next* one in sequence (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    fn as_sql(&self) -> &'static str {
        match self {
            LogicOp::And => "AND",
            LogicOp::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    All,
    Any,
    Some,
}

impl Quantifier {
    fn as_sql(&self) -> &'static str {
        match self {
            Quantifier::All => "ALL",
            Quantifier::Any => "ANY",
            Quantifier::Some => "SOME",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    fn as_sql(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Neq => "<>",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
        }
    }
}

/// One predicate, not yet assigned parameter numbers (that happens at
/// render time so the whole statement can share one counter).
#[derive(Debug, Clone)]
pub enum Predicate {
    Cmp(CmpOp, String, SqlValue),
    Like(String, String),
    ILike(String, String),
    In(String, Vec<SqlValue>),
    NotIn(String, Vec<SqlValue>),
    IsNull(String),
    IsNotNull(String),
    Between(String, SqlValue, SqlValue),
    Not(Box<Condition>),
    Regex(String, String),
    RegexI(String, String),
    NotRegex(String, String),
    JsonContains(String, SqlValue),
    JsonContainedBy(String, SqlValue),
    JsonHasKey(String, String),
    JsonHasAnyKey(String, Vec<String>),
    JsonHasAllKeys(String, Vec<String>),
    /// `data->'a'->'b'` (object traversal) or, when `as_text` is set on the
    /// final hop, `data->'a'->>'b'` (text extraction).
    JsonPath {
        column: String,
        path: Vec<String>,
        as_text: bool,
    },
    ArrayContains(String, Vec<SqlValue>),
    ArrayContainedBy(String, Vec<SqlValue>),
    ArrayOverlap(String, Vec<SqlValue>),
    FullText(String, String),
    InSubquery(String, RawSubquery),
    ExistsSubquery(RawSubquery),
    NotExistsSubquery(RawSubquery),
    Quantified(String, CmpOp, Quantifier, RawSubquery),
    Group(Vec<Condition>),
    Raw(String, Vec<SqlValue>),
}

/// A predicate paired with the logical operator joining it to whatever
/// condition follows it in the enclosing list.
#[derive(Debug, Clone)]
pub struct Condition {
    pub predicate: Predicate,
    pub logic: LogicOp,
}

impl Condition {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            logic: LogicOp::And,
        }
    }

    pub fn or(mut self) -> Self {
        self.logic = LogicOp::Or;
        self
    }

    pub fn and(mut self) -> Self {
        self.logic = LogicOp::And;
        self
    }
}

// ---- predicate constructors (spec.md §4.5) -------------------------------

pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Condition {
    Condition::new(Predicate::Cmp(CmpOp::Eq, column.into(), value.into()))
}
pub fn neq(column: impl Into<String>, value: impl Into<SqlValue>) -> Condition {
    Condition::new(Predicate::Cmp(CmpOp::Neq, column.into(), value.into()))
}
pub fn gt(column: impl Into<String>, value: impl Into<SqlValue>) -> Condition {
    Condition::new(Predicate::Cmp(CmpOp::Gt, column.into(), value.into()))
}
pub fn gte(column: impl Into<String>, value: impl Into<SqlValue>) -> Condition {
    Condition::new(Predicate::Cmp(CmpOp::Gte, column.into(), value.into()))
}
pub fn lt(column: impl Into<String>, value: impl Into<SqlValue>) -> Condition {
    Condition::new(Predicate::Cmp(CmpOp::Lt, column.into(), value.into()))
}
pub fn lte(column: impl Into<String>, value: impl Into<SqlValue>) -> Condition {
    Condition::new(Predicate::Cmp(CmpOp::Lte, column.into(), value.into()))
}
pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Condition {
    Condition::new(Predicate::Like(column.into(), pattern.into()))
}
pub fn ilike(column: impl Into<String>, pattern: impl Into<String>) -> Condition {
    Condition::new(Predicate::ILike(column.into(), pattern.into()))
}
pub fn in_(column: impl Into<String>, values: Vec<SqlValue>) -> Condition {
    Condition::new(Predicate::In(column.into(), values))
}
pub fn not_in(column: impl Into<String>, values: Vec<SqlValue>) -> Condition {
    Condition::new(Predicate::NotIn(column.into(), values))
}
pub fn is_null(column: impl Into<String>) -> Condition {
    Condition::new(Predicate::IsNull(column.into()))
}
pub fn is_not_null(column: impl Into<String>) -> Condition {
    Condition::new(Predicate::IsNotNull(column.into()))
}
pub fn between(column: impl Into<String>, lo: impl Into<SqlValue>, hi: impl Into<SqlValue>) -> Condition {
    Condition::new(Predicate::Between(column.into(), lo.into(), hi.into()))
}
pub fn not(inner: Condition) -> Condition {
    Condition::new(Predicate::Not(Box::new(inner)))
}
pub fn regex(column: impl Into<String>, pattern: impl Into<String>) -> Condition {
    Condition::new(Predicate::Regex(column.into(), pattern.into()))
}
pub fn regex_i(column: impl Into<String>, pattern: impl Into<String>) -> Condition {
    Condition::new(Predicate::RegexI(column.into(), pattern.into()))
}
pub fn not_regex(column: impl Into<String>, pattern: impl Into<String>) -> Condition {
    Condition::new(Predicate::NotRegex(column.into(), pattern.into()))
}
pub fn group(conditions: Vec<Condition>) -> Condition {
    Condition::new(Predicate::Group(conditions))
}
pub fn raw(sql: impl Into<String>, args: Vec<SqlValue>) -> Condition {
    Condition::new(Predicate::Raw(sql.into(), args))
}

// ---- JSONB operators ------------------------------------------------------

pub fn json_contains(column: impl Into<String>, value: impl Into<SqlValue>) -> Condition {
    Condition::new(Predicate::JsonContains(column.into(), value.into()))
}
pub fn json_contained_by(column: impl Into<String>, value: impl Into<SqlValue>) -> Condition {
    Condition::new(Predicate::JsonContainedBy(column.into(), value.into()))
}
pub fn json_has_key(column: impl Into<String>, key: impl Into<String>) -> Condition {
    Condition::new(Predicate::JsonHasKey(column.into(), key.into()))
}
pub fn json_has_any_key(column: impl Into<String>, keys: Vec<String>) -> Condition {
    Condition::new(Predicate::JsonHasAnyKey(column.into(), keys))
}
pub fn json_has_all_keys(column: impl Into<String>, keys: Vec<String>) -> Condition {
    Condition::new(Predicate::JsonHasAllKeys(column.into(), keys))
}
pub fn json_path(column: impl Into<String>, path: Vec<String>) -> Condition {
    Condition::new(Predicate::JsonPath {
        column: column.into(),
        path,
        as_text: false,
    })
}
pub fn json_path_text(column: impl Into<String>, path: Vec<String>) -> Condition {
    Condition::new(Predicate::JsonPath {
        column: column.into(),
        path,
        as_text: true,
    })
}

// ---- array operators -------------------------------------------------------

pub fn array_contains(column: impl Into<String>, values: Vec<SqlValue>) -> Condition {
    Condition::new(Predicate::ArrayContains(column.into(), values))
}
pub fn array_contained_by(column: impl Into<String>, values: Vec<SqlValue>) -> Condition {
    Condition::new(Predicate::ArrayContainedBy(column.into(), values))
}
pub fn array_overlap(column: impl Into<String>, values: Vec<SqlValue>) -> Condition {
    Condition::new(Predicate::ArrayOverlap(column.into(), values))
}

// ---- full text --------------------------------------------------------------

pub fn full_text_match(column: impl Into<String>, query: impl Into<String>) -> Condition {
    Condition::new(Predicate::FullText(column.into(), query.into()))
}

// ---- subquery integration -----------------------------------------------

pub fn in_subquery(column: impl Into<String>, sub: RawSubquery) -> Condition {
    Condition::new(Predicate::InSubquery(column.into(), sub))
}
pub fn exists(sub: RawSubquery) -> Condition {
    Condition::new(Predicate::ExistsSubquery(sub))
}
pub fn not_exists(sub: RawSubquery) -> Condition {
    Condition::new(Predicate::NotExistsSubquery(sub))
}
pub fn quantified(column: impl Into<String>, op: CmpOp, quantifier: Quantifier, sub: RawSubquery) -> Condition {
    Condition::new(Predicate::Quantified(column.into(), op, quantifier, sub))
}

/// Renders a chain of conditions (joined by each condition's own `logic`)
/// into a SQL fragment, starting parameter numbering at `*next_param`.
/// Returns the fragment text (without a leading `WHERE`/`HAVING` keyword)
/// and the flattened argument list in emission order.
pub fn render_conditions(conditions: &[Condition], next_param: &mut usize) -> (String, Vec<SqlValue>) {
    let mut sql = String::new();
    let mut args = Vec::new();
    for (i, cond) in conditions.iter().enumerate() {
        let (frag, frag_args) = render_predicate(&cond.predicate, next_param);
        sql.push_str(&frag);
        args.extend(frag_args);
        if i + 1 < conditions.len() {
            sql.push(' ');
            sql.push_str(cond.logic.as_sql());
            sql.push(' ');
        }
    }
    (sql, args)
}

fn placeholder(next_param: &mut usize) -> String {
    let p = *next_param;
    *next_param += 1;
    format!("${p}")
}

fn render_predicate(predicate: &Predicate, next_param: &mut usize) -> (String, Vec<SqlValue>) {
    match predicate {
        Predicate::Cmp(op, col, val) => {
            let ph = placeholder(next_param);
            (format!("{col} {} {ph}", op.as_sql()), vec![val.clone()])
        }
        Predicate::Like(col, pat) => {
            let ph = placeholder(next_param);
            (format!("{col} LIKE {ph}"), vec![SqlValue::Text(pat.clone())])
        }
        Predicate::ILike(col, pat) => {
            let ph = placeholder(next_param);
            (format!("{col} ILIKE {ph}"), vec![SqlValue::Text(pat.clone())])
        }
        Predicate::In(col, values) => {
            let ph = placeholder(next_param);
            (
                format!("{col} = ANY({ph})"),
                vec![SqlValue::Array(values.clone())],
            )
        }
        Predicate::NotIn(col, values) => {
            let ph = placeholder(next_param);
            (
                format!("{col} <> ALL({ph})"),
                vec![SqlValue::Array(values.clone())],
            )
        }
        Predicate::IsNull(col) => (format!("{col} IS NULL"), Vec::new()),
        Predicate::IsNotNull(col) => (format!("{col} IS NOT NULL"), Vec::new()),
        Predicate::Between(col, lo, hi) => {
            let p1 = placeholder(next_param);
            let p2 = placeholder(next_param);
            (
                format!("{col} BETWEEN {p1} AND {p2}"),
                vec![lo.clone(), hi.clone()],
            )
        }
        Predicate::Not(inner) => {
            let (frag, args) = render_predicate(&inner.predicate, next_param);
            (format!("NOT ({frag})"), args)
        }
        Predicate::Regex(col, pat) => {
            let ph = placeholder(next_param);
            (format!("{col} ~ {ph}"), vec![SqlValue::Text(pat.clone())])
        }
        Predicate::RegexI(col, pat) => {
            let ph = placeholder(next_param);
            (format!("{col} ~* {ph}"), vec![SqlValue::Text(pat.clone())])
        }
        Predicate::NotRegex(col, pat) => {
            let ph = placeholder(next_param);
            (format!("{col} !~ {ph}"), vec![SqlValue::Text(pat.clone())])
        }
        Predicate::JsonContains(col, val) => {
            let ph = placeholder(next_param);
            (format!("{col} @> {ph}"), vec![val.clone()])
        }
        Predicate::JsonContainedBy(col, val) => {
            let ph = placeholder(next_param);
            (format!("{col} <@ {ph}"), vec![val.clone()])
        }
        Predicate::JsonHasKey(col, key) => {
            let ph = placeholder(next_param);
            (format!("{col} ? {ph}"), vec![SqlValue::Text(key.clone())])
        }
        Predicate::JsonHasAnyKey(col, keys) => {
            let ph = placeholder(next_param);
            (
                format!("{col} ?| {ph}"),
                vec![SqlValue::Array(keys.iter().map(|k| SqlValue::Text(k.clone())).collect())],
            )
        }
        Predicate::JsonHasAllKeys(col, keys) => {
            let ph = placeholder(next_param);
            (
                format!("{col} ?& {ph}"),
                vec![SqlValue::Array(keys.iter().map(|k| SqlValue::Text(k.clone())).collect())],
            )
        }
        Predicate::JsonPath { column, path, as_text } => {
            let mut sql = column.clone();
            for (i, key) in path.iter().enumerate() {
                let is_last = i + 1 == path.len();
                let op = if is_last && *as_text { "->>" } else { "->" };
                sql.push_str(&format!("{op}'{key}'"));
            }
            (sql, Vec::new())
        }
        Predicate::ArrayContains(col, values) => {
            let ph = placeholder(next_param);
            (format!("{col} @> {ph}"), vec![SqlValue::Array(values.clone())])
        }
        Predicate::ArrayContainedBy(col, values) => {
            let ph = placeholder(next_param);
            (format!("{col} <@ {ph}"), vec![SqlValue::Array(values.clone())])
        }
        Predicate::ArrayOverlap(col, values) => {
            let ph = placeholder(next_param);
            (format!("{col} && {ph}"), vec![SqlValue::Array(values.clone())])
        }
        Predicate::FullText(col, query) => {
            let ph = placeholder(next_param);
            (
                format!("to_tsvector({col}) @@ to_tsquery({ph})"),
                vec![SqlValue::Text(query.clone())],
            )
        }
        Predicate::InSubquery(col, sub) => {
            let (sub_sql, sub_args) = sub.render(next_param);
            (format!("{col} IN ({sub_sql})"), sub_args)
        }
        Predicate::ExistsSubquery(sub) => {
            let (sub_sql, sub_args) = sub.render(next_param);
            (format!("EXISTS ({sub_sql})"), sub_args)
        }
        Predicate::NotExistsSubquery(sub) => {
            let (sub_sql, sub_args) = sub.render(next_param);
            (format!("NOT EXISTS ({sub_sql})"), sub_args)
        }
        Predicate::Quantified(col, op, quantifier, sub) => {
            let (sub_sql, sub_args) = sub.render(next_param);
            (
                format!("{col} {} {} ({sub_sql})", op.as_sql(), quantifier.as_sql()),
                sub_args,
            )
        }
        Predicate::Group(conditions) => {
            let (frag, args) = render_conditions(conditions, next_param);
            (format!("({frag})"), args)
        }
        Predicate::Raw(sql, args) => {
            // Raw fragments use literal `?` markers for positions in order.
            let mut rendered = String::with_capacity(sql.len());
            for ch in sql.chars() {
                if ch == '?' {
                    rendered.push_str(&placeholder(next_param));
                } else {
                    rendered.push(ch);
                }
            }
            (rendered, args.clone())
        }
    }
}
