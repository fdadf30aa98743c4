//! Type Mapper (C1): bidirectional host-type <-> Postgres SQL-type
//! translation, plus geometric value formatting (spec.md §4.1).

/// A parsed, canonical Postgres SQL type (e.g. `numeric(10,2)`, `text[]`).
#[derive(Debug, Clone, PartialEq)]
pub enum SqlType {
    SmallInt,
    Integer,
    BigInt,
    Serial,
    BigSerial,
    Numeric {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    Boolean,
    TimestampTz,
    Timestamp,
    Date,
    Time,
    /// Stored as `interval` text; durations are not natively supported
    /// (spec.md §4.1).
    Interval,
    Varchar(Option<u32>),
    Text,
    Uuid,
    Jsonb,
    Array(Box<SqlType>),
    Geometric(GeometricKind),
    Enum(String),
    /// Any other raw type string, used verbatim (e.g. `cidr`, `inet`).
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometricKind {
    Point,
    Line,
    Box,
    Polygon,
    Circle,
    Path,
    Lseg,
}

impl GeometricKind {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "point" => GeometricKind::Point,
            "line" => GeometricKind::Line,
            "box" => GeometricKind::Box,
            "polygon" => GeometricKind::Polygon,
            "circle" => GeometricKind::Circle,
            "path" => GeometricKind::Path,
            "lseg" => GeometricKind::Lseg,
            _ => return None,
        })
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            GeometricKind::Point => "point",
            GeometricKind::Line => "line",
            GeometricKind::Box => "box",
            GeometricKind::Polygon => "polygon",
            GeometricKind::Circle => "circle",
            GeometricKind::Path => "path",
            GeometricKind::Lseg => "lseg",
        }
    }
}

/// Round-trips a sequence of `(f64, f64)` pairs through Postgres's canonical
/// parenthesized point-list format, e.g. `((1,2),(3,4))` for a `polygon`.
pub fn format_point_list(points: &[(f64, f64)]) -> String {
    let body = points
        .iter()
        .map(|(x, y)| format!("({x},{y})"))
        .collect::<Vec<_>>()
        .join(",");
    format!("({body})")
}

pub fn parse_point_list(s: &str) -> Option<Vec<(f64, f64)>> {
    let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
    let mut points = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in inner.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
                if depth == 0 {
                    points.push(parse_single_point(&current)?);
                    current.clear();
                }
            }
            ',' if depth == 0 => {}
            _ => current.push(ch),
        }
    }
    Some(points)
}

fn parse_single_point(s: &str) -> Option<(f64, f64)> {
    let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
    let mut parts = inner.splitn(2, ',');
    let x: f64 = parts.next()?.trim().parse().ok()?;
    let y: f64 = parts.next()?.trim().parse().ok()?;
    Some((x, y))
}

/// Formats a single `point` value: `(x,y)`.
pub fn format_point(x: f64, y: f64) -> String {
    format!("({x},{y})")
}

pub fn parse_point(s: &str) -> Option<(f64, f64)> {
    parse_single_point(s)
}

/// Formats a `circle` value: `<(x,y),r>`.
pub fn format_circle(x: f64, y: f64, r: f64) -> String {
    format!("<({x},{y}),{r}>")
}

pub fn parse_circle(s: &str) -> Option<(f64, f64, f64)> {
    let inner = s.trim().trim_start_matches('<').trim_end_matches('>');
    let comma = inner.rfind(',')?;
    let (center, radius) = inner.split_at(comma);
    let radius: f64 = radius[1..].trim().parse().ok()?;
    let (x, y) = parse_single_point(center)?;
    Some((x, y, radius))
}

impl SqlType {
    /// Render the canonical SQL type string used in DDL and as
    /// `ColumnMetadata::sql_type` (spec.md §4.1).
    pub fn render(&self) -> String {
        match self {
            SqlType::SmallInt => "smallint".to_string(),
            SqlType::Integer => "integer".to_string(),
            SqlType::BigInt => "bigint".to_string(),
            SqlType::Serial => "serial".to_string(),
            SqlType::BigSerial => "bigserial".to_string(),
            SqlType::Numeric { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("numeric({p},{s})"),
                (Some(p), None) => format!("numeric({p})"),
                _ => "numeric".to_string(),
            },
            SqlType::Boolean => "boolean".to_string(),
            SqlType::TimestampTz => "timestamptz".to_string(),
            SqlType::Timestamp => "timestamp".to_string(),
            SqlType::Date => "date".to_string(),
            SqlType::Time => "time".to_string(),
            SqlType::Interval => "interval".to_string(),
            SqlType::Varchar(Some(n)) => format!("varchar({n})"),
            SqlType::Varchar(None) => "varchar".to_string(),
            SqlType::Text => "text".to_string(),
            SqlType::Uuid => "uuid".to_string(),
            SqlType::Jsonb => "jsonb".to_string(),
            SqlType::Array(inner) => format!("{}[]", inner.render()),
            SqlType::Geometric(kind) => kind.as_sql().to_string(),
            SqlType::Enum(name) => name.clone(),
            SqlType::Other(raw) => raw.clone(),
        }
    }

    /// Parses a canonical SQL type string (as produced by `render`, or as
    /// reported verbatim by the live catalog) back into structured form.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Some(inner) = s.strip_suffix("[]") {
            return SqlType::Array(Box::new(SqlType::parse(inner)));
        }
        let lower = s.to_ascii_lowercase();
        if let Some(kind) = GeometricKind::parse(&lower) {
            return SqlType::Geometric(kind);
        }
        if lower == "serial" {
            return SqlType::Serial;
        }
        if lower == "bigserial" {
            return SqlType::BigSerial;
        }
        if lower.starts_with("varchar") {
            return SqlType::Varchar(extract_single_arg(&lower));
        }
        if lower.starts_with("numeric") || lower.starts_with("decimal") {
            let (p, s2) = extract_two_args(&lower);
            return SqlType::Numeric {
                precision: p,
                scale: s2,
            };
        }
        match lower.as_str() {
            "smallint" | "int2" => SqlType::SmallInt,
            "integer" | "int" | "int4" => SqlType::Integer,
            "bigint" | "int8" => SqlType::BigInt,
            "boolean" | "bool" => SqlType::Boolean,
            "timestamptz" | "timestamp with time zone" => SqlType::TimestampTz,
            "timestamp" | "timestamp without time zone" => SqlType::Timestamp,
            "date" => SqlType::Date,
            "time" => SqlType::Time,
            "interval" => SqlType::Interval,
            "text" => SqlType::Text,
            "uuid" => SqlType::Uuid,
            "jsonb" | "json" => SqlType::Jsonb,
            other => SqlType::Other(other.to_string()),
        }
    }
}

fn extract_single_arg(s: &str) -> Option<u32> {
    let start = s.find('(')?;
    let end = s.find(')')?;
    s[start + 1..end].trim().parse().ok()
}

fn extract_two_args(s: &str) -> (Option<u32>, Option<u32>) {
    let Some(start) = s.find('(') else {
        return (None, None);
    };
    let Some(end) = s.find(')') else {
        return (None, None);
    };
    let inner = &s[start + 1..end];
    let mut parts = inner.splitn(2, ',');
    let p = parts.next().and_then(|p| p.trim().parse().ok());
    let sc = parts.next().and_then(|s| s.trim().parse().ok());
    (p, sc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_and_parse_round_trip() {
        let cases = [
            "smallint",
            "integer",
            "bigint",
            "numeric(10,2)",
            "varchar(320)",
            "text",
            "text[]",
            "jsonb",
            "uuid",
            "timestamptz",
            "point",
        ];
        for case in cases {
            let parsed = SqlType::parse(case);
            assert_eq!(parsed.render(), case, "round trip for {case}");
        }
    }

    #[test]
    fn point_round_trips() {
        let s = format_point(1.5, -2.25);
        assert_eq!(s, "(1.5,-2.25)");
        assert_eq!(parse_point(&s), Some((1.5, -2.25)));
    }

    #[test]
    fn circle_round_trips() {
        let s = format_circle(1.0, 2.0, 3.5);
        assert_eq!(parse_circle(&s), Some((1.0, 2.0, 3.5)));
    }

    #[test]
    fn polygon_round_trips() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)];
        let s = format_point_list(&pts);
        assert_eq!(parse_point_list(&s), Some(pts));
    }
}
