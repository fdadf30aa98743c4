//! A dialect-agnostic dynamic value used for query parameters and scanned
//! columns before they reach the concrete driver binding in `pebble-postgres`.
//!
//! Grounded on the teacher's `OwnedPostgresValue` enum (one variant per wire
//! type, all owned so the value can outlive the row it was read from).

use compact_str::CompactString;

#[cfg(feature = "chrono")]
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
#[cfg(feature = "rust-decimal")]
use rust_decimal::Decimal;
#[cfg(feature = "uuid")]
use uuid::Uuid;

/// An owned, dynamically-typed SQL value.
///
/// Every terminal statement builder in C9 produces a `Vec<SqlValue>` of
/// positional arguments; the scanner (C7) produces these when decoding rows
/// whose host type isn't available to it directly (e.g. during introspection
/// or ad-hoc queries).
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    #[cfg(feature = "uuid")]
    Uuid(Uuid),
    #[cfg(feature = "chrono")]
    Date(NaiveDate),
    #[cfg(feature = "chrono")]
    Time(NaiveTime),
    #[cfg(feature = "chrono")]
    Timestamp(NaiveDateTime),
    #[cfg(feature = "chrono")]
    TimestampTz(DateTime<Utc>),
    #[cfg(feature = "rust-decimal")]
    Numeric(Decimal),
    /// JSONB/JSON payload, always sent as text (see C7 design note: byte
    /// arrays are liable to be encoded as bytea by the wire driver).
    Json(String),
    /// A Postgres array of homogeneous scalar values.
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Whether this value is the "zero value" for the smart-default rule
    /// (spec.md §3.1 and §4.4). Only scalar emptiness counts; `Null` is
    /// never itself a smart-default trigger — an explicit `NULL` write is
    /// never omitted, only the host's default-constructed value is.
    pub fn is_zero(&self) -> bool {
        match self {
            SqlValue::Null => false,
            SqlValue::Bool(b) => !*b,
            SqlValue::SmallInt(n) => *n == 0,
            SqlValue::Int(n) => *n == 0,
            SqlValue::BigInt(n) => *n == 0,
            SqlValue::Real(n) => *n == 0.0,
            SqlValue::Double(n) => *n == 0.0,
            SqlValue::Text(s) => s.is_empty(),
            SqlValue::Bytes(b) => b.is_empty(),
            #[cfg(feature = "uuid")]
            SqlValue::Uuid(u) => u.is_nil(),
            #[cfg(feature = "chrono")]
            SqlValue::Date(_) | SqlValue::Time(_) | SqlValue::Timestamp(_) | SqlValue::TimestampTz(_) => false,
            #[cfg(feature = "rust-decimal")]
            SqlValue::Numeric(d) => d.is_zero(),
            SqlValue::Json(s) => s.is_empty() || s == "null",
            SqlValue::Array(v) => v.is_empty(),
        }
    }

    pub fn type_name(&self) -> CompactString {
        CompactString::new(match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "boolean",
            SqlValue::SmallInt(_) => "smallint",
            SqlValue::Int(_) => "integer",
            SqlValue::BigInt(_) => "bigint",
            SqlValue::Real(_) => "real",
            SqlValue::Double(_) => "double precision",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytea",
            #[cfg(feature = "uuid")]
            SqlValue::Uuid(_) => "uuid",
            #[cfg(feature = "chrono")]
            SqlValue::Date(_) => "date",
            #[cfg(feature = "chrono")]
            SqlValue::Time(_) => "time",
            #[cfg(feature = "chrono")]
            SqlValue::Timestamp(_) => "timestamp",
            #[cfg(feature = "chrono")]
            SqlValue::TimestampTz(_) => "timestamptz",
            #[cfg(feature = "rust-decimal")]
            SqlValue::Numeric(_) => "numeric",
            SqlValue::Json(_) => "jsonb",
            SqlValue::Array(_) => "array",
        })
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}
impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        SqlValue::SmallInt(v)
    }
}
impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v)
    }
}
impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::BigInt(v)
    }
}
impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        SqlValue::Real(v)
    }
}
impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Double(v)
    }
}
impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}
impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_owned())
    }
}
impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(feature = "uuid")]
impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

#[cfg(feature = "chrono")]
impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}
#[cfg(feature = "chrono")]
impl From<NaiveTime> for SqlValue {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(v)
    }
}
#[cfg(feature = "chrono")]
impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}
#[cfg(feature = "chrono")]
impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::TimestampTz(v)
    }
}
#[cfg(feature = "rust-decimal")]
impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Numeric(v)
    }
}
impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(v: Vec<T>) -> Self {
        SqlValue::Array(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values() {
        assert!(SqlValue::Int(0).is_zero());
        assert!(!SqlValue::Int(1).is_zero());
        assert!(SqlValue::Text(String::new()).is_zero());
        assert!(!SqlValue::Text("x".into()).is_zero());
        assert!(!SqlValue::Null.is_zero());
    }
}
