//! `SqlValue <-> host type` conversions consumed by `#[derive(Table)]`
//! generated `FromRow`/`ToRow` impls (`pebble-macros`).
//!
//! Grounded on the teacher's `traits::value` conversion layer
//! (`postgres/src/traits/value.rs`, `postgres/src/values/conversions.rs`):
//! one trait, blanket `From` on the write side, a dedicated `FromSqlValue`
//! on the read side so generated code stays a single `?`-propagating call
//! per field rather than a hand-written match per scalar type.

use crate::error::{Error, Result};
use crate::value::SqlValue;

#[cfg(feature = "chrono")]
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
#[cfg(feature = "rust-decimal")]
use rust_decimal::Decimal;
#[cfg(feature = "uuid")]
use uuid::Uuid;

/// Converts a scanned [`SqlValue`] back into its host representation.
/// Implemented for every scalar `SqlValue` carries plus `Option<T>` (NULL ⇒
/// `None`) and `Vec<T>` (a Postgres array column).
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: SqlValue) -> Result<Self>;
}

fn type_mismatch(expected: &str, found: &SqlValue) -> Error {
    Error::metadata(format!(
        "expected {expected}, found {}",
        found.type_name()
    ))
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            other => Err(type_mismatch("boolean", &other)),
        }
    }
}

macro_rules! impl_from_sql_int {
    ($ty:ty, $variant:ident) => {
        impl FromSqlValue for $ty {
            fn from_sql_value(value: SqlValue) -> Result<Self> {
                match value {
                    SqlValue::$variant(n) => Ok(n as $ty),
                    SqlValue::SmallInt(n) => Ok(n as $ty),
                    SqlValue::Int(n) => Ok(n as $ty),
                    SqlValue::BigInt(n) => Ok(n as $ty),
                    other => Err(type_mismatch(stringify!($ty), &other)),
                }
            }
        }
    };
}

impl_from_sql_int!(i16, SmallInt);
impl_from_sql_int!(i32, Int);
impl_from_sql_int!(i64, BigInt);

impl FromSqlValue for f32 {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Real(n) => Ok(n),
            SqlValue::Double(n) => Ok(n as f32),
            other => Err(type_mismatch("real", &other)),
        }
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Double(n) => Ok(n),
            SqlValue::Real(n) => Ok(n as f64),
            other => Err(type_mismatch("double precision", &other)),
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Text(s) | SqlValue::Json(s) => Ok(s),
            other => Err(type_mismatch("text", &other)),
        }
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Bytes(b) => Ok(b),
            other => Err(type_mismatch("bytea", &other)),
        }
    }
}

#[cfg(feature = "uuid")]
impl FromSqlValue for Uuid {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Uuid(u) => Ok(u),
            other => Err(type_mismatch("uuid", &other)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSqlValue for NaiveDate {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Date(d) => Ok(d),
            other => Err(type_mismatch("date", &other)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSqlValue for NaiveTime {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Time(t) => Ok(t),
            other => Err(type_mismatch("time", &other)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Timestamp(t) => Ok(t),
            other => Err(type_mismatch("timestamp", &other)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::TimestampTz(t) => Ok(t),
            other => Err(type_mismatch("timestamptz", &other)),
        }
    }
}

#[cfg(feature = "rust-decimal")]
impl FromSqlValue for Decimal {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Numeric(d) => Ok(d),
            other => Err(type_mismatch("numeric", &other)),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(None),
            other => Ok(Some(T::from_sql_value(other)?)),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Vec<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Array(items) => items.into_iter().map(T::from_sql_value).collect(),
            other => Err(type_mismatch("array", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_scalars() {
        assert_eq!(i32::from_sql_value(SqlValue::Int(7)).unwrap(), 7);
        assert_eq!(String::from_sql_value(SqlValue::Text("x".into())).unwrap(), "x");
    }

    #[test]
    fn converts_null_option() {
        assert_eq!(Option::<i32>::from_sql_value(SqlValue::Null).unwrap(), None);
        assert_eq!(Option::<i32>::from_sql_value(SqlValue::Int(3)).unwrap(), Some(3));
    }

    #[test]
    fn converts_array() {
        let v = Vec::<i32>::from_sql_value(SqlValue::Array(vec![SqlValue::Int(1), SqlValue::Int(2)])).unwrap();
        assert_eq!(v, vec![1, 2]);
    }

    #[test]
    fn rejects_wrong_variant() {
        assert!(i32::from_sql_value(SqlValue::Text("x".into())).is_err());
    }
}
