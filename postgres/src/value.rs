//! Bridges `pebble_core::value::SqlValue` to `tokio-postgres`'s wire types.
//!
//! Grounded on the teacher's `postgres/src/values/drivers.rs`: one local
//! wrapper type implementing `ToSql` by delegating each variant to the inner
//! value's own `ToSql` impl (the orphan rule rules out implementing `ToSql`
//! directly on `SqlValue`, which lives in `pebble-core`), and `accepts`
//! returns `true` unconditionally — conversion failures surface from
//! `to_sql` itself rather than from type negotiation.

use bytes::BytesMut;
use pebble_core::error::Error;
use pebble_core::value::SqlValue;
use postgres_types::{IsNull, ToSql, Type};

/// A borrowed `SqlValue` ready to hand to `tokio-postgres` as a bind
/// parameter.
pub(crate) struct ParamRef<'a>(pub &'a SqlValue);

impl ToSql for ParamRef<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(b) => b.to_sql(ty, out),
            SqlValue::SmallInt(n) => n.to_sql(ty, out),
            SqlValue::Int(n) => n.to_sql(ty, out),
            SqlValue::BigInt(n) => n.to_sql(ty, out),
            SqlValue::Real(n) => n.to_sql(ty, out),
            SqlValue::Double(n) => n.to_sql(ty, out),
            SqlValue::Text(s) => s.to_sql(ty, out),
            SqlValue::Bytes(b) => b.to_sql(ty, out),
            #[cfg(feature = "uuid")]
            SqlValue::Uuid(u) => u.to_sql(ty, out),
            #[cfg(feature = "chrono")]
            SqlValue::Date(d) => d.to_sql(ty, out),
            #[cfg(feature = "chrono")]
            SqlValue::Time(t) => t.to_sql(ty, out),
            #[cfg(feature = "chrono")]
            SqlValue::Timestamp(t) => t.to_sql(ty, out),
            #[cfg(feature = "chrono")]
            SqlValue::TimestampTz(t) => t.to_sql(ty, out),
            #[cfg(feature = "rust-decimal")]
            SqlValue::Numeric(d) => d.to_sql(ty, out),
            SqlValue::Json(text) => {
                let value: serde_json::Value = serde_json::from_str(text).unwrap_or(serde_json::Value::Null);
                value.to_sql(ty, out)
            }
            SqlValue::Array(items) => {
                let refs: Vec<ParamRef<'_>> = items.iter().map(ParamRef).collect();
                refs.to_sql(ty, out)
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

pub(crate) fn to_params(args: &[SqlValue]) -> Vec<ParamRef<'_>> {
    args.iter().map(ParamRef).collect()
}

pub(crate) fn param_refs<'a>(params: &'a [ParamRef<'a>]) -> Vec<&'a (dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

/// Decodes one column of a `tokio_postgres::Row` into a `SqlValue`, picking
/// the Rust type to request from `tokio-postgres` based on the column's
/// reported wire `Type` (spec.md §6: the driver owns the wire-type mapping).
pub(crate) fn column_value(row: &tokio_postgres::Row, idx: usize) -> Result<SqlValue, Error> {
    let ty = row.columns()[idx].type_();
    let get_err = |e: tokio_postgres::Error| Error::driver(e);

    Ok(match *ty {
        Type::BOOL => match row.try_get::<_, Option<bool>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::Bool(v),
            None => SqlValue::Null,
        },
        Type::INT2 => match row.try_get::<_, Option<i16>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::SmallInt(v),
            None => SqlValue::Null,
        },
        Type::INT4 => match row.try_get::<_, Option<i32>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::Int(v),
            None => SqlValue::Null,
        },
        Type::INT8 => match row.try_get::<_, Option<i64>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::BigInt(v),
            None => SqlValue::Null,
        },
        Type::FLOAT4 => match row.try_get::<_, Option<f32>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::Real(v),
            None => SqlValue::Null,
        },
        Type::FLOAT8 => match row.try_get::<_, Option<f64>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::Double(v),
            None => SqlValue::Null,
        },
        Type::BYTEA => match row.try_get::<_, Option<Vec<u8>>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::Bytes(v),
            None => SqlValue::Null,
        },
        #[cfg(feature = "uuid")]
        Type::UUID => match row.try_get::<_, Option<uuid::Uuid>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::Uuid(v),
            None => SqlValue::Null,
        },
        #[cfg(feature = "chrono")]
        Type::DATE => match row.try_get::<_, Option<chrono::NaiveDate>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::Date(v),
            None => SqlValue::Null,
        },
        #[cfg(feature = "chrono")]
        Type::TIME => match row.try_get::<_, Option<chrono::NaiveTime>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::Time(v),
            None => SqlValue::Null,
        },
        #[cfg(feature = "chrono")]
        Type::TIMESTAMP => match row.try_get::<_, Option<chrono::NaiveDateTime>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::Timestamp(v),
            None => SqlValue::Null,
        },
        #[cfg(feature = "chrono")]
        Type::TIMESTAMPTZ => match row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .map_err(get_err)?
        {
            Some(v) => SqlValue::TimestampTz(v),
            None => SqlValue::Null,
        },
        #[cfg(feature = "rust-decimal")]
        Type::NUMERIC => match row.try_get::<_, Option<rust_decimal::Decimal>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::Numeric(v),
            None => SqlValue::Null,
        },
        Type::JSON | Type::JSONB => match row.try_get::<_, Option<serde_json::Value>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::Json(v.to_string()),
            None => SqlValue::Null,
        },
        // Unknown/enum/composite types: request text representation. Postgres
        // sends user-defined enum values over the wire as plain text, which
        // matches `SqlType::parse`'s own catalog-string handling.
        _ => match row.try_get::<_, Option<String>>(idx).map_err(get_err)? {
            Some(v) => SqlValue::Text(v),
            None => SqlValue::Null,
        },
    })
}
