//! Converts `tokio_postgres::Error` into `pebble_core::error::Error`,
//! classifying constraint violations by SQLSTATE (spec.md §7).

use pebble_core::error::{ConstraintKind, Error};

fn classify(code: &tokio_postgres::error::SqlState) -> Option<ConstraintKind> {
    match code.code() {
        "23505" => Some(ConstraintKind::Unique),
        "23503" => Some(ConstraintKind::ForeignKey),
        "23514" => Some(ConstraintKind::Check),
        "23502" => Some(ConstraintKind::NotNull),
        _ => None,
    }
}

pub(crate) fn convert(err: tokio_postgres::Error) -> Error {
    if let Some(db_err) = err.as_db_error() {
        if let Some(kind) = classify(db_err.code()) {
            return Error::ConstraintViolation {
                kind,
                detail: db_err.message().to_string().into(),
            };
        }
    }
    Error::driver(err)
}
