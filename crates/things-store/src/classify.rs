//! Classification of `sqlx` SQLite failures for the error translator.

use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;
use things_core::{translate, ClassifyStoreError, Operation, StoreErrorCode, ThingsError};

/// Suffix shared by the schema's size-limit `CHECK` constraints.
const LENGTH_CONSTRAINT_SUFFIX: &str = "_length";

// Primary SQLite result codes; extended codes keep these in the low byte.
const SQLITE_TOOBIG: u32 = 18;
const SQLITE_MISMATCH: u32 = 20;

/// A `sqlx` error as seen by the translator.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct SqliteStoreError(#[from] sqlx::Error);

impl ClassifyStoreError for SqliteStoreError {
    fn store_error_code(&self) -> StoreErrorCode {
        match &self.0 {
            sqlx::Error::RowNotFound => StoreErrorCode::NoRows,
            sqlx::Error::Database(db_err) => classify_database_error(db_err.as_ref()),
            _ => StoreErrorCode::Unclassified,
        }
    }
}

fn classify_database_error(err: &dyn DatabaseError) -> StoreErrorCode {
    match err.kind() {
        ErrorKind::UniqueViolation => StoreErrorCode::UniqueViolation,
        ErrorKind::ForeignKeyViolation => StoreErrorCode::ForeignKeyViolation,
        ErrorKind::CheckViolation => classify_check(err.message()),
        ErrorKind::NotNullViolation => StoreErrorCode::InvalidEncoding,
        _ => match primary_result_code(err) {
            Some(SQLITE_TOOBIG) => StoreErrorCode::Truncation,
            Some(SQLITE_MISMATCH) => StoreErrorCode::InvalidEncoding,
            _ => classify_message(err.message()),
        },
    }
}

// Connections opened without extended result codes only carry the message.
fn classify_message(message: &str) -> StoreErrorCode {
    if message.contains("UNIQUE constraint failed") {
        StoreErrorCode::UniqueViolation
    } else if message.contains("FOREIGN KEY constraint failed") {
        StoreErrorCode::ForeignKeyViolation
    } else if message.contains("CHECK constraint failed") {
        classify_check(message)
    } else if message.contains("NOT NULL constraint failed") {
        StoreErrorCode::InvalidEncoding
    } else {
        StoreErrorCode::Unclassified
    }
}

fn classify_check(message: &str) -> StoreErrorCode {
    if message.contains(LENGTH_CONSTRAINT_SUFFIX) {
        StoreErrorCode::Truncation
    } else {
        StoreErrorCode::InvalidEncoding
    }
}

fn primary_result_code(err: &dyn DatabaseError) -> Option<u32> {
    err.code()
        .and_then(|code| code.parse::<u32>().ok())
        .map(|code| code & 0xff)
}

/// Translates a `sqlx` failure for the given operation.
pub(crate) fn store_error(operation: Operation, context: &str, err: sqlx::Error) -> ThingsError {
    translate(operation, context, SqliteStoreError::from(err))
}
