//! Translation of low-level store failures into the domain error taxonomy.
//!
//! Store backends only implement [`ClassifyStoreError`]; the mapping from a
//! [`StoreErrorCode`] to an [`ErrorKind`] lives here and is identical for
//! every backend.

use std::error::Error as StdError;

use crate::error::{ErrorKind, ThingsError};

/// Backend-independent category of a store failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreErrorCode {
    /// A value could not be represented in the target column type.
    InvalidEncoding,
    /// A value exceeds the column's size limit.
    Truncation,
    /// A uniqueness constraint was violated.
    UniqueViolation,
    /// A referenced row does not exist.
    ForeignKeyViolation,
    /// A query expected to return one row returned none.
    NoRows,
    /// Anything the backend could not classify.
    Unclassified,
}

/// Capability exposed by a store error so it can be translated.
pub trait ClassifyStoreError: StdError + Send + Sync + 'static {
    /// Returns the category of this failure.
    fn store_error_code(&self) -> StoreErrorCode;
}

/// Repository operation family, used to pick the fallback kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Select,
    Remove,
}

impl Operation {
    /// Kind reported for failures that carry no more specific classification.
    #[must_use]
    pub const fn fallback_kind(self) -> ErrorKind {
        match self {
            Self::Create => ErrorKind::CreateEntity,
            Self::Update => ErrorKind::UpdateEntity,
            Self::Select => ErrorKind::SelectEntity,
            Self::Remove => ErrorKind::RemoveEntity,
        }
    }
}

/// Maps a store error code to the domain kind for the given operation.
#[must_use]
pub const fn kind_for(operation: Operation, code: StoreErrorCode) -> ErrorKind {
    match code {
        StoreErrorCode::InvalidEncoding | StoreErrorCode::Truncation => {
            ErrorKind::MalformedEntity
        }
        StoreErrorCode::UniqueViolation => ErrorKind::Conflict,
        StoreErrorCode::ForeignKeyViolation | StoreErrorCode::NoRows => ErrorKind::NotFound,
        StoreErrorCode::Unclassified => operation.fallback_kind(),
    }
}

/// Wraps a store failure into a [`ThingsError`], keeping it as the source.
pub fn translate<E>(operation: Operation, context: &str, err: E) -> ThingsError
where
    E: ClassifyStoreError,
{
    let kind = kind_for(operation, err.store_error_code());
    ThingsError::with_source(kind, context.to_owned(), err)
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct FakeStoreError(StoreErrorCode);

    impl fmt::Display for FakeStoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fake store error {:?}", self.0)
        }
    }

    impl StdError for FakeStoreError {}

    impl ClassifyStoreError for FakeStoreError {
        fn store_error_code(&self) -> StoreErrorCode {
            self.0
        }
    }

    const OPERATIONS: [Operation; 4] = [
        Operation::Create,
        Operation::Update,
        Operation::Select,
        Operation::Remove,
    ];

    #[test]
    fn classified_codes_ignore_operation() {
        for op in OPERATIONS {
            assert_eq!(
                kind_for(op, StoreErrorCode::InvalidEncoding),
                ErrorKind::MalformedEntity
            );
            assert_eq!(
                kind_for(op, StoreErrorCode::Truncation),
                ErrorKind::MalformedEntity
            );
            assert_eq!(kind_for(op, StoreErrorCode::UniqueViolation), ErrorKind::Conflict);
            assert_eq!(
                kind_for(op, StoreErrorCode::ForeignKeyViolation),
                ErrorKind::NotFound
            );
            assert_eq!(kind_for(op, StoreErrorCode::NoRows), ErrorKind::NotFound);
        }
    }

    #[test]
    fn unclassified_falls_back_per_operation() {
        let expected = [
            ErrorKind::CreateEntity,
            ErrorKind::UpdateEntity,
            ErrorKind::SelectEntity,
            ErrorKind::RemoveEntity,
        ];
        for (op, kind) in OPERATIONS.into_iter().zip(expected) {
            assert_eq!(kind_for(op, StoreErrorCode::Unclassified), kind);
        }
    }

    #[test]
    fn translate_keeps_cause() {
        let err = translate(
            Operation::Create,
            "insert thing",
            FakeStoreError(StoreErrorCode::UniqueViolation),
        );
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("fake store error UniqueViolation")
        );
    }
}
