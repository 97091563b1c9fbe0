use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Boxed underlying cause attached to a [`ThingsError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Stable classification of every failure surfaced by the thing repository.
///
/// Callers branch on the kind only; the store-specific detail is kept as the
/// error source for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input could not be represented by the store (bad encoding, oversized value).
    MalformedEntity,
    /// Uniqueness violation on the identifier or key.
    Conflict,
    /// No row matched, or a referenced entity does not exist.
    NotFound,
    /// Unclassified failure while creating things.
    CreateEntity,
    /// Unclassified failure while updating a thing.
    UpdateEntity,
    /// Unclassified failure while reading things.
    SelectEntity,
    /// Unclassified failure while removing a thing.
    RemoveEntity,
}

impl ErrorKind {
    /// Returns a short, stable description of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedEntity => "malformed entity specification",
            Self::Conflict => "entity already exists",
            Self::NotFound => "entity not found",
            Self::CreateEntity => "failed to create entity in the db",
            Self::UpdateEntity => "failed to update entity in the db",
            Self::SelectEntity => "failed to select entity from the db",
            Self::RemoveEntity => "failed to remove entity from the db",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical error type for thing persistence operations.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ThingsError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ThingsError {
    /// Creates an error of the given kind without an underlying cause.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error of the given kind wrapping the underlying cause.
    #[must_use]
    pub fn with_source<E>(kind: ErrorKind, message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a `NotFound` error for the named entity.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("{entity} `{id}`"))
    }

    /// Creates a `MalformedEntity` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedEntity, message)
    }

    /// Returns the classification callers should branch on.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the diagnostic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Shorthand for `self.kind() == kind`.
    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

/// Convenient result alias for thing operations.
pub type ThingsResult<T> = Result<T, ThingsError>;
