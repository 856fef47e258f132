//! Store Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Every repository operation, whichever backend serves
//! it, fails with exactly one of the [`ErrorKind`] variants below; driver
//! errors, timeouts and decoding problems are children in the error tree of
//! an [`ErrorKind::Store`] frame and are not exposed any further.

use crate::validator::ValidationErrors;
use derive_more::{Display, Error};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The identifier was invalid (less than 1) or no record matched it.
    #[display("record not found")]
    NotFound,
    /// A compare-and-swap update matched no row: the version supplied by the
    /// caller is stale, or the record has been deleted in the meantime. The
    /// two cases are deliberately indistinguishable.
    #[display("edit conflict")]
    EditConflict,
    /// One or more field checks failed. Carries every failed field, not just
    /// the first.
    #[display("failed validation: {_0}")]
    FailedValidation(#[error(not(source))] ValidationErrors),
    /// A uniqueness constraint of the store was violated.
    #[display("duplicate record")]
    DuplicateConstraint,
    /// Connectivity, timeout, driver or data decoding failure.
    #[display("store error")]
    Store,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Retrying is a caller policy; the store itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store)
    }

    /// The HTTP status code a web front end renders this error as.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::EditConflict => 409,
            Self::FailedValidation(_) | Self::DuplicateConstraint => 422,
            Self::Store => 500,
        }
    }

    /// Classify a driver error.
    ///
    /// Unique constraint violations become [`ErrorKind::DuplicateConstraint`];
    /// everything else, including foreign key violations, is opaque.
    pub(crate) fn from_sqlx(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::DuplicateConstraint,
            _ => Self::Store,
        }
    }
}

/// Raise a driver error into the store's error tree, preserving the driver
/// error as a child frame.
#[track_caller]
pub(crate) fn raise_sqlx(err: sqlx::Error) -> Error {
    let kind = ErrorKind::from_sqlx(&err);
    exn::Exn::from(err).raise(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::NotFound, 404, false)]
    #[case(ErrorKind::EditConflict, 409, false)]
    #[case(ErrorKind::FailedValidation(ValidationErrors::default()), 422, false)]
    #[case(ErrorKind::DuplicateConstraint, 422, false)]
    #[case(ErrorKind::Store, 500, true)]
    fn test_classification(#[case] kind: ErrorKind, #[case] status: u16, #[case] retryable: bool) {
        assert_eq!(kind.status_code(), status);
        assert_eq!(kind.is_retryable(), retryable);
    }

    #[test]
    fn test_row_not_found_is_opaque() {
        assert!(matches!(ErrorKind::from_sqlx(&sqlx::Error::RowNotFound), ErrorKind::Store));
    }

    #[test]
    fn test_validation_display_lists_fields() {
        let mut errors = ValidationErrors::default();
        errors.insert("title", "must be provided");
        errors.insert("pages", "must be a positive integer");
        let kind = ErrorKind::FailedValidation(errors);
        assert_eq!(kind.to_string(), "failed validation: pages: must be a positive integer; title: must be provided");
    }
}
