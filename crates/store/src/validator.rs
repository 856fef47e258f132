//! Field validation.
//!
//! A [`Validator`] is a pure accumulator: run every check against an entity,
//! then inspect the collected errors once. The first failure recorded for a
//! field wins; later failures for the same field are ignored, but checks
//! against other fields still run so that callers can report every invalid
//! field in one response.

use crate::error::{Error, ErrorKind, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::hash::Hash;

/// Field name to error message mapping, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// Record `message` against `field`, unless the field already has an error.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over failed fields in field name order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(field, message)| (field.as_str(), message.as_str()))
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// Accumulates field errors across a set of boolean checks.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` under `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    /// Record `message` under `field` unconditionally (first error still wins).
    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.insert(field, message);
    }

    /// `true` if no check has failed.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }

    /// Consume the validator, raising [`ErrorKind::FailedValidation`] with
    /// every recorded error if any check failed.
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            return Ok(());
        }
        Err(self.into_error())
    }

    /// Consume the validator, raising [`ErrorKind::FailedValidation`] with
    /// whatever errors were recorded.
    #[track_caller]
    pub fn into_error(self) -> Error {
        Error::from(ErrorKind::FailedValidation(self.errors))
    }
}

/// `true` if `values` contains no duplicate elements.
///
/// Comparison is exact (case-sensitive for strings); order is irrelevant.
pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|value| seen.insert(value))
}

/// Anything that can run its field checks against a [`Validator`].
pub trait Validate {
    fn validate(&self, v: &mut Validator);
}

/// Run all checks for `entity` and return the resulting error map.
///
/// An empty map means the entity is valid.
pub fn validate<T: Validate + ?Sized>(entity: &T) -> ValidationErrors {
    let mut v = Validator::new();
    entity.validate(&mut v);
    v.into_errors()
}

/// Run all checks for `entity`, raising [`ErrorKind::FailedValidation`] if
/// any of them failed.
pub(crate) fn ensure_valid<T: Validate + ?Sized>(entity: &T) -> Result<()> {
    let mut v = Validator::new();
    entity.validate(&mut v);
    v.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_first_failure_wins_per_field() {
        let mut v = Validator::new();
        v.check(false, "title", "must be provided");
        v.check(false, "title", "must not be more than 500 bytes long");
        v.check(true, "author", "must be provided");
        v.check(false, "pages", "must be a positive integer");
        assert!(!v.is_valid());
        assert_eq!(v.errors().len(), 2);
        assert_eq!(v.errors().get("title"), Some("must be provided"));
        assert_eq!(v.errors().get("pages"), Some("must be a positive integer"));
        assert!(!v.errors().contains("author"));
    }

    #[test]
    fn test_valid_when_empty() {
        let mut v = Validator::new();
        v.check(true, "title", "must be provided");
        assert!(v.is_valid());
        assert!(v.into_result().is_ok());
    }

    #[test]
    fn test_into_result_carries_all_fields() {
        let mut v = Validator::new();
        v.check(false, "title", "must be provided");
        v.check(false, "year", "must be provided");
        let err = v.into_result().unwrap_err();
        let ErrorKind::FailedValidation(errors) = &*err else {
            panic!("expected a validation failure, got {err:?}");
        };
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["title", "year"]);
    }

    #[rstest]
    #[case(&[], true)]
    #[case(&["Fantasy"], true)]
    #[case(&["Fantasy", "Epic"], true)]
    #[case(&["Fantasy", "fantasy"], true)]
    #[case(&["Fantasy", "Epic", "Fantasy"], false)]
    fn test_unique(#[case] values: &[&str], #[case] expected: bool) {
        assert_eq!(unique(values), expected);
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let mut errors = ValidationErrors::default();
        errors.insert("title", "must be provided");
        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(json, r#"{"title":"must be provided"}"#);
    }
}
