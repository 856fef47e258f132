//! Pagination, sorting and the pagination metadata calculation.
//!
//! Sort clauses cannot be bound as query parameters, so the only way from a
//! caller-supplied `sort` string into an `ORDER BY` is [`Filters::resolve`],
//! which maps the string through a fixed per-resource [`SortSafelist`].

use crate::error::Result;
use crate::validator::Validator;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const DEFAULT_SORT: &str = "id";
pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 100;

/// A fixed set of sortable names for one resource, each mapped to the column
/// expression it sorts by.
#[derive(Debug, Clone, Copy)]
pub struct SortSafelist(&'static [(&'static str, &'static str)]);

impl SortSafelist {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self(entries)
    }

    /// The safelisted name and its column expression, for a sort name
    /// without direction prefix.
    fn lookup(&self, name: &str) -> Option<(&'static str, &'static str)> {
        self.0.iter().find(|(n, _)| *n == name).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A sort key that has passed through a [`SortSafelist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    /// The safelisted name, as the caller spelled it (without `-`).
    pub name: &'static str,
    /// The column expression to order by.
    pub column: &'static str,
    pub direction: Direction,
}

/// Request-scoped pagination and sort parameters, as supplied by a caller.
///
/// Values are kept signed and unchecked until validation so that nonsense
/// input (zero, negative) is reported as a field error instead of being
/// silently clamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            sort: DEFAULT_SORT.to_string(),
        }
    }
}

impl Filters {
    pub fn new(page: i64, page_size: i64, sort: impl Into<String>) -> Self {
        Self {
            page,
            page_size,
            sort: sort.into(),
        }
    }

    /// Run the page, page size and sort checks against `v`.
    pub fn validate(&self, v: &mut Validator, safelist: &SortSafelist) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(self.page <= MAX_PAGE, "page", "must be a maximum of 10 million");
        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(self.page_size <= MAX_PAGE_SIZE, "page_size", "must be a maximum of 100");
        v.check(self.split_sort(safelist).is_some(), "sort", "invalid sort value");
    }

    /// Validate the filters and resolve the sort key against `safelist`.
    ///
    /// Raises [`ErrorKind::FailedValidation`](crate::error::ErrorKind::FailedValidation)
    /// before any query is built if anything is out of bounds or the sort
    /// key is not safelisted.
    pub fn resolve(&self, safelist: &SortSafelist) -> Result<Sort> {
        let mut v = Validator::new();
        self.validate(&mut v, safelist);
        match self.split_sort(safelist) {
            Some(sort) if v.is_valid() => Ok(sort),
            _ => Err(v.into_error()),
        }
    }

    fn split_sort(&self, safelist: &SortSafelist) -> Option<Sort> {
        let (name, direction) = match self.sort.strip_prefix('-') {
            Some(name) => (name, Direction::Desc),
            None => (self.sort.as_str(), Direction::Asc),
        };
        let (name, column) = safelist.lookup(name)?;
        Some(Sort { name, column, direction })
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// Summary of a paginated result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub current_page: i64,
    pub page_size: i64,
    pub first_page: i64,
    pub last_page: i64,
    pub total_records: i64,
}

impl Metadata {
    /// Derive pagination metadata from the pre-pagination row count.
    ///
    /// Every field is zero when there are no records.
    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records == 0 || page_size <= 0 {
            return Self::default();
        }
        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    const SAFELIST: SortSafelist = SortSafelist::new(&[("id", "id"), ("title", "b.title"), ("year", "year")]);

    #[test]
    fn test_metadata_empty() {
        assert_eq!(Metadata::calculate(0, 1, 20), Metadata::default());
    }

    #[rstest]
    #[case(21, 2, 20, 2)]
    #[case(20, 1, 20, 1)]
    #[case(40, 2, 20, 2)]
    #[case(41, 3, 20, 3)]
    #[case(1, 1, 100, 1)]
    #[case(7, 1, 1, 7)]
    fn test_metadata_last_page(
        #[case] total: i64,
        #[case] page: i64,
        #[case] page_size: i64,
        #[case] last_page: i64,
    ) {
        let expected = Metadata {
            current_page: page,
            page_size,
            first_page: 1,
            last_page,
            total_records: total,
        };
        assert_eq!(Metadata::calculate(total, page, page_size), expected);
    }

    #[rstest]
    #[case("id", "id", Direction::Asc)]
    #[case("-id", "id", Direction::Desc)]
    #[case("title", "b.title", Direction::Asc)]
    #[case("-year", "year", Direction::Desc)]
    fn test_resolve_safelisted(#[case] sort: &str, #[case] column: &str, #[case] direction: Direction) {
        let resolved = Filters::new(1, 20, sort).resolve(&SAFELIST).unwrap();
        assert_eq!(resolved.column, column);
        assert_eq!(resolved.direction, direction);
    }

    #[rstest]
    #[case("pages")]
    #[case("-pages")]
    #[case("--id")]
    #[case("id; DROP TABLE books")]
    #[case("")]
    #[case("-")]
    #[case("ID")]
    fn test_resolve_rejects_unlisted(#[case] sort: &str) {
        let err = Filters::new(1, 20, sort).resolve(&SAFELIST).unwrap_err();
        let ErrorKind::FailedValidation(errors) = &*err else {
            panic!("expected a validation failure, got {err:?}");
        };
        assert_eq!(errors.get("sort"), Some("invalid sort value"));
    }

    #[rstest]
    #[case(0, 20, "page", "must be greater than zero")]
    #[case(-1, 20, "page", "must be greater than zero")]
    #[case(10_000_001, 20, "page", "must be a maximum of 10 million")]
    #[case(1, 0, "page_size", "must be greater than zero")]
    #[case(1, 101, "page_size", "must be a maximum of 100")]
    fn test_bounds(#[case] page: i64, #[case] page_size: i64, #[case] field: &str, #[case] message: &str) {
        let mut v = Validator::new();
        Filters::new(page, page_size, "id").validate(&mut v, &SAFELIST);
        assert_eq!(v.errors().len(), 1);
        assert_eq!(v.errors().get(field), Some(message));
    }

    #[test]
    fn test_limit_offset() {
        let filters = Filters::new(3, 25, "id");
        assert_eq!(filters.limit(), 25);
        assert_eq!(filters.offset(), 50);
        assert_eq!(Filters::default().offset(), 0);
    }
}
