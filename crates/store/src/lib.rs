//! Versioned record store for a personal library.
//!
//! Books and per-user reading records are kept with a version counter and
//! updated by compare-and-swap: an update only lands if the caller's copy
//! carries the version currently stored, otherwise it fails with
//! [`ErrorKind::EditConflict`](error::ErrorKind::EditConflict) and nothing is
//! written. Listings are filtered, sorted through a fixed per-resource
//! safelist, paginated, and come with [`Metadata`] describing the whole
//! matching set.
//!
//! # Architecture
//! - [`Database`] owns the SQLite pool and runs the embedded migrations.
//! - The repository traits ([`BookRepository`], [`UserBookRepository`],
//!   [`UserRepository`]) have SQLite implementations and, behind the `mock`
//!   feature, in-memory ones sharing a [`memory::MemoryDatabase`].
//! - Entities implement [`Validate`]; repositories validate before writing.

mod db;
pub mod error;
pub mod filters;
#[cfg(any(test, feature = "mock"))]
pub mod memory;
mod models;
mod repo;
mod search;
pub mod validator;

pub use crate::db::{DEFAULT_MAX_CONNECTIONS, Database};
pub use crate::filters::{Filters, Metadata};
pub use crate::models::{
    AUTHOR_MAX_BYTES, BOOK_SORT_SAFELIST, Book, BookQuery, EARLIEST_YEAR, EMAIL_MAX_BYTES, GENRES_MAX,
    NAME_MAX_BYTES, REVIEW_MAX_BYTES, TITLE_MAX_BYTES, USER_BOOK_SORT_SAFELIST, User, UserBook, UserBookQuery,
};
pub use crate::repo::{
    BookRepository, BookRepositoryHandle, DEFAULT_TIMEOUT, Repositories, SqliteBookRepository,
    SqliteUserBookRepository, SqliteUserRepository, UserBookRepository, UserBookRepositoryHandle, UserRepository,
    UserRepositoryHandle,
};
pub use crate::validator::{Validate, ValidationErrors, Validator, validate};

/// Split a comma separated query value into its trimmed, non-empty parts.
///
/// An empty or all-blank value yields no parts, which every listing treats
/// as "no predicate".
pub fn parse_csv(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|part| !part.is_empty()).map(str::to_string).collect()
}
