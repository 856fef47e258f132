//! Record types and their validation rules.

mod book;
mod user;
mod user_book;

pub use book::{AUTHOR_MAX_BYTES, BOOK_SORT_SAFELIST, Book, BookQuery, GENRES_MAX, TITLE_MAX_BYTES};
pub use user::{EMAIL_MAX_BYTES, NAME_MAX_BYTES, User};
pub use user_book::{EARLIEST_YEAR, REVIEW_MAX_BYTES, USER_BOOK_SORT_SAFELIST, UserBook, UserBookQuery};

pub(crate) use book::{BookListRow, BookRow, genres_to_json};
pub(crate) use user::UserRow;
pub(crate) use user_book::{UserBookListRow, UserBookRow};

use time::{Duration, OffsetDateTime};

/// Drop the sub-second part of `at`. Timestamps are stored as Unix seconds.
pub(crate) fn whole_seconds(at: OffsetDateTime) -> OffsetDateTime {
    at - Duration::nanoseconds(i64::from(at.nanosecond()))
}
