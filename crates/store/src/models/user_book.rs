use crate::error::{Error, ErrorKind};
use super::whole_seconds;
use crate::filters::SortSafelist;
use crate::validator::{Validate, Validator};
use exn::ResultExt;
use serde::Serialize;
use time::OffsetDateTime;

pub const REVIEW_MAX_BYTES: usize = 5000;
pub const EARLIEST_YEAR: i32 = 1900;

/// Sortable names for reading record listings. `title` sorts by the title of
/// the referenced book.
pub const USER_BOOK_SORT_SAFELIST: SortSafelist = SortSafelist::new(&[
    ("id", "ub.id"),
    ("title", "b.title"),
    ("rating", "ub.rating"),
    ("read_at", "ub.read_at"),
    ("reviewed_at", "ub.reviewed_at"),
    ("created_at", "ub.created_at"),
]);

/// A user's reading record for one book: whether it has been read, and an
/// optional rating and review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserBook {
    pub id: i64,
    pub book_id: i64,
    pub user_id: i64,
    pub read: bool,
    pub rating: Option<f32>,
    pub review_body: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub reviewed_at: Option<OffsetDateTime>,
    pub version: i32,
}

impl UserBook {
    /// A new, unread record with no rating or review.
    pub fn new(user_id: i64, book_id: i64) -> Self {
        Self {
            id: 0,
            book_id,
            user_id,
            read: false,
            rating: None,
            review_body: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            read_at: None,
            reviewed_at: None,
            version: 0,
        }
    }

    /// The review body, if one was given and is not empty.
    pub fn review(&self) -> Option<&str> {
        self.review_body.as_deref().filter(|body| !body.is_empty())
    }

    /// Truncate `read_at` and `reviewed_at` to the precision they are stored at.
    pub(crate) fn truncate_timestamps(&mut self) {
        self.read_at = self.read_at.map(whole_seconds);
        self.reviewed_at = self.reviewed_at.map(whole_seconds);
    }
}

fn check_timestamp(v: &mut Validator, field: &str, at: Option<OffsetDateTime>, now: OffsetDateTime) {
    if let Some(at) = at {
        v.check(at.year() >= EARLIEST_YEAR, field, "must not be before 1900");
        v.check(at <= now, field, "must not be in the future");
    }
}

impl Validate for UserBook {
    fn validate(&self, v: &mut Validator) {
        v.check(self.user_id != 0, "user_id", "must be provided");
        v.check(self.user_id > 0, "user_id", "must be a positive integer");

        v.check(self.book_id != 0, "book_id", "must be provided");
        v.check(self.book_id > 0, "book_id", "must be a positive integer");

        if let Some(body) = self.review() {
            v.check(body.len() <= REVIEW_MAX_BYTES, "review_body", "must not be more than 5000 bytes long");
            v.check(
                self.rating.is_some_and(|rating| rating != 0.0),
                "rating",
                "must be provided when a review is given",
            );
        }

        let now = OffsetDateTime::now_utc();
        check_timestamp(v, "read_at", self.read_at, now);
        check_timestamp(v, "reviewed_at", self.reviewed_at, now);
    }
}

/// Predicates for a reading record listing.
///
/// `title` and `genres` apply to the referenced book. Every predicate that is
/// empty or `None` is left out of the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserBookQuery {
    pub title: String,
    pub genres: Vec<String>,
    pub rating: Option<f32>,
    pub read: Option<bool>,
    pub user_id: Option<i64>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserBookRow {
    pub(crate) id: i64,
    pub(crate) book_id: i64,
    pub(crate) user_id: i64,
    pub(crate) read: bool,
    #[sqlx(default)]
    pub(crate) rating: Option<f64>,
    #[sqlx(default)]
    pub(crate) review_body: Option<String>,
    pub(crate) created_at: i64,
    #[sqlx(default)]
    pub(crate) read_at: Option<i64>,
    #[sqlx(default)]
    pub(crate) reviewed_at: Option<i64>,
    pub(crate) version: i64,
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserBookListRow {
    #[sqlx(flatten)]
    pub(crate) user_book: UserBookRow,
    pub(crate) total_records: i64,
}

fn from_timestamp(ts: Option<i64>) -> Result<Option<OffsetDateTime>, Error> {
    ts.map(|ts| OffsetDateTime::from_unix_timestamp(ts).or_raise(|| ErrorKind::Store)).transpose()
}

impl TryFrom<UserBookRow> for UserBook {
    type Error = Error;
    fn try_from(row: UserBookRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            book_id: row.book_id,
            user_id: row.user_id,
            read: row.read,
            rating: row.rating.map(|rating| rating as f32),
            review_body: row.review_body,
            created_at: OffsetDateTime::from_unix_timestamp(row.created_at).or_raise(|| ErrorKind::Store)?,
            read_at: from_timestamp(row.read_at)?,
            reviewed_at: from_timestamp(row.reviewed_at)?,
            version: i32::try_from(row.version).or_raise(|| ErrorKind::Store)?,
        })
    }
}
