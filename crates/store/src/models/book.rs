use crate::error::{Error, ErrorKind};
use crate::filters::SortSafelist;
use crate::validator::{Validate, Validator, unique};
use exn::ResultExt;
use serde::Serialize;
use time::OffsetDateTime;

pub const TITLE_MAX_BYTES: usize = 500;
pub const AUTHOR_MAX_BYTES: usize = 300;
pub const GENRES_MAX: usize = 10;

/// Sortable names for book listings.
pub const BOOK_SORT_SAFELIST: SortSafelist = SortSafelist::new(&[
    ("id", "b.id"),
    ("title", "b.title"),
    ("author", "b.author"),
    ("year", "b.year"),
    ("pages", "b.pages"),
]);

/// A book in the catalogue.
///
/// `id`, `created_at` and `version` are assigned by the store on insert; the
/// values set by [`Book::new`] are placeholders until then.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub pages: i32,
    pub genres: Vec<String>,
    pub version: i32,
}

impl Book {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        year: i32,
        pages: i32,
        genres: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: 0,
            created_at: OffsetDateTime::UNIX_EPOCH,
            title: title.into(),
            author: author.into(),
            year,
            pages,
            genres: genres.into_iter().map(Into::into).collect(),
            version: 0,
        }
    }
}

impl Validate for Book {
    fn validate(&self, v: &mut Validator) {
        v.check(!self.title.is_empty(), "title", "must be provided");
        v.check(self.title.len() <= TITLE_MAX_BYTES, "title", "must not be more than 500 bytes long");

        v.check(!self.author.is_empty(), "author", "must be provided");
        v.check(self.author.len() <= AUTHOR_MAX_BYTES, "author", "must not be more than 300 bytes long");

        v.check(self.year != 0, "year", "must be provided");
        v.check(self.year <= OffsetDateTime::now_utc().year(), "year", "must not be in the future");

        v.check(self.pages != 0, "pages", "must be provided");
        v.check(self.pages > 0, "pages", "must be a positive integer");

        v.check(!self.genres.is_empty(), "genres", "must contain at least 1 genre");
        v.check(self.genres.len() <= GENRES_MAX, "genres", "must not contain more than 10 genres");
        v.check(unique(&self.genres), "genres", "must not contain duplicate values");
    }
}

/// Title and genre predicates for a book listing. Empty means "no predicate".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub title: String,
    pub genres: Vec<String>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookRow {
    pub(crate) id: i64,
    pub(crate) created_at: i64,
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) year: i64,
    pub(crate) pages: i64,
    pub(crate) genres: String,
    pub(crate) version: i64,
}

/// A book row as returned by a listing, with the total number of matching
/// rows before pagination.
#[derive(sqlx::FromRow)]
pub(crate) struct BookListRow {
    #[sqlx(flatten)]
    pub(crate) book: BookRow,
    pub(crate) total_records: i64,
}

pub(crate) fn genres_to_json(genres: &[String]) -> Result<String, Error> {
    serde_json::to_string(genres).or_raise(|| ErrorKind::Store)
}

impl TryFrom<BookRow> for Book {
    type Error = Error;
    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            created_at: OffsetDateTime::from_unix_timestamp(row.created_at).or_raise(|| ErrorKind::Store)?,
            title: row.title,
            author: row.author,
            year: i32::try_from(row.year).or_raise(|| ErrorKind::Store)?,
            pages: i32::try_from(row.pages).or_raise(|| ErrorKind::Store)?,
            genres: serde_json::from_str(&row.genres).or_raise(|| ErrorKind::Store)?,
            version: i32::try_from(row.version).or_raise(|| ErrorKind::Store)?,
        })
    }
}
