use super::{BookRepository, DEFAULT_TIMEOUT, deadline, narrow};
use crate::Database;
use crate::error::{ErrorKind, Result, raise_sqlx};
use crate::filters::{Filters, Metadata};
use crate::models::{BOOK_SORT_SAFELIST, Book, BookListRow, BookQuery, BookRow, genres_to_json};
use crate::search;
use crate::validator::ensure_valid;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::instrument;

const LIST_SELECT: &str = "SELECT COUNT(*) OVER() AS total_records, \
    b.id, b.created_at, b.title, b.author, b.year, b.pages, b.genres, b.version \
    FROM books b WHERE 1 = 1";

/// Push the title and genre predicates for a book listing onto `qb`.
///
/// Shared with reading record listings, which filter on the joined book.
pub(super) fn push_book_predicates(qb: &mut QueryBuilder<'_, Sqlite>, title: &str, genres: &[String]) {
    let terms = search::terms(title);
    if !terms.is_empty() {
        qb.push(" AND b.id IN (SELECT rowid FROM books_fts WHERE books_fts MATCH ")
            .push_bind(search::fts_query(&terms))
            .push(")");
    }
    for genre in genres {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(b.genres) WHERE json_each.value = ")
            .push_bind(genre.clone())
            .push(")");
    }
}

#[derive(Debug, Clone)]
pub struct SqliteBookRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl From<&Database> for SqliteBookRepository {
    fn from(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SqliteBookRepository {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    #[instrument(level = "debug", skip_all)]
    async fn insert(&self, book: &mut Book) -> Result<()> {
        ensure_valid(&*book)?;
        let genres = genres_to_json(&book.genres)?;
        let (id, created_at, version): (i64, i64, i64) = deadline(self.timeout, async {
            sqlx::query_as(include_str!("../../queries/insert_book.sql"))
                .bind(&book.title)
                .bind(&book.author)
                .bind(book.year)
                .bind(book.pages)
                .bind(genres)
                .fetch_one(&self.pool)
                .await
                .map_err(raise_sqlx)
        })
        .await?;
        book.id = id;
        book.created_at = OffsetDateTime::from_unix_timestamp(created_at).or_raise(|| ErrorKind::Store)?;
        book.version = narrow(version)?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn get(&self, id: i64) -> Result<Book> {
        if id < 1 {
            exn::bail!(ErrorKind::NotFound);
        }
        let row: Option<BookRow> = deadline(self.timeout, async {
            sqlx::query_as(include_str!("../../queries/get_book.sql"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(raise_sqlx)
        })
        .await?;
        match row {
            Some(row) => row.try_into(),
            None => exn::bail!(ErrorKind::NotFound),
        }
    }

    #[instrument(level = "debug", skip_all, fields(id = book.id, version = book.version))]
    async fn update(&self, book: &mut Book) -> Result<()> {
        ensure_valid(&*book)?;
        let genres = genres_to_json(&book.genres)?;
        let version: Option<i64> = deadline(self.timeout, async {
            sqlx::query_scalar(include_str!("../../queries/update_book.sql"))
                .bind(&book.title)
                .bind(&book.author)
                .bind(book.year)
                .bind(book.pages)
                .bind(genres)
                .bind(book.id)
                .bind(book.version)
                .fetch_optional(&self.pool)
                .await
                .map_err(raise_sqlx)
        })
        .await?;
        match version {
            Some(version) => {
                book.version = narrow(version)?;
                Ok(())
            },
            None => exn::bail!(ErrorKind::EditConflict),
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            exn::bail!(ErrorKind::NotFound);
        }
        let result = deadline(self.timeout, async {
            sqlx::query(include_str!("../../queries/delete_book.sql"))
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(raise_sqlx)
        })
        .await?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotFound);
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn list(&self, query: &BookQuery, filters: &Filters) -> Result<(Vec<Book>, Metadata)> {
        let sort = filters.resolve(&BOOK_SORT_SAFELIST)?;
        let mut qb = QueryBuilder::<Sqlite>::new(LIST_SELECT);
        push_book_predicates(&mut qb, &query.title, &query.genres);
        qb.push(format!(" ORDER BY {} {}, b.id ASC", sort.column, sort.direction.as_sql()));
        qb.push(" LIMIT ").push_bind(filters.limit());
        qb.push(" OFFSET ").push_bind(filters.offset());

        let rows: Vec<BookListRow> = deadline(self.timeout, async {
            qb.build_query_as().fetch_all(&self.pool).await.map_err(raise_sqlx)
        })
        .await?;

        let total_records = rows.first().map_or(0, |row| row.total_records);
        let books = rows.into_iter().map(|row| Book::try_from(row.book)).collect::<Result<Vec<_>>>()?;
        Ok((books, Metadata::calculate(total_records, filters.page, filters.page_size)))
    }
}
