use super::book::push_book_predicates;
use super::{DEFAULT_TIMEOUT, UserBookRepository, deadline, narrow};
use crate::Database;
use crate::error::{ErrorKind, Result, raise_sqlx};
use crate::filters::{Filters, Metadata};
use crate::models::{USER_BOOK_SORT_SAFELIST, UserBook, UserBookListRow, UserBookQuery, UserBookRow};
use crate::validator::ensure_valid;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::instrument;

const LIST_SELECT: &str = "SELECT COUNT(*) OVER() AS total_records, \
    ub.id, ub.book_id, ub.user_id, ub.read, ub.rating, ub.review_body, \
    ub.created_at, ub.read_at, ub.reviewed_at, ub.version \
    FROM user_books ub JOIN books b ON b.id = ub.book_id WHERE 1 = 1";

#[derive(Debug, Clone)]
pub struct SqliteUserBookRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl From<&Database> for SqliteUserBookRepository {
    fn from(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SqliteUserBookRepository {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl UserBookRepository for SqliteUserBookRepository {
    #[instrument(level = "debug", skip_all, fields(user_id = user_book.user_id, book_id = user_book.book_id))]
    async fn insert(&self, user_book: &mut UserBook) -> Result<()> {
        ensure_valid(&*user_book)?;
        user_book.truncate_timestamps();
        let (id, created_at, version): (i64, i64, i64) = deadline(self.timeout, async {
            sqlx::query_as(include_str!("../../queries/insert_user_book.sql"))
                .bind(user_book.book_id)
                .bind(user_book.user_id)
                .bind(user_book.read)
                .bind(user_book.rating.map(f64::from))
                .bind(user_book.review_body.as_deref())
                .bind(user_book.read_at.map(OffsetDateTime::unix_timestamp))
                .bind(user_book.reviewed_at.map(OffsetDateTime::unix_timestamp))
                .fetch_one(&self.pool)
                .await
                .map_err(raise_sqlx)
        })
        .await?;
        user_book.id = id;
        user_book.created_at = OffsetDateTime::from_unix_timestamp(created_at).or_raise(|| ErrorKind::Store)?;
        user_book.version = narrow(version)?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn get(&self, id: i64) -> Result<UserBook> {
        if id < 1 {
            exn::bail!(ErrorKind::NotFound);
        }
        let row: Option<UserBookRow> = deadline(self.timeout, async {
            sqlx::query_as(include_str!("../../queries/get_user_book.sql"))
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

    #[instrument(level = "debug", skip_all, fields(id = user_book.id, version = user_book.version))]
    async fn update(&self, user_book: &mut UserBook) -> Result<()> {
        ensure_valid(&*user_book)?;
        user_book.truncate_timestamps();
        let version: Option<i64> = deadline(self.timeout, async {
            sqlx::query_scalar(include_str!("../../queries/update_user_book.sql"))
                .bind(user_book.read)
                .bind(user_book.rating.map(f64::from))
                .bind(user_book.review_body.as_deref())
                .bind(user_book.read_at.map(OffsetDateTime::unix_timestamp))
                .bind(user_book.reviewed_at.map(OffsetDateTime::unix_timestamp))
                .bind(user_book.id)
                .bind(user_book.version)
                .fetch_optional(&self.pool)
                .await
                .map_err(raise_sqlx)
        })
        .await?;
        match version {
            Some(version) => {
                user_book.version = narrow(version)?;
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
            sqlx::query(include_str!("../../queries/delete_user_book.sql"))
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
    async fn list(&self, query: &UserBookQuery, filters: &Filters) -> Result<(Vec<UserBook>, Metadata)> {
        let sort = filters.resolve(&USER_BOOK_SORT_SAFELIST)?;
        let mut qb = QueryBuilder::<Sqlite>::new(LIST_SELECT);
        push_book_predicates(&mut qb, &query.title, &query.genres);
        if let Some(rating) = query.rating {
            qb.push(" AND ub.rating = ").push_bind(f64::from(rating));
        }
        if let Some(read) = query.read {
            qb.push(" AND ub.read = ").push_bind(read);
        }
        if let Some(user_id) = query.user_id {
            qb.push(" AND ub.user_id = ").push_bind(user_id);
        }
        qb.push(format!(" ORDER BY {} {}, ub.id ASC", sort.column, sort.direction.as_sql()));
        qb.push(" LIMIT ").push_bind(filters.limit());
        qb.push(" OFFSET ").push_bind(filters.offset());

        let rows: Vec<UserBookListRow> = deadline(self.timeout, async {
            qb.build_query_as().fetch_all(&self.pool).await.map_err(raise_sqlx)
        })
        .await?;

        let total_records = rows.first().map_or(0, |row| row.total_records);
        let user_books =
            rows.into_iter().map(|row| UserBook::try_from(row.user_book)).collect::<Result<Vec<_>>>()?;
        Ok((user_books, Metadata::calculate(total_records, filters.page, filters.page_size)))
    }
}
