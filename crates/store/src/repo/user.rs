use super::{DEFAULT_TIMEOUT, UserRepository, deadline};
use crate::Database;
use crate::error::{ErrorKind, Result, raise_sqlx};
use crate::models::{User, UserRow};
use crate::validator::ensure_valid;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqlitePool;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl From<&Database> for SqliteUserRepository {
    fn from(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SqliteUserRepository {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    #[instrument(level = "debug", skip_all, fields(id = user.id))]
    async fn insert(&self, user: &mut User) -> Result<()> {
        ensure_valid(&*user)?;
        let created_at: i64 = deadline(self.timeout, async {
            sqlx::query_scalar(include_str!("../../queries/insert_user.sql"))
                .bind(user.id)
                .bind(&user.name)
                .bind(&user.email)
                .bind(user.avatar.as_deref())
                .bind(&user.provider)
                .fetch_one(&self.pool)
                .await
                .map_err(raise_sqlx)
        })
        .await?;
        user.created_at = OffsetDateTime::from_unix_timestamp(created_at).or_raise(|| ErrorKind::Store)?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn exists(&self, id: i64) -> Result<bool> {
        deadline(self.timeout, async {
            sqlx::query_scalar(include_str!("../../queries/user_exists.sql"))
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(raise_sqlx)
        })
        .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_by_email(&self, email: &str) -> Result<User> {
        let row: Option<UserRow> = deadline(self.timeout, async {
            sqlx::query_as(include_str!("../../queries/get_user_by_email.sql"))
                .bind(email)
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
}
