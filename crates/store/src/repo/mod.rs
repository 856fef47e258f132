//! Repository traits and their SQLite implementations.
//!
//! Every repository speaks the same error taxonomy regardless of backend, so
//! callers hold them as trait objects and never need to know whether they
//! are talking to SQLite or to the in-memory fake.

mod book;
mod user;
mod user_book;


pub use self::book::SqliteBookRepository;
pub use self::user::SqliteUserRepository;
pub use self::user_book::SqliteUserBookRepository;
use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::filters::{Filters, Metadata};
use crate::models::{Book, BookQuery, User, UserBook, UserBookQuery};
use async_trait::async_trait;
use exn::ResultExt;
use std::sync::Arc;
use std::time::Duration;

/// Deadline applied to every repository operation unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Versioned storage of [`Book`] records.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Validate and store a new book, then write the store-assigned `id`,
    /// `created_at` and `version` (always 1) back into it.
    async fn insert(&self, book: &mut Book) -> Result<()>;

    /// Fetch a book by id. Ids below 1 are [`ErrorKind::NotFound`] without a
    /// round trip.
    async fn get(&self, id: i64) -> Result<Book>;

    /// Validate, then replace the stored book only if its version still
    /// equals `book.version`.
    ///
    /// On success the incremented version is written back into `book`. If the
    /// version is stale, or the book has been deleted, nothing is written and
    /// [`ErrorKind::EditConflict`] is raised.
    async fn update(&self, book: &mut Book) -> Result<()>;

    /// Remove a book and, through the foreign key, every reading record of it.
    async fn delete(&self, id: i64) -> Result<()>;

    /// One page of books matching `query`, with metadata for the whole
    /// matching set.
    async fn list(&self, query: &BookQuery, filters: &Filters) -> Result<(Vec<Book>, Metadata)>;
}

/// Versioned storage of [`UserBook`] reading records.
///
/// Same contract as [`BookRepository`]. The book and user references of a
/// record are fixed once inserted; updates only touch the reading state.
#[async_trait]
pub trait UserBookRepository: Send + Sync {
    async fn insert(&self, user_book: &mut UserBook) -> Result<()>;
    async fn get(&self, id: i64) -> Result<UserBook>;
    async fn update(&self, user_book: &mut UserBook) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
    async fn list(&self, query: &UserBookQuery, filters: &Filters) -> Result<(Vec<UserBook>, Metadata)>;
}

/// Storage of [`User`] records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Validate and store a new user. A second user with the same id or email
    /// is [`ErrorKind::DuplicateConstraint`].
    async fn insert(&self, user: &mut User) -> Result<()>;

    async fn exists(&self, id: i64) -> Result<bool>;

    /// Look a user up by exact email address.
    async fn get_by_email(&self, email: &str) -> Result<User>;
}

pub type BookRepositoryHandle = Arc<dyn BookRepository>;
pub type UserBookRepositoryHandle = Arc<dyn UserBookRepository>;
pub type UserRepositoryHandle = Arc<dyn UserRepository>;

/// Every repository a caller needs, sharing one backend.
#[derive(Clone)]
pub struct Repositories {
    pub books: BookRepositoryHandle,
    pub user_books: UserBookRepositoryHandle,
    pub users: UserRepositoryHandle,
}

impl Repositories {
    /// SQLite-backed repositories, each operation bounded by `timeout`.
    pub fn sqlite(db: &Database, timeout: Duration) -> Self {
        Self {
            books: Arc::new(SqliteBookRepository::from(db).with_timeout(timeout)),
            user_books: Arc::new(SqliteUserBookRepository::from(db).with_timeout(timeout)),
            users: Arc::new(SqliteUserRepository::from(db).with_timeout(timeout)),
        }
    }

    #[cfg(any(test, feature = "mock"))]
    pub fn memory(db: &crate::memory::MemoryDatabase) -> Self {
        use crate::memory::{MemoryBookRepository, MemoryUserBookRepository, MemoryUserRepository};
        Self {
            books: Arc::new(MemoryBookRepository::from(db)),
            user_books: Arc::new(MemoryUserBookRepository::from(db)),
            users: Arc::new(MemoryUserRepository::from(db)),
        }
    }
}

/// Run `op` to completion or fail with [`ErrorKind::Store`] once `timeout`
/// elapses. Dropping the operation returns its pooled connection.
pub(crate) async fn deadline<T>(timeout: Duration, op: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(timeout, op).await.or_raise(|| ErrorKind::Store)?
}

/// Integer columns come back as `i64`; models carry `i32`.
pub(crate) fn narrow(value: i64) -> Result<i32> {
    i32::try_from(value).or_raise(|| ErrorKind::Store)
}
