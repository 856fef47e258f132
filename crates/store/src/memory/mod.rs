//! In-memory repositories for testing.
//!
//! All three repositories share one [`MemoryDatabase`], so the references and
//! uniqueness rules that SQLite enforces through its schema hold here too:
//! reading records must point at an existing book and user, deleting a book
//! removes its reading records, and duplicate emails or (user, book) pairs
//! are rejected.

mod book;
mod user;
mod user_book;

pub use self::book::MemoryBookRepository;
pub use self::user::MemoryUserRepository;
pub use self::user_book::MemoryUserBookRepository;
use crate::filters::{Direction, Filters, Metadata, Sort};
use crate::models::{Book, User, UserBook};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) books: BTreeMap<i64, Book>,
    pub(crate) user_books: BTreeMap<i64, UserBook>,
    pub(crate) users: BTreeMap<i64, User>,
    last_book_id: i64,
    last_user_book_id: i64,
}

impl State {
    pub(crate) fn next_book_id(&mut self) -> i64 {
        self.last_book_id += 1;
        self.last_book_id
    }

    pub(crate) fn next_user_book_id(&mut self) -> i64 {
        self.last_user_book_id += 1;
        self.last_user_book_id
    }
}

/// Shared state behind the in-memory repositories.
///
/// Cloning is cheap and every clone sees the same records.
///
/// # Examples
///
/// ```
/// use bookshelf_store::memory::MemoryDatabase;
/// use bookshelf_store::{Book, BookRepository, Repositories};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> bookshelf_store::error::Result<()> {
/// let repos = Repositories::memory(&MemoryDatabase::default());
/// let mut book = Book::new("The Hobbit", "J.R.R. Tolkien", 1937, 320, ["Fantasy"]);
/// repos.books.insert(&mut book).await?;
/// assert_eq!(repos.books.get(book.id).await?.version, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<RwLock<State>>,
}

impl MemoryDatabase {
    pub(crate) fn state(&self) -> Arc<RwLock<State>> {
        Arc::clone(&self.state)
    }
}

pub(crate) fn cmp_rating(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        // NULLs sort first, as they do in SQLite.
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

/// Order `records` by the resolved sort key with ties broken by ascending
/// id, then cut out the requested page.
pub(crate) fn paginate<T>(
    mut records: Vec<T>,
    sort: &Sort,
    filters: &Filters,
    id: impl Fn(&T) -> i64,
    by_column: impl Fn(&T, &T) -> Ordering,
) -> (Vec<T>, Metadata) {
    records.sort_by(|a, b| {
        let ordering = by_column(a, b);
        let ordering = match sort.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        ordering.then_with(|| id(a).cmp(&id(b)))
    });
    let total_records = i64::try_from(records.len()).unwrap_or(i64::MAX);
    let offset = usize::try_from(filters.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(filters.limit()).unwrap_or(0);
    let page: Vec<T> = records.into_iter().skip(offset).take(limit).collect();
    // A listing query past the last page returns no rows, and with them no
    // window count.
    let total_records = if page.is_empty() { 0 } else { total_records };
    (page, Metadata::calculate(total_records, filters.page, filters.page_size))
}
