use super::{MemoryDatabase, State, paginate};
use crate::error::{ErrorKind, Result};
use crate::filters::{Filters, Metadata};
use crate::models::{BOOK_SORT_SAFELIST, Book, BookQuery, whole_seconds};
use crate::repo::BookRepository;
use crate::search;
use crate::validator::ensure_valid;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// `true` if `book` satisfies the title and genre predicates.
pub(crate) fn book_matches(book: &Book, terms: &[String], genres: &[String]) -> bool {
    search::matches(terms, &book.title) && genres.iter().all(|genre| book.genres.contains(genre))
}

pub struct MemoryBookRepository {
    state: Arc<RwLock<State>>,
}

impl From<&MemoryDatabase> for MemoryBookRepository {
    fn from(db: &MemoryDatabase) -> Self {
        Self { state: db.state() }
    }
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn insert(&self, book: &mut Book) -> Result<()> {
        ensure_valid(&*book)?;
        let mut state = self.state.write().await;
        book.id = state.next_book_id();
        book.created_at = whole_seconds(OffsetDateTime::now_utc());
        book.version = 1;
        state.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Book> {
        if id < 1 {
            exn::bail!(ErrorKind::NotFound);
        }
        match self.state.read().await.books.get(&id) {
            Some(book) => Ok(book.clone()),
            None => exn::bail!(ErrorKind::NotFound),
        }
    }

    async fn update(&self, book: &mut Book) -> Result<()> {
        ensure_valid(&*book)?;
        let mut state = self.state.write().await;
        let Some(stored) = state.books.get_mut(&book.id).filter(|stored| stored.version == book.version) else {
            exn::bail!(ErrorKind::EditConflict);
        };
        *stored = Book {
            id: stored.id,
            created_at: stored.created_at,
            version: stored.version + 1,
            ..book.clone()
        };
        book.version = stored.version;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            exn::bail!(ErrorKind::NotFound);
        }
        let mut state = self.state.write().await;
        if state.books.remove(&id).is_none() {
            exn::bail!(ErrorKind::NotFound);
        }
        state.user_books.retain(|_, user_book| user_book.book_id != id);
        Ok(())
    }

    async fn list(&self, query: &BookQuery, filters: &Filters) -> Result<(Vec<Book>, Metadata)> {
        let sort = filters.resolve(&BOOK_SORT_SAFELIST)?;
        let terms = search::terms(&query.title);
        let matching: Vec<Book> = self
            .state
            .read()
            .await
            .books
            .values()
            .filter(|book| book_matches(book, &terms, &query.genres))
            .cloned()
            .collect();
        Ok(paginate(matching, &sort, filters, |book| book.id, |a, b| by_column(sort.name, a, b)))
    }
}

fn by_column(name: &str, a: &Book, b: &Book) -> Ordering {
    match name {
        "title" => a.title.cmp(&b.title),
        "author" => a.author.cmp(&b.author),
        "year" => a.year.cmp(&b.year),
        "pages" => a.pages.cmp(&b.pages),
        _ => a.id.cmp(&b.id),
    }
}
