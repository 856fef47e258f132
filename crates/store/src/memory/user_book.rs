use super::book::book_matches;
use super::{MemoryDatabase, State, cmp_rating, paginate};
use crate::error::{ErrorKind, Result};
use crate::filters::{Filters, Metadata};
use crate::models::{USER_BOOK_SORT_SAFELIST, UserBook, UserBookQuery, whole_seconds};
use crate::repo::UserBookRepository;
use crate::search;
use crate::validator::ensure_valid;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

pub struct MemoryUserBookRepository {
    state: Arc<RwLock<State>>,
}

impl From<&MemoryDatabase> for MemoryUserBookRepository {
    fn from(db: &MemoryDatabase) -> Self {
        Self { state: db.state() }
    }
}

#[async_trait]
impl UserBookRepository for MemoryUserBookRepository {
    async fn insert(&self, user_book: &mut UserBook) -> Result<()> {
        ensure_valid(&*user_book)?;
        user_book.truncate_timestamps();
        let mut state = self.state.write().await;
        if !state.books.contains_key(&user_book.book_id) || !state.users.contains_key(&user_book.user_id) {
            // A dangling reference is a foreign key failure, which the store
            // does not distinguish from any other driver error.
            exn::bail!(ErrorKind::Store);
        }
        let duplicate = state
            .user_books
            .values()
            .any(|other| other.user_id == user_book.user_id && other.book_id == user_book.book_id);
        if duplicate {
            exn::bail!(ErrorKind::DuplicateConstraint);
        }
        user_book.id = state.next_user_book_id();
        user_book.created_at = whole_seconds(OffsetDateTime::now_utc());
        user_book.version = 1;
        state.user_books.insert(user_book.id, user_book.clone());
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<UserBook> {
        if id < 1 {
            exn::bail!(ErrorKind::NotFound);
        }
        match self.state.read().await.user_books.get(&id) {
            Some(user_book) => Ok(user_book.clone()),
            None => exn::bail!(ErrorKind::NotFound),
        }
    }

    async fn update(&self, user_book: &mut UserBook) -> Result<()> {
        ensure_valid(&*user_book)?;
        user_book.truncate_timestamps();
        let mut state = self.state.write().await;
        let Some(stored) =
            state.user_books.get_mut(&user_book.id).filter(|stored| stored.version == user_book.version)
        else {
            exn::bail!(ErrorKind::EditConflict);
        };
        stored.read = user_book.read;
        stored.rating = user_book.rating;
        stored.review_body = user_book.review_body.clone();
        stored.read_at = user_book.read_at;
        stored.reviewed_at = user_book.reviewed_at;
        stored.version += 1;
        user_book.version = stored.version;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            exn::bail!(ErrorKind::NotFound);
        }
        if self.state.write().await.user_books.remove(&id).is_none() {
            exn::bail!(ErrorKind::NotFound);
        }
        Ok(())
    }

    async fn list(&self, query: &UserBookQuery, filters: &Filters) -> Result<(Vec<UserBook>, Metadata)> {
        let sort = filters.resolve(&USER_BOOK_SORT_SAFELIST)?;
        let terms = search::terms(&query.title);
        let state = self.state.read().await;
        let title = |user_book: &UserBook| state.books.get(&user_book.book_id).map(|book| book.title.as_str());
        let matching: Vec<UserBook> = state
            .user_books
            .values()
            .filter(|user_book| {
                state.books.get(&user_book.book_id).is_some_and(|book| book_matches(book, &terms, &query.genres))
                    && query.rating.is_none_or(|rating| user_book.rating == Some(rating))
                    && query.read.is_none_or(|read| user_book.read == read)
                    && query.user_id.is_none_or(|user_id| user_book.user_id == user_id)
            })
            .cloned()
            .collect();
        let by_column = |a: &UserBook, b: &UserBook| match sort.name {
            "title" => title(a).cmp(&title(b)),
            "rating" => cmp_rating(a.rating, b.rating),
            "read_at" => a.read_at.cmp(&b.read_at),
            "reviewed_at" => a.reviewed_at.cmp(&b.reviewed_at),
            "created_at" => a.created_at.cmp(&b.created_at),
            _ => Ordering::Equal,
        };
        Ok(paginate(matching, &sort, filters, |user_book| user_book.id, by_column))
    }
}
