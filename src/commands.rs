//! Turn parsed commands into repository calls and JSON envelopes.

use crate::cli::{BookCommand, Command, PageArgs, ReadingArgs, ShelfCommand, UserCommand};
use bookshelf_store::error::{ErrorKind, Result};
use bookshelf_store::{Book, BookQuery, Filters, Repositories, User, UserBook, UserBookQuery, parse_csv};
use serde_json::{Value, json};

/// Settings a command falls back on when the caller doesn't say otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Defaults {
    pub page_size: i64,
}

fn filters(page: PageArgs, defaults: Defaults) -> Filters {
    Filters::new(page.page, page.page_size.unwrap_or(defaults.page_size), page.sort)
}

/// Refuse to go on if the caller pinned a version and the record has moved on.
fn check_expected_version(expected: Option<i32>, stored: i32) -> Result<()> {
    match expected {
        Some(expected) if expected != stored => exn::bail!(ErrorKind::EditConflict),
        _ => Ok(()),
    }
}

impl ReadingArgs {
    fn apply(self, user_book: &mut UserBook) {
        if let Some(read) = self.read {
            user_book.read = read;
        }
        if let Some(rating) = self.rating {
            user_book.rating = Some(rating);
        }
        if let Some(review) = self.review {
            user_book.review_body = Some(review);
        }
        if let Some(read_at) = self.read_at {
            user_book.read_at = Some(read_at);
        }
        if let Some(reviewed_at) = self.reviewed_at {
            user_book.reviewed_at = Some(reviewed_at);
        }
    }
}

pub async fn run(command: Command, repos: &Repositories, defaults: Defaults) -> Result<Value> {
    match command {
        Command::Book(command) => book(command, repos, defaults).await,
        Command::Shelf(command) => shelf(command, repos, defaults).await,
        Command::User(command) => user(command, repos).await,
    }
}

async fn book(command: BookCommand, repos: &Repositories, defaults: Defaults) -> Result<Value> {
    match command {
        BookCommand::Add {
            title,
            author,
            year,
            pages,
            genres,
        } => {
            let mut book = Book::new(title, author, year, pages, parse_csv(&genres));
            repos.books.insert(&mut book).await?;
            tracing::info!(id = book.id, "added book");
            Ok(json!({ "book": book }))
        },
        BookCommand::Get { id } => Ok(json!({ "book": repos.books.get(id).await? })),
        BookCommand::Update {
            id,
            expected_version,
            title,
            author,
            year,
            pages,
            genres,
        } => {
            let mut book = repos.books.get(id).await?;
            check_expected_version(expected_version, book.version)?;
            if let Some(title) = title {
                book.title = title;
            }
            if let Some(author) = author {
                book.author = author;
            }
            if let Some(year) = year {
                book.year = year;
            }
            if let Some(pages) = pages {
                book.pages = pages;
            }
            if let Some(genres) = genres {
                book.genres = parse_csv(&genres);
            }
            repos.books.update(&mut book).await?;
            tracing::info!(id = book.id, version = book.version, "updated book");
            Ok(json!({ "book": book }))
        },
        BookCommand::Delete { id } => {
            repos.books.delete(id).await?;
            Ok(json!({ "message": "book successfully deleted" }))
        },
        BookCommand::List { title, genres, page } => {
            let query = BookQuery {
                title,
                genres: parse_csv(&genres),
            };
            let (books, metadata) = repos.books.list(&query, &filters(page, defaults)).await?;
            Ok(json!({ "books": books, "metadata": metadata }))
        },
    }
}

async fn shelf(command: ShelfCommand, repos: &Repositories, defaults: Defaults) -> Result<Value> {
    match command {
        ShelfCommand::Add {
            user_id,
            book_id,
            reading,
        } => {
            let mut user_book = UserBook::new(user_id, book_id);
            reading.apply(&mut user_book);
            repos.user_books.insert(&mut user_book).await?;
            tracing::info!(id = user_book.id, "added reading record");
            Ok(json!({ "user_book": user_book }))
        },
        ShelfCommand::Get { id } => Ok(json!({ "user_book": repos.user_books.get(id).await? })),
        ShelfCommand::Update {
            id,
            expected_version,
            reading,
        } => {
            let mut user_book = repos.user_books.get(id).await?;
            check_expected_version(expected_version, user_book.version)?;
            reading.apply(&mut user_book);
            repos.user_books.update(&mut user_book).await?;
            tracing::info!(id = user_book.id, version = user_book.version, "updated reading record");
            Ok(json!({ "user_book": user_book }))
        },
        ShelfCommand::Delete { id } => {
            repos.user_books.delete(id).await?;
            Ok(json!({ "message": "reading record successfully deleted" }))
        },
        ShelfCommand::List {
            title,
            genres,
            rating,
            read,
            user_id,
            page,
        } => {
            let query = UserBookQuery {
                title,
                genres: parse_csv(&genres),
                rating,
                read,
                user_id,
            };
            let (user_books, metadata) = repos.user_books.list(&query, &filters(page, defaults)).await?;
            Ok(json!({ "user_books": user_books, "metadata": metadata }))
        },
    }
}

async fn user(command: UserCommand, repos: &Repositories) -> Result<Value> {
    match command {
        UserCommand::Add {
            id,
            name,
            email,
            avatar,
            provider,
        } => {
            let mut user = User::new(id, name, email, provider);
            user.avatar = avatar;
            repos.users.insert(&mut user).await?;
            tracing::info!(id = user.id, "added user");
            Ok(json!({ "user": user }))
        },
        UserCommand::Show { email } => Ok(json!({ "user": repos.users.get_by_email(&email).await? })),
    }
}

/// The JSON body describing a failed command.
///
/// Validation failures carry the field map, everything else a message.
/// Store failures are never described beyond "store error"; the error tree is
/// logged instead.
pub fn error_body(kind: &ErrorKind) -> Value {
    match kind {
        ErrorKind::FailedValidation(errors) => json!({ "error": errors, "status": kind.status_code() }),
        ErrorKind::NotFound => {
            json!({ "error": "the requested resource could not be found", "status": kind.status_code() })
        },
        ErrorKind::EditConflict => json!({
            "error": "unable to update the record due to an edit conflict, please try again",
            "status": kind.status_code(),
        }),
        ErrorKind::DuplicateConstraint => {
            json!({ "error": "a record with these details already exists", "status": kind.status_code() })
        },
        ErrorKind::Store => json!({
            "error": "the server encountered a problem and could not process your request",
            "status": kind.status_code(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use bookshelf_store::memory::MemoryDatabase;
    use clap::Parser;

    const DEFAULTS: Defaults = Defaults { page_size: 20 };

    async fn exec(repos: &Repositories, args: &[&str]) -> Result<Value> {
        let cli = Cli::try_parse_from(std::iter::once("bookshelf").chain(args.iter().copied())).unwrap();
        run(cli.command, repos, DEFAULTS).await
    }

    async fn seeded() -> Repositories {
        let repos = Repositories::memory(&MemoryDatabase::default());
        exec(&repos, &["user", "add", "--id", "1", "--name", "Bilbo", "--email", "bilbo@example.com"]).await.unwrap();
        exec(
            &repos,
            &[
                "book", "add", "--title", "The Hobbit", "--author", "J.R.R. Tolkien", "--year", "1937", "--pages",
                "320", "--genres", "Fantasy, Children's literature",
            ],
        )
        .await
        .unwrap();
        repos
    }

    #[tokio::test]
    async fn test_book_add_and_get() {
        let repos = seeded().await;
        let body = exec(&repos, &["book", "get", "1"]).await.unwrap();
        assert_eq!(body["book"]["title"], "The Hobbit");
        assert_eq!(body["book"]["genres"], json!(["Fantasy", "Children's literature"]));
        assert_eq!(body["book"]["version"], 1);
    }

    #[tokio::test]
    async fn test_book_update_with_expected_version() {
        let repos = seeded().await;
        let body = exec(&repos, &["book", "update", "1", "--expected-version", "1", "--pages", "310"]).await.unwrap();
        assert_eq!(body["book"]["pages"], 310);
        assert_eq!(body["book"]["version"], 2);

        let err = exec(&repos, &["book", "update", "1", "--expected-version", "1", "--pages", "300"])
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::EditConflict));
    }

    #[tokio::test]
    async fn test_invalid_book_reports_fields() {
        let repos = seeded().await;
        let err = exec(&repos, &["book", "add", "--title", "", "--author", "Anon", "--year", "1990", "--pages", "-3"])
            .await
            .unwrap_err();
        let body = error_body(&err);
        assert_eq!(body["status"], 422);
        assert_eq!(body["error"]["pages"], "must be a positive integer");
        assert_eq!(body["error"]["title"], "must be provided");
        assert_eq!(body["error"]["genres"], "must contain at least 1 genre");
    }

    #[tokio::test]
    async fn test_book_list_envelope() {
        let repos = seeded().await;
        let body = exec(&repos, &["book", "list", "--title", "hobbit", "--page-size", "5"]).await.unwrap();
        assert_eq!(body["books"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["metadata"]["page_size"], 5);
        assert_eq!(body["metadata"]["total_records"], 1);

        let err = exec(&repos, &["book", "list", "--sort", "-genres"]).await.unwrap_err();
        assert_eq!(error_body(&err)["error"]["sort"], "invalid sort value");
    }

    #[tokio::test]
    async fn test_shelf_flow() {
        let repos = seeded().await;
        let body = exec(&repos, &["shelf", "add", "--user-id", "1", "--book-id", "1"]).await.unwrap();
        assert_eq!(body["user_book"]["read"], false);

        let body = exec(
            &repos,
            &[
                "shelf", "update", "1", "--read", "true", "--rating", "4.5", "--review", "Very good book!",
                "--read-at", "2024-04-12T14:30:00Z",
            ],
        )
        .await
        .unwrap();
        assert_eq!(body["user_book"]["version"], 2);
        assert_eq!(body["user_book"]["read_at"], "2024-04-12T14:30:00Z");

        let body = exec(&repos, &["shelf", "list", "--read", "true", "--user-id", "1"]).await.unwrap();
        assert_eq!(body["metadata"]["total_records"], 1);

        exec(&repos, &["book", "delete", "1"]).await.unwrap();
        let err = exec(&repos, &["shelf", "get", "1"]).await.unwrap_err();
        assert_eq!(error_body(&err)["status"], 404);
    }

    #[tokio::test]
    async fn test_review_needs_rating() {
        let repos = seeded().await;
        let err = exec(&repos, &["shelf", "add", "--user-id", "1", "--book-id", "1", "--review", "Loved it"])
            .await
            .unwrap_err();
        assert_eq!(error_body(&err)["error"]["rating"], "must be provided when a review is given");
    }

    #[tokio::test]
    async fn test_duplicate_user() {
        let repos = seeded().await;
        let err = exec(&repos, &["user", "add", "--id", "2", "--name", "Other", "--email", "bilbo@example.com"])
            .await
            .unwrap_err();
        assert_eq!(error_body(&err)["status"], 422);
        let body = exec(&repos, &["user", "show", "bilbo@example.com"]).await.unwrap();
        assert_eq!(body["user"]["id"], 1);
    }
}
