//! Command line surface.
//!
//! Everything here is untrusted input: clap only checks that values parse,
//! the store validates them before anything is written.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Track the books you own, the ones you've read, and what you thought of them.
#[derive(Parser, Debug)]
#[command(name = "bookshelf", version, about)]
pub struct Cli {
    /// Configuration file (default: bookshelf.toml in the platform config directory).
    #[arg(short, long, env = "BOOKSHELF_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the book catalogue.
    #[command(subcommand)]
    Book(BookCommand),
    /// Manage reading records.
    #[command(subcommand)]
    Shelf(ShelfCommand),
    /// Manage readers.
    #[command(subcommand)]
    User(UserCommand),
}

#[derive(Subcommand, Debug)]
pub enum BookCommand {
    /// Add a book to the catalogue.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long, allow_negative_numbers = true)]
        year: i32,
        #[arg(long, allow_negative_numbers = true)]
        pages: i32,
        /// Comma separated list of genres.
        #[arg(long, default_value = "")]
        genres: String,
    },
    /// Show a single book.
    Get { id: i64 },
    /// Change some fields of a book.
    Update {
        id: i64,
        /// Refuse the update unless the stored book is at this version.
        #[arg(long = "expected-version")]
        expected_version: Option<i32>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        year: Option<i32>,
        #[arg(long, allow_negative_numbers = true)]
        pages: Option<i32>,
        /// Comma separated list of genres, replacing the current ones.
        #[arg(long)]
        genres: Option<String>,
    },
    /// Remove a book and every reading record of it.
    Delete { id: i64 },
    /// List books.
    List {
        /// Only books whose title contains every word given.
        #[arg(long, default_value = "")]
        title: String,
        /// Only books that have every genre given (comma separated).
        #[arg(long, default_value = "")]
        genres: String,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ShelfCommand {
    /// Put a book on a reader's shelf.
    Add {
        #[arg(long, allow_negative_numbers = true)]
        user_id: i64,
        #[arg(long, allow_negative_numbers = true)]
        book_id: i64,
        #[command(flatten)]
        reading: ReadingArgs,
    },
    /// Show a single reading record.
    Get { id: i64 },
    /// Change the reading state, rating or review of a record.
    Update {
        id: i64,
        /// Refuse the update unless the stored record is at this version.
        #[arg(long = "expected-version")]
        expected_version: Option<i32>,
        #[command(flatten)]
        reading: ReadingArgs,
    },
    /// Take a book off a reader's shelf.
    Delete { id: i64 },
    /// List reading records.
    List {
        /// Only records whose book title contains every word given.
        #[arg(long, default_value = "")]
        title: String,
        /// Only records whose book has every genre given (comma separated).
        #[arg(long, default_value = "")]
        genres: String,
        #[arg(long)]
        rating: Option<f32>,
        #[arg(long)]
        read: Option<bool>,
        #[arg(long)]
        user_id: Option<i64>,
        #[command(flatten)]
        page: PageArgs,
    },
}

/// Reading state shared by `shelf add` and `shelf update`. Absent flags leave
/// the current value alone.
#[derive(Args, Debug, Default)]
pub struct ReadingArgs {
    #[arg(long)]
    pub read: Option<bool>,
    #[arg(long, allow_negative_numbers = true)]
    pub rating: Option<f32>,
    #[arg(long)]
    pub review: Option<String>,
    /// RFC 3339 timestamp, e.g. 2024-04-12T14:30:00Z.
    #[arg(long, value_parser = parse_timestamp)]
    pub read_at: Option<OffsetDateTime>,
    /// RFC 3339 timestamp, e.g. 2024-04-14T18:00:00Z.
    #[arg(long, value_parser = parse_timestamp)]
    pub reviewed_at: Option<OffsetDateTime>,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a reader.
    Add {
        /// Identifier assigned by the login provider.
        #[arg(long, allow_negative_numbers = true)]
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        avatar: Option<String>,
        #[arg(long, default_value = "")]
        provider: String,
    },
    /// Look a reader up by email address.
    Show { email: String },
}

#[derive(Args, Debug, Default)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub page: i64,
    /// Defaults to `listing.page_size` from the configuration.
    #[arg(long, allow_negative_numbers = true)]
    pub page_size: Option<i64>,
    /// Sort key, prefixed with `-` for descending order.
    #[arg(long, default_value = "id", allow_hyphen_values = true)]
    pub sort: String,
}

fn parse_timestamp(value: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|err| format!("expected an RFC 3339 timestamp: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_book_list_flags() {
        let cli = Cli::try_parse_from([
            "bookshelf", "book", "list", "--title", "the ring", "--genres", "Fantasy,Epic", "--sort", "-year",
            "--page", "2",
        ])
        .unwrap();
        let Command::Book(BookCommand::List { title, genres, page }) = cli.command else {
            panic!("expected book list, got {:?}", cli.command);
        };
        assert_eq!(title, "the ring");
        assert_eq!(genres, "Fantasy,Epic");
        assert_eq!(page.sort, "-year");
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, None);
    }

    #[test]
    fn test_shelf_timestamps() {
        let cli = Cli::try_parse_from([
            "bookshelf", "shelf", "add", "--user-id", "1", "--book-id", "2", "--read", "true", "--read-at",
            "2024-04-12T14:30:00Z",
        ])
        .unwrap();
        let Command::Shelf(ShelfCommand::Add { reading, .. }) = cli.command else {
            panic!("expected shelf add, got {:?}", cli.command);
        };
        assert_eq!(reading.read, Some(true));
        assert_eq!(reading.read_at.map(OffsetDateTime::unix_timestamp), Some(1_712_932_200));
    }

    #[rstest]
    #[case::bad_timestamp(&["bookshelf", "shelf", "update", "1", "--read-at", "yesterday"])]
    #[case::not_a_number(&["bookshelf", "book", "get", "one"])]
    #[case::missing_title(&["bookshelf", "book", "add", "--author", "Tolkien", "--year", "1937", "--pages", "1"])]
    fn test_rejected_input(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
