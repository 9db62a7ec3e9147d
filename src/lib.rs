#[macro_use]
extern crate async_trait;
extern crate simple_error;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

pub mod backendtest;
#[cfg(feature = "aws-sdk")]
pub mod dynamodbstore;
pub mod memorystore;

pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type Result<T> = std::result::Result<T, Error>;

/// The format kinds a book can carry, stored as the keys of its formats map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BookFormat {
    Hardcover,
    Paperback,
    Audiobook,
}

impl BookFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hardcover => "HARDCOVER",
            Self::Paperback => "PAPERBACK",
            Self::Audiobook => "AUDIOBOOK",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "HARDCOVER" => Some(Self::Hardcover),
            "PAPERBACK" => Some(Self::Paperback),
            "AUDIOBOOK" => Some(Self::Audiobook),
            _ => None,
        }
    }
}

impl fmt::Display for BookFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single catalog record. `(author, title)` is the immutable primary
/// identity. `category` is always present so the category index can locate
/// the record. `formats` is sparse: it may be empty at creation and grows one
/// entry at a time via `Catalog::add_book_format`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub author: String,
    pub title: String,
    pub category: String,
    pub formats: BTreeMap<BookFormat, String>,
}

impl Book {
    pub fn new<S: Into<String>, I: IntoIterator<Item = (BookFormat, S)>>(
        author: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        formats: I,
    ) -> Self {
        Self {
            author: author.into(),
            title: title.into(),
            category: category.into(),
            formats: formats.into_iter().map(|(kind, id)| (kind, id.into())).collect(),
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Author={:?} Title={:?} Category={:?} Formats={{",
            self.author, self.title, self.category
        )?;
        for (i, (kind, id)) in self.formats.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", kind, id)?;
        }
        f.write_str("}")
    }
}

/// Identifies the backing table and bounds the provisioning waits. Passed to
/// the provisioner and carried by the store so each run (or test) can target
/// its own disposable table.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub table_name: String,
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            table_name: "Books".to_string(),
            ready_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl CatalogConfig {
    pub fn with_table_name(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }
}

/// The catalog's data-access contract. Every call is a single stateless
/// request/response exchange with the backing store.
#[async_trait]
pub trait Catalog {
    /// Upserts by primary key: creates the record or fully replaces an
    /// existing one. Nested fields are never merged on this path.
    async fn add_book(&self, book: &Book) -> Result<()>;

    /// Sets `formats[kind] = format_id` on an existing record, leaving every
    /// other attribute (including other format entries) untouched. The record
    /// must already exist; if it doesn't, the store's failure surfaces
    /// unmodified.
    async fn add_book_format(
        &self,
        author: &str,
        title: &str,
        kind: BookFormat,
        format_id: &str,
    ) -> Result<()>;

    /// Point lookup by full primary key. `Ok(None)` means the record is
    /// absent, which is distinct from a failed call.
    async fn get_book(&self, author: &str, title: &str) -> Result<Option<Book>>;

    /// All records sharing the given partition key, title-ascending.
    async fn books_by_author(&self, author: &str) -> Result<Vec<Book>>;

    /// All records whose category equals the given value, resolved via the
    /// category index. Ordering is service-defined, and a write issued
    /// immediately before the query may not have propagated to the index yet.
    async fn books_by_category(&self, category: &str) -> Result<Vec<Book>>;
}
