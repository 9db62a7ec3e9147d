use super::{Book, BookFormat, Catalog, Result};
use simple_error::SimpleError;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// An in-memory catalog with the same contract as the DynamoDB store, for
/// tests. Unlike a real secondary index, category reads here are immediate
/// and exact.
pub struct Backend {
    books: Mutex<BTreeMap<(String, String), Book>>,
}

impl Backend {
    pub fn new() -> Self {
        Self {
            books: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Catalog for Backend {
    async fn add_book(&self, book: &Book) -> Result<()> {
        let mut books = self.books.lock().unwrap();
        books.insert((book.author.clone(), book.title.clone()), book.clone());
        Ok(())
    }

    async fn add_book_format(
        &self,
        author: &str,
        title: &str,
        kind: BookFormat,
        format_id: &str,
    ) -> Result<()> {
        let mut books = self.books.lock().unwrap();
        match books.get_mut(&(author.to_string(), title.to_string())) {
            Some(book) => {
                book.formats.insert(kind, format_id.to_string());
                Ok(())
            }
            None => Err(SimpleError::new("attempt to add a format to a book that does not exist").into()),
        }
    }

    async fn get_book(&self, author: &str, title: &str) -> Result<Option<Book>> {
        let books = self.books.lock().unwrap();
        Ok(books.get(&(author.to_string(), title.to_string())).cloned())
    }

    async fn books_by_author(&self, author: &str) -> Result<Vec<Book>> {
        let books = self.books.lock().unwrap();
        // keys are (author, title), so iteration order is title-ascending
        Ok(books
            .range((author.to_string(), String::new())..)
            .take_while(|((a, _), _)| a == author)
            .map(|(_, book)| book.clone())
            .collect())
    }

    async fn books_by_category(&self, category: &str) -> Result<Vec<Book>> {
        let books = self.books.lock().unwrap();
        Ok(books.values().filter(|book| book.category == category).cloned().collect())
    }
}

#[cfg(test)]
mod test {
    mod catalog {
        use crate::{memorystore, test_catalog};
        test_catalog!(|| async { memorystore::Backend::new() });
    }

    mod formats {
        use crate::{memorystore, BookFormat, Catalog};

        #[tokio::test]
        async fn test_add_book_format_requires_existing_book() {
            let b = memorystore::Backend::new();
            assert!(b
                .add_book_format("John Grisham", "The Rainmaker", BookFormat::Audiobook, "8WE3KPTP")
                .await
                .is_err());
        }
    }
}
