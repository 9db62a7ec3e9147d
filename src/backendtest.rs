#[macro_export]
macro_rules! test_catalog {
    ($f:expr) => {
        use crate::{Book, BookFormat, Catalog};
        use serial_test::serial;

        #[tokio::test]
        #[serial]
        async fn test_add_and_get_book() {
            let b = ($f)().await;

            let book = Book::new(
                "John Grisham",
                "The Rainmaker",
                "Suspense",
                [
                    (BookFormat::Hardcover, "J4SUKVGU"),
                    (BookFormat::Paperback, "D7YF4FCX"),
                ],
            );
            b.add_book(&book).await.unwrap();

            let found = b.get_book("John Grisham", "The Rainmaker").await.unwrap();
            assert_eq!(found, Some(book));
        }

        #[tokio::test]
        #[serial]
        async fn test_get_book_not_found() {
            let b = ($f)().await;

            let found = b.get_book("John Grisham", "The Client").await.unwrap();
            assert_eq!(found, None);
        }

        #[tokio::test]
        #[serial]
        async fn test_add_book_replaces_existing() {
            let b = ($f)().await;

            b.add_book(&Book::new(
                "John Grisham",
                "The Rainmaker",
                "Suspense",
                [
                    (BookFormat::Hardcover, "J4SUKVGU"),
                    (BookFormat::Paperback, "D7YF4FCX"),
                ],
            ))
            .await
            .unwrap();

            // an upsert with the same primary key fully replaces the record,
            // it never merges formats
            let replacement = Book::new(
                "John Grisham",
                "The Rainmaker",
                "Legal",
                [(BookFormat::Audiobook, "8WE3KPTP")],
            );
            b.add_book(&replacement).await.unwrap();

            let found = b.get_book("John Grisham", "The Rainmaker").await.unwrap();
            assert_eq!(found, Some(replacement));
        }

        #[tokio::test]
        #[serial]
        async fn test_add_book_format() {
            let b = ($f)().await;

            b.add_book(&Book::new(
                "John Grisham",
                "The Rainmaker",
                "Suspense",
                [
                    (BookFormat::Hardcover, "J4SUKVGU"),
                    (BookFormat::Paperback, "D7YF4FCX"),
                ],
            ))
            .await
            .unwrap();

            b.add_book_format("John Grisham", "The Rainmaker", BookFormat::Audiobook, "8WE3KPTP")
                .await
                .unwrap();

            let found = b.get_book("John Grisham", "The Rainmaker").await.unwrap().unwrap();
            assert_eq!(found.category, "Suspense");
            assert_eq!(found.formats.len(), 3);
            assert_eq!(found.formats.get(&BookFormat::Hardcover).map(|s| s.as_str()), Some("J4SUKVGU"));
            assert_eq!(found.formats.get(&BookFormat::Paperback).map(|s| s.as_str()), Some("D7YF4FCX"));
            assert_eq!(found.formats.get(&BookFormat::Audiobook).map(|s| s.as_str()), Some("8WE3KPTP"));
        }

        #[tokio::test]
        #[serial]
        async fn test_add_book_format_overwrites_existing() {
            let b = ($f)().await;

            b.add_book(&Book::new(
                "John Grisham",
                "The Firm",
                "Suspense",
                [
                    (BookFormat::Hardcover, "Q7QWE3U2"),
                    (BookFormat::Paperback, "ZVZAYY4F"),
                ],
            ))
            .await
            .unwrap();

            b.add_book_format("John Grisham", "The Firm", BookFormat::Paperback, "DJ9KS9NM")
                .await
                .unwrap();

            let found = b.get_book("John Grisham", "The Firm").await.unwrap().unwrap();
            assert_eq!(found.formats.len(), 2);
            assert_eq!(found.formats.get(&BookFormat::Hardcover).map(|s| s.as_str()), Some("Q7QWE3U2"));
            assert_eq!(found.formats.get(&BookFormat::Paperback).map(|s| s.as_str()), Some("DJ9KS9NM"));
        }

        #[tokio::test]
        #[serial]
        async fn test_books_by_author() {
            let b = ($f)().await;

            b.add_book(&Book::new(
                "John Grisham",
                "The Rainmaker",
                "Suspense",
                [(BookFormat::Hardcover, "J4SUKVGU")],
            ))
            .await
            .unwrap();
            b.add_book(&Book::new(
                "John Grisham",
                "The Firm",
                "Suspense",
                [(BookFormat::Hardcover, "Q7QWE3U2")],
            ))
            .await
            .unwrap();
            b.add_book(&Book::new(
                "James Patterson",
                "Along Came a Spider",
                "Suspense",
                [(BookFormat::Hardcover, "C9NR6RJ7")],
            ))
            .await
            .unwrap();

            let titles: Vec<_> = b
                .books_by_author("John Grisham")
                .await
                .unwrap()
                .into_iter()
                .map(|book| book.title)
                .collect();
            assert_eq!(titles, vec!["The Firm", "The Rainmaker"]);

            let books = b.books_by_author("Dr. Seuss").await.unwrap();
            assert_eq!(books.is_empty(), true);
        }

        #[tokio::test]
        #[serial]
        async fn test_books_by_category() {
            let b = ($f)().await;

            b.add_book(&Book::new(
                "John Grisham",
                "The Rainmaker",
                "Suspense",
                [(BookFormat::Hardcover, "J4SUKVGU")],
            ))
            .await
            .unwrap();
            b.add_book(&Book::new(
                "James Patterson",
                "Along Came a Spider",
                "Suspense",
                [(BookFormat::Hardcover, "C9NR6RJ7")],
            ))
            .await
            .unwrap();
            b.add_book(&Book::new(
                "Dr. Seuss",
                "Green Eggs and Ham",
                "Children",
                [(BookFormat::Hardcover, "GVJZQ7JK")],
            ))
            .await
            .unwrap();

            // index ordering is service-defined, so compare by primary-key identity
            let mut keys: Vec<_> = b
                .books_by_category("Suspense")
                .await
                .unwrap()
                .into_iter()
                .map(|book| (book.author, book.title))
                .collect();
            keys.sort();
            assert_eq!(
                keys,
                vec![
                    ("James Patterson".to_string(), "Along Came a Spider".to_string()),
                    ("John Grisham".to_string(), "The Rainmaker".to_string()),
                ]
            );
        }
    };
}
