use bookstore_db::{Database, DbError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use super::models::{Book, BookDraft, BookId, NewBook};
use super::validation::FieldViolation;

const SELECT_BY_ID: &str = "SELECT id, isbn, title, description, price, publication_date, \
     nb_of_pages, image_url FROM book WHERE id = ?";

const SELECT_ALL: &str = "SELECT id, isbn, title, description, price, publication_date, \
     nb_of_pages, image_url FROM book ORDER BY title DESC, id DESC";

const COUNT_ALL: &str = "SELECT COUNT(*) FROM book";

const INSERT: &str = "INSERT INTO book (isbn, title, description, price, publication_date, \
     nb_of_pages, image_url) VALUES (?, ?, ?, ?, ?, ?, ?)";

const EXISTS: &str = "SELECT 1 FROM book WHERE id = ?";

const DELETE_BY_ID: &str = "DELETE FROM book WHERE id = ?";

#[derive(Debug, Error)]
pub enum BookError {
    #[error("book is invalid: {}", join(.0))]
    Validation(Vec<FieldViolation>),

    #[error("book {0} not found")]
    NotFound(BookId),

    #[error(transparent)]
    Persistence(#[from] DbError),
}

fn join(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Row shape of the `book` table. The price is kept as its decimal string.
#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: i64,
    isbn: Option<String>,
    title: String,
    description: Option<String>,
    price: String,
    publication_date: Option<NaiveDate>,
    nb_of_pages: Option<i32>,
    image_url: Option<String>,
}

impl TryFrom<BookRow> for Book {
    type Error = DbError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let price = row
            .price
            .parse::<Decimal>()
            .map_err(|e| DbError::CorruptRow {
                entity: "book",
                id: row.id,
                message: format!("price '{}': {}", row.price, e),
            })?;

        Ok(Book {
            id: row.id,
            isbn: row.isbn,
            title: row.title,
            description: row.description,
            price,
            publication_date: row.publication_date,
            nb_of_pages: row.nb_of_pages,
            image_url: row.image_url,
        })
    }
}

/// CRUD access to stored books.
///
/// Reads run straight on the pool; `create` and `delete` each run as one
/// transaction.
#[derive(Debug, Clone)]
pub struct BookService {
    db: Database,
}

impl BookService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Whether the backing store answers queries.
    pub async fn is_store_reachable(&self) -> bool {
        self.db.health_check().await
    }

    /// Current state of book `id`, or `None` when no such book exists.
    pub async fn find(&self, id: BookId) -> Result<Option<Book>, BookError> {
        let row: Option<BookRow> = sqlx::query_as(SELECT_BY_ID)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(DbError::from)?;

        Ok(row.map(Book::try_from).transpose()?)
    }

    /// All books, title descending.
    pub async fn find_all(&self) -> Result<Vec<Book>, BookError> {
        let rows: Vec<BookRow> = sqlx::query_as(SELECT_ALL)
            .fetch_all(self.db.pool())
            .await
            .map_err(DbError::from)?;

        let books = rows
            .into_iter()
            .map(Book::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = books.len(), "books listed");
        Ok(books)
    }

    pub async fn count_all(&self) -> Result<i64, BookError> {
        let count: i64 = sqlx::query_scalar(COUNT_ALL)
            .fetch_one(self.db.pool())
            .await
            .map_err(DbError::from)?;
        Ok(count)
    }

    /// Validate `draft` and store it; returns the stored record with its new id.
    ///
    /// Nothing is written when validation fails.
    pub async fn create(&self, draft: BookDraft) -> Result<Book, BookError> {
        let new_book = draft.validate().map_err(BookError::Validation)?;

        let book = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let id = insert(conn, &new_book).await?;
                    let row: BookRow = sqlx::query_as(SELECT_BY_ID)
                        .bind(id)
                        .fetch_one(&mut *conn)
                        .await?;
                    Book::try_from(row)
                })
            })
            .await?;

        info!(book_id = book.id, title = %book.title, "book created");
        Ok(book)
    }

    /// Remove book `id`. Returns whether a book was removed; a missing id is
    /// not an error.
    pub async fn delete(&self, id: BookId) -> Result<bool, BookError> {
        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let exists: Option<i64> = sqlx::query_scalar(EXISTS)
                        .bind(id)
                        .fetch_optional(&mut *conn)
                        .await?;
                    if exists.is_none() {
                        return Ok::<_, DbError>(false);
                    }

                    let done = sqlx::query(DELETE_BY_ID)
                        .bind(id)
                        .execute(&mut *conn)
                        .await?;
                    Ok(done.rows_affected() > 0)
                })
            })
            .await?;

        if removed {
            info!(book_id = id, "book deleted");
        } else {
            debug!(book_id = id, "delete of missing book ignored");
        }
        Ok(removed)
    }
}

async fn insert(conn: &mut sqlx::SqliteConnection, book: &NewBook) -> Result<BookId, DbError> {
    let done = sqlx::query(INSERT)
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.description)
        .bind(book.price.to_string())
        .bind(book.publication_date)
        .bind(book.nb_of_pages)
        .bind(&book.image_url)
        .execute(&mut *conn)
        .await?;
    Ok(done.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books;
    use bookstore_db::DbConfig;

    async fn service() -> BookService {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let migrations: Vec<(String, bookstore_kernel::Migration)> = books::migrations()
            .into_iter()
            .map(|m| ("books".to_string(), m))
            .collect();
        db.migrate(&migrations).await.unwrap();
        BookService::new(db)
    }

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn draft(title: &str) -> BookDraft {
        BookDraft::new(title, dec("12.50"))
    }

    #[tokio::test]
    async fn closed_store_is_unreachable() {
        let service = service().await;
        assert!(service.is_store_reachable().await);

        service.db.close().await;
        assert!(!service.is_store_reachable().await);
        assert!(matches!(
            service.count_all().await,
            Err(BookError::Persistence(ref db)) if db.is_unavailable()
        ));
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let service = service().await;
        let draft = BookDraft {
            isbn: Some("978-3-86680-192-9".to_string()),
            description: Some("A young heroine holds the fate of her kingdom.".to_string()),
            publication_date: NaiveDate::from_ymd_opt(2023, 9, 15),
            nb_of_pages: Some(428),
            image_url: Some("https://covers.example/arcadia.png".to_string()),
            ..BookDraft::new("The Secrets of Arcadia", dec("19.99"))
        };

        let created = service.create(draft).await.unwrap();
        let found = service.find(created.id).await.unwrap();

        assert_eq!(found, Some(created.clone()));
        assert_eq!(created.price, dec("19.99"));
        assert_eq!(created.nb_of_pages, Some(428));
        assert_eq!(created.image_url.as_deref(), Some("https://covers.example/arcadia.png"));
    }

    #[tokio::test]
    async fn created_ids_are_unique_and_never_reused() {
        let service = service().await;

        let first = service.create(draft("First")).await.unwrap();
        let second = service.create(draft("Second")).await.unwrap();
        assert_ne!(first.id, second.id);

        assert!(service.delete(second.id).await.unwrap());
        let third = service.create(draft("Third")).await.unwrap();
        assert!(third.id > second.id);
    }

    #[tokio::test]
    async fn find_missing_is_none() {
        let service = service().await;
        assert_eq!(service.find(42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn find_all_orders_by_title_descending() {
        let service = service().await;
        assert!(service.find_all().await.unwrap().is_empty());

        for title in ["Alpha", "Charlie", "Bravo"] {
            service.create(draft(title)).await.unwrap();
        }

        let titles: Vec<String> = service
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.title)
            .collect();
        assert_eq!(titles, vec!["Charlie", "Bravo", "Alpha"]);
    }

    #[tokio::test]
    async fn count_tracks_creates_and_deletes() {
        let service = service().await;
        assert_eq!(service.count_all().await.unwrap(), 0);

        let mut ids = Vec::new();
        for title in ["One", "Two", "Three"] {
            ids.push(service.create(draft(title)).await.unwrap().id);
        }
        assert_eq!(service.count_all().await.unwrap(), 3);

        assert!(service.delete(ids[0]).await.unwrap());
        assert!(!service.delete(9_999).await.unwrap());
        assert_eq!(service.count_all().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let service = service().await;
        let book = service.create(draft("Ephemeral")).await.unwrap();

        assert!(service.delete(book.id).await.unwrap());
        assert!(!service.delete(book.id).await.unwrap());
        assert_eq!(service.find(book.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_draft_is_not_stored() {
        let service = service().await;

        let err = service.create(draft("")).await.unwrap_err();
        match err {
            BookError::Validation(violations) => assert_eq!(violations[0].field, "title"),
            other => panic!("expected validation error, got {other:?}"),
        }

        let err = service
            .create(BookDraft::new("Free", Decimal::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, BookError::Validation(_)));

        assert_eq!(service.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn minimum_price_is_accepted() {
        let service = service().await;
        let book = service
            .create(BookDraft::new("Cheap", dec("1.00")))
            .await
            .unwrap();
        assert_eq!(book.price, Decimal::ONE);
    }

    #[tokio::test]
    async fn text_with_nul_characters_round_trips() {
        let service = service().await;
        let mut draft = draft("\u{0}Dune");
        draft.description = Some("ab\u{0}cdefghijklmnop".to_string());

        let created = service.create(draft).await.unwrap();
        let found = service.find(created.id).await.unwrap().unwrap();
        assert_eq!(found.title, "\u{0}Dune");
        assert_eq!(found.description.as_deref(), Some("ab\u{0}cdefghijklmnop"));
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn store_rejection_surfaces_as_persistence_error() {
        let service = service().await;
        // Bypass validation to hit the table's CHECK constraint.
        let result = service
            .db
            .transaction(|conn| {
                Box::pin(async move {
                    let bad = NewBook {
                        isbn: None,
                        title: "Leaflet".to_string(),
                        description: None,
                        price: Decimal::ONE,
                        publication_date: None,
                        nb_of_pages: Some(12),
                        image_url: None,
                    };
                    insert(conn, &bad).await
                })
            })
            .await
            .map_err(BookError::from);

        assert!(matches!(
            result,
            Err(BookError::Persistence(DbError::ConstraintViolation(_)))
        ));
        assert_eq!(service.count_all().await.unwrap(), 0);
    }
}
