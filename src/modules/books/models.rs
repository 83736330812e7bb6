use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Store-assigned identifier of a book.
pub type BookId = i64;

/// A persisted book.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    /// Assigned on insert, never changes afterwards
    pub id: BookId,
    pub isbn: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub publication_date: Option<NaiveDate>,
    pub nb_of_pages: Option<i32>,
    /// Stored with the record but never exposed to clients
    pub image_url: Option<String>,
}

/// Unvalidated book as received from a client.
///
/// Every field is optional here; [`BookDraft::validate`]
/// decides whether the draft may become a [`NewBook`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookDraft {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub publication_date: Option<NaiveDate>,
    pub nb_of_pages: Option<i32>,
    pub image_url: Option<String>,
}

impl BookDraft {
    /// Draft carrying only the two required fields.
    pub fn new(title: impl Into<String>, price: Decimal) -> Self {
        Self {
            title: Some(title.into()),
            price: Some(price),
            ..Self::default()
        }
    }
}

/// A validated book that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub isbn: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub publication_date: Option<NaiveDate>,
    pub nb_of_pages: Option<i32>,
    pub image_url: Option<String>,
}
