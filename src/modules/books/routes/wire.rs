//! JSON shape of a book on the wire.
//!
//! Kept apart from the stored record: the wire uses `publication-date` and
//! `nb-of-pages`, never carries `image_url`, and only emits `id`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::modules::books::models::{Book, BookDraft, BookId};

/// Request body of `POST /api/books`. Unknown fields (including `id`) are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct BookPayload {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[serde(rename = "publication-date")]
    pub publication_date: Option<NaiveDate>,
    #[serde(rename = "nb-of-pages")]
    pub nb_of_pages: Option<i32>,
}

impl From<BookPayload> for BookDraft {
    fn from(payload: BookPayload) -> Self {
        BookDraft {
            isbn: payload.isbn,
            title: payload.title,
            description: payload.description,
            price: payload.price,
            publication_date: payload.publication_date,
            nb_of_pages: payload.nb_of_pages,
            image_url: None,
        }
    }
}

/// Response body for a single book.
#[derive(Debug, Serialize)]
pub struct BookRepresentation {
    pub id: BookId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    #[serde(rename = "publication-date", skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    #[serde(rename = "nb-of-pages", skip_serializing_if = "Option::is_none")]
    pub nb_of_pages: Option<i32>,
}

impl From<Book> for BookRepresentation {
    fn from(book: Book) -> Self {
        BookRepresentation {
            id: book.id,
            isbn: book.isbn,
            title: book.title,
            description: book.description,
            price: book.price,
            publication_date: book.publication_date,
            nb_of_pages: book.nb_of_pages,
        }
    }
}
