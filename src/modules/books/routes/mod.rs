//! HTTP resource for books, mounted under `/api/books`.

mod wire;

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bookstore_http::error::AppError;
use serde_json::json;

use super::models::BookId;
use super::service::{BookError, BookService};

pub use wire::{BookPayload, BookRepresentation};

/// Routes of the books resource, relative to the module mount point.
pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/count", get(count_books))
        .route("/health", get(health_check))
        .route("/{id}", get(get_book).delete(delete_book))
        .with_state(service)
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::Validation(violations) => {
                let details = violations
                    .iter()
                    .map(|v| json!({ "field": v.field, "message": v.message }))
                    .collect();
                AppError::validation(details, "book is invalid")
            }
            BookError::NotFound(id) => AppError::not_found(format!("book {} not found", id)),
            BookError::Persistence(db) if db.is_unavailable() => {
                AppError::unavailable(db.to_string())
            }
            BookError::Persistence(db) => AppError::Internal(anyhow::Error::new(db)),
        }
    }
}

/// Path ids must be positive integers; checked before the store is touched.
fn parse_book_id(raw: &str) -> Result<BookId, AppError> {
    match raw.parse::<BookId>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::validation(
            vec![json!({ "field": "id", "message": "must be a positive integer" })],
            format!("invalid book id '{}'", raw),
        )),
    }
}

/// Absolute URL of the created resource: the request's own URL plus `/{id}`.
fn location_of(
    uri: &OriginalUri,
    headers: &HeaderMap,
    id: BookId,
) -> Result<HeaderValue, AppError> {
    let path = uri.path().trim_end_matches('/');
    let authority = uri
        .authority()
        .map(|authority| authority.as_str().to_string())
        .or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|host| host.to_str().ok())
                .map(str::to_string)
        });

    let location = match authority {
        Some(authority) => {
            let scheme = headers
                .get("x-forwarded-proto")
                .and_then(|proto| proto.to_str().ok())
                .and_then(|proto| proto.split(',').next())
                .map(str::trim)
                .filter(|proto| !proto.is_empty())
                .or_else(|| uri.scheme_str())
                .unwrap_or("http");
            format!("{}://{}{}/{}", scheme, authority, path, id)
        }
        None => format!("{}/{}", path, id),
    };

    HeaderValue::from_str(&location)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid location '{}': {}", location, e)))
}

async fn health_check(State(service): State<BookService>) -> Result<&'static str, AppError> {
    if service.is_store_reachable().await {
        Ok("books module is healthy")
    } else {
        Err(AppError::unavailable("book store is unreachable"))
    }
}

async fn list_books(State(service): State<BookService>) -> Result<Response, AppError> {
    let books = service.find_all().await?;
    if books.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<BookRepresentation> = books.into_iter().map(BookRepresentation::from).collect();
    Ok(Json(body).into_response())
}

async fn get_book(
    State(service): State<BookService>,
    Path(raw_id): Path<String>,
) -> Result<Json<BookRepresentation>, AppError> {
    let id = parse_book_id(&raw_id)?;
    let book = service.find(id).await?.ok_or(BookError::NotFound(id))?;
    Ok(Json(book.into()))
}

async fn count_books(State(service): State<BookService>) -> Result<Response, AppError> {
    let count = service.count_all().await?;
    if count == 0 {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        count.to_string(),
    )
        .into_response())
}

async fn create_book(
    State(service): State<BookService>,
    uri: OriginalUri,
    headers: HeaderMap,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let book = service.create(payload.into()).await?;
    let location = location_of(&uri, &headers, book.id)?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(BookRepresentation::from(book)),
    )
        .into_response())
}

async fn delete_book(
    State(service): State<BookService>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_book_id(&raw_id)?;
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
