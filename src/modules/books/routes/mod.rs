//! HTTP handlers for the books module.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use catalog_http::error::AppError;

use super::models::{Book, BookId, BookInput, BookList, BookPatch};
use super::service::SharedCatalog;
use crate::utils;

const NOT_FOUND: &str = "Book not found";

/// Routes relative to the module mount point (`/api/books`).
pub fn router(catalog: SharedCatalog) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(catalog)
}

/// Path ids are coerced the lenient way; ones that cannot name a book are `None`.
fn book_id(raw: &str) -> Option<BookId> {
    utils::parse_leading_int(raw).and_then(|id| BookId::try_from(id).ok())
}

fn not_found() -> AppError {
    AppError::not_found(NOT_FOUND)
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(State(catalog): State<SharedCatalog>) -> Json<BookList> {
    let books = catalog.read().await.list();
    Json(BookList { books })
}

async fn get_book(
    State(catalog): State<SharedCatalog>,
    Path(raw_id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let id = book_id(&raw_id).ok_or_else(not_found)?;
    let book = catalog.read().await.get(id);
    book.map(Json).ok_or_else(not_found)
}

async fn create_book(
    State(catalog): State<SharedCatalog>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(input) = payload?;
    let book = catalog.write().await.create(input)?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(catalog): State<SharedCatalog>,
    Path(raw_id): Path<String>,
    payload: Result<Json<BookPatch>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let id = book_id(&raw_id).ok_or_else(not_found)?;
    let mut catalog = catalog.write().await;
    // An unknown id is 404 whatever the body holds.
    if !catalog.contains(id) {
        return Err(not_found());
    }
    let Json(patch) = payload?;
    let updated = catalog.update(id, patch)?;
    updated.map(Json).ok_or_else(not_found)
}

async fn delete_book(
    State(catalog): State<SharedCatalog>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = book_id(&raw_id).ok_or_else(not_found)?;
    let deleted = catalog.write().await.delete(id);
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_ids_are_coerced() {
        assert_eq!(book_id("1"), Some(1));
        assert_eq!(book_id("7abc"), Some(7));
        assert_eq!(book_id("-1"), None);
        assert_eq!(book_id("abc"), None);
    }
}
