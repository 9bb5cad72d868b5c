use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::error::CatalogError;
use super::models::{Book, BookId, BookInput, BookPatch};

/// Handle shared between the books module and its request handlers.
pub type SharedCatalog = Arc<RwLock<BookService>>;

/// In-memory book catalog: insertion-ordered records plus the id allocator.
#[derive(Debug)]
pub struct BookService {
    books: Vec<Book>,
    next_id: BookId,
}

impl BookService {
    pub fn new() -> Self {
        Self {
            books: Vec::new(),
            next_id: 1,
        }
    }

    /// Fresh, empty catalog wrapped for sharing.
    pub fn shared() -> SharedCatalog {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Every record, in insertion order.
    pub fn list(&self) -> Vec<Book> {
        self.books.clone()
    }

    pub fn get(&self, id: BookId) -> Option<Book> {
        self.books.iter().find(|book| book.id == id).cloned()
    }

    pub fn contains(&self, id: BookId) -> bool {
        self.position(id).is_some()
    }

    #[instrument(name = "books.service.create", skip(self, input), fields(isbn = ?input.isbn))]
    pub fn create(&mut self, input: BookInput) -> Result<Book, CatalogError> {
        let fields = input.checked()?.trimmed();

        if self.isbn_taken(&fields.isbn, None) {
            debug!("rejecting duplicate isbn");
            return Err(CatalogError::conflict(fields.isbn));
        }

        let id = self.next_id;
        self.next_id += 1;

        let book = Book::new(id, fields, OffsetDateTime::now_utc());
        self.books.push(book.clone());

        info!(book_id = id, isbn = %book.isbn, "book created");
        Ok(book)
    }

    /// Merge `patch` onto the record; `Ok(None)` when no record has `id`.
    #[instrument(name = "books.service.update", skip(self, patch), fields(book_id = id))]
    pub fn update(&mut self, id: BookId, patch: BookPatch) -> Result<Option<Book>, CatalogError> {
        let Some(index) = self.position(id) else {
            debug!("no book to update");
            return Ok(None);
        };

        let fields = patch.merged_with(&self.books[index]).checked()?;

        if let Some(isbn) = patch.isbn() {
            if self.isbn_taken(isbn, Some(id)) {
                debug!(isbn, "rejecting duplicate isbn");
                return Err(CatalogError::conflict(isbn));
            }
        }

        let book = &mut self.books[index];
        book.apply(fields, OffsetDateTime::now_utc());

        info!(isbn = %book.isbn, "book updated");
        Ok(Some(book.clone()))
    }

    /// Remove the record; `false` when no record has `id`.
    #[instrument(name = "books.service.delete", skip(self), fields(book_id = id))]
    pub fn delete(&mut self, id: BookId) -> bool {
        match self.position(id) {
            Some(index) => {
                let removed = self.books.remove(index);
                info!(isbn = %removed.isbn, "book deleted");
                true
            }
            None => {
                debug!("no book to delete");
                false
            }
        }
    }

    fn position(&self, id: BookId) -> Option<usize> {
        self.books.iter().position(|book| book.id == id)
    }

    fn isbn_taken(&self, isbn: &str, except: Option<BookId>) -> bool {
        self.books
            .iter()
            .any(|book| book.isbn == isbn && Some(book.id) != except)
    }
}

impl Default for BookService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(title: &str, isbn: &str) -> BookInput {
        BookInput::new(title, "Author", isbn, "2024-01-01", 300)
    }

    fn patch(value: serde_json::Value) -> BookPatch {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn list_is_empty_initially() {
        let service = BookService::new();
        assert!(service.list().is_empty());
        assert!(service.is_empty());
    }

    #[test]
    fn list_keeps_insertion_order() {
        let mut service = BookService::new();
        service.create(input("Book 1", "1111111111111")).unwrap();
        service.create(input("Book 2", "2222222222222")).unwrap();

        let titles: Vec<_> = service.list().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["Book 1", "Book 2"]);
    }

    #[test]
    fn get_missing_is_none() {
        let service = BookService::new();
        assert_eq!(service.get(999), None);
        assert!(!service.contains(999));
    }

    #[test]
    fn create_then_get_round_trips() {
        let mut service = BookService::new();
        let created = service.create(input("Test Book", "1234567890123")).unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.created_at, created.updated_at);
        assert!(service.contains(created.id));
        assert_eq!(service.get(created.id), Some(created));
    }

    #[test]
    fn create_rejects_invalid_input_without_side_effects() {
        let mut service = BookService::new();
        let err = service.create(input("", "1234567890123")).unwrap_err();

        match err {
            CatalogError::Validation(violations) => {
                assert!(violations.contains("Title is required"))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(service.is_empty());

        // The failed attempt must not consume an id.
        let created = service.create(input("Now Valid", "1234567890123")).unwrap();
        assert_eq!(created.id, 1);
    }

    #[test]
    fn create_joins_all_violations() {
        let mut service = BookService::new();
        let err = service.create(BookInput::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Title is required, Author is required, ISBN is required, \
             Published date is required, Pages is required"
        );
    }

    #[test]
    fn create_rejects_duplicate_isbn() {
        let mut service = BookService::new();
        service.create(input("First Book", "1234567890123")).unwrap();

        let err = service
            .create(input("Second Book", "1234567890123"))
            .unwrap_err();
        assert_eq!(err, CatalogError::conflict("1234567890123"));
        assert_eq!(
            err.to_string(),
            "Book with ISBN 1234567890123 already exists"
        );
        assert_eq!(service.len(), 1);
    }

    #[test]
    fn duplicate_check_uses_the_stored_isbn() {
        let mut service = BookService::new();
        service.create(input("First", "123")).unwrap();

        let err = service.create(input("Second", " 123 ")).unwrap_err();
        assert_eq!(err, CatalogError::conflict("123"));
    }

    #[test]
    fn create_trims_free_text() {
        let mut service = BookService::new();
        let book = service
            .create(BookInput::new(
                "  Trimmed Title  ",
                "  Trimmed Author  ",
                " 1234567890123",
                "2024-01-01",
                300,
            ))
            .unwrap();

        assert_eq!(book.title, "Trimmed Title");
        assert_eq!(book.author, "Trimmed Author");
        assert_eq!(book.isbn, "1234567890123");
    }

    #[test]
    fn update_merges_present_fields_only() {
        let mut service = BookService::new();
        let created = service
            .create(BookInput::new(
                "Original Title",
                "Original Author",
                "1234567890123",
                "2024-01-01",
                300,
            ))
            .unwrap();
        let before_call = OffsetDateTime::now_utc();

        let updated = service
            .update(created.id, patch(json!({"title": "Updated Title", "pages": 350})))
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "Updated Title");
        assert_eq!(updated.pages, 350);
        assert_eq!(updated.author, "Original Author");
        assert_eq!(updated.isbn, "1234567890123");
        assert_eq!(updated.published_date, "2024-01-01");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= before_call);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(service.get(created.id), Some(updated));
    }

    #[test]
    fn update_does_not_trim() {
        let mut service = BookService::new();
        let created = service.create(input("Title", "123")).unwrap();

        let updated = service
            .update(created.id, patch(json!({"title": "  Spaced  "})))
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "  Spaced  ");
    }

    #[test]
    fn empty_patch_still_refreshes_updated_at() {
        let mut service = BookService::new();
        let created = service.create(input("Title", "123")).unwrap();

        let updated = service.update(created.id, BookPatch::default()).unwrap().unwrap();
        assert_eq!(updated.title, created.title);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn update_missing_is_none() {
        let mut service = BookService::new();
        let result = service
            .update(999, patch(json!({"title": "Updated Title"})))
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn update_rejects_invalid_merge() {
        let mut service = BookService::new();
        let created = service.create(input("Original Title", "1234567890123")).unwrap();

        let err = service
            .update(created.id, patch(json!({"pages": -1})))
            .unwrap_err();
        assert_eq!(err.to_string(), "Pages must be a positive integer");
        assert_eq!(service.get(created.id), Some(created));
    }

    #[test]
    fn update_rejects_explicit_null() {
        let mut service = BookService::new();
        let created = service.create(input("Title", "123")).unwrap();

        let err = service
            .update(created.id, patch(json!({"author": null})))
            .unwrap_err();
        assert_eq!(err.to_string(), "Author is required");
    }

    #[test]
    fn update_rejects_isbn_of_another_book() {
        let mut service = BookService::new();
        let first = service.create(input("Book 1", "1111111111111")).unwrap();
        service.create(input("Book 2", "2222222222222")).unwrap();

        let err = service
            .update(first.id, patch(json!({"isbn": "2222222222222"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Book with ISBN 2222222222222 already exists"
        );
        assert_eq!(service.get(first.id).unwrap().isbn, "1111111111111");
    }

    #[test]
    fn update_may_keep_its_own_isbn() {
        let mut service = BookService::new();
        let created = service.create(input("Book", "1111111111111")).unwrap();

        let updated = service
            .update(created.id, patch(json!({"isbn": "1111111111111", "title": "Renamed"})))
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Renamed");
    }

    #[test]
    fn delete_removes_the_record() {
        let mut service = BookService::new();
        let created = service.create(input("To Delete", "1234567890123")).unwrap();

        assert!(service.delete(created.id));
        assert_eq!(service.get(created.id), None);
        assert!(!service.delete(created.id));
    }

    #[test]
    fn delete_missing_is_false() {
        let mut service = BookService::new();
        assert!(!service.delete(999));
    }

    #[test]
    fn ids_are_never_reused() {
        let mut service = BookService::new();
        let first = service.create(input("One", "1")).unwrap();
        assert!(service.delete(first.id));

        let second = service.create(input("Two", "2")).unwrap();
        assert_eq!(second.id, 2);
    }

    #[test]
    fn isbn_is_free_again_after_delete() {
        let mut service = BookService::new();
        let first = service.create(input("One", "123")).unwrap();
        service.delete(first.id);

        assert!(service.create(input("Again", "123")).is_ok());
    }

    #[test]
    fn documented_scenario() {
        let mut service = BookService::new();
        let created = service
            .create(BookInput::new("A", "B", "123", "2024-01-01", 10))
            .unwrap();
        assert_eq!(created.id, 1);

        let err = service
            .create(BookInput::new("A", "B", "123", "2024-01-01", 10))
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let updated = service
            .update(1, patch(json!({"pages": 20})))
            .unwrap()
            .unwrap();
        assert_eq!(
            (updated.title.as_str(), updated.author.as_str(), updated.isbn.as_str()),
            ("A", "B", "123")
        );
        assert_eq!(updated.pages, 20);

        assert!(service.delete(1));
        assert_eq!(service.get(1), None);
    }
}
