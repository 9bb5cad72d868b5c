pub mod error;
pub mod models;
pub mod routes;
pub mod service;

use async_trait::async_trait;
use axum::Router;
use catalog_kernel::{InitCtx, Module};
use serde_json::{json, Value};
use utoipa::PartialSchema;

use self::models::{Book, BookList};
use self::service::SharedCatalog;

/// Books module: the catalog service behind `/api/books`
pub struct BooksModule {
    catalog: SharedCatalog,
}

impl BooksModule {
    pub fn new(catalog: SharedCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.catalog.clone())
    }

    fn openapi(&self) -> Option<Value> {
        let book_schema = serde_json::to_value(Book::schema()).ok()?;
        let list_schema = serde_json::to_value(BookList::schema()).ok()?;

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": json_response("All books in insertion order", "BookList")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": json_body("CreateBook"),
                        "responses": {
                            "201": json_response("Created book", "Book"),
                            "400": json_response("Validation failure or duplicate ISBN", "ErrorResponse")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                },
                "/{id}": {
                    "parameters": [{
                        "name": "id",
                        "in": "path",
                        "required": true,
                        "schema": { "type": "integer", "format": "int64" }
                    }],
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "responses": {
                            "200": json_response("The book", "Book"),
                            "404": json_response("Book not found", "ErrorResponse")
                        }
                    },
                    "put": {
                        "summary": "Update some fields of a book",
                        "tags": ["Books"],
                        "requestBody": json_body("UpdateBook"),
                        "responses": {
                            "200": json_response("Updated book", "Book"),
                            "400": json_response("Validation failure or duplicate ISBN", "ErrorResponse"),
                            "404": json_response("Book not found", "ErrorResponse")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "responses": {
                            "204": { "description": "Deleted" },
                            "404": json_response("Book not found", "ErrorResponse")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": book_schema,
                    "BookList": list_schema,
                    "CreateBook": input_schema(&["title", "author", "isbn", "publishedDate", "pages"]),
                    "UpdateBook": input_schema(&[])
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = self.catalog.read().await.len();
        tracing::info!(module = self.name(), books, "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let books = self.catalog.read().await.len();
        tracing::info!(
            module = self.name(),
            books,
            "books module stopped; in-memory records discarded"
        );
        Ok(())
    }
}

fn json_response(description: &str, schema: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            }
        }
    })
}

fn json_body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            }
        }
    })
}

fn input_schema(required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string", "maxLength": models::TITLE_MAX_LEN },
            "author": { "type": "string", "maxLength": models::AUTHOR_MAX_LEN },
            "isbn": { "type": "string", "maxLength": models::ISBN_MAX_LEN },
            "publishedDate": { "type": "string", "format": "date" },
            "pages": { "type": "integer", "minimum": 1 }
        },
        "required": required
    })
}

/// Create a new instance of the books module over `catalog`
pub fn create_module(catalog: SharedCatalog) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(catalog))
}
