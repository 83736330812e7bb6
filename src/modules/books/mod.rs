pub mod models;
pub mod routes;
pub mod service;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookstore_db::Database;
use bookstore_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use service::BookService;

/// Book catalog module: entity, persistence and HTTP resource
pub struct BooksModule {
    service: BookService,
}

impl BooksModule {
    pub fn new(service: BookService) -> Self {
        Self { service }
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
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let count = self.service.count_all().await?;
        tracing::info!(module = self.name(), count, "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module over the given store
pub fn create_module(db: Database) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(BookService::new(db)))
}

pub(crate) fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_create_book",
        up: r#"
            CREATE TABLE book (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                isbn             TEXT,
                title            TEXT NOT NULL,
                description      TEXT,
                price            TEXT NOT NULL,
                publication_date TEXT,
                nb_of_pages      INTEGER CHECK (nb_of_pages >= 40),
                image_url        TEXT
            );
            CREATE INDEX book_title ON book (title);
            "#,
    }]
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn id_parameter() -> serde_json::Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64", "minimum": 1 }
    })
}

fn openapi_fragment() -> serde_json::Value {
    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books, title descending",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "All books",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "204": { "description": "No books stored" }
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/BookInput" }
                            }
                        }
                    },
                    "responses": {
                        "201": {
                            "description": "Book created; Location points at it",
                            "headers": {
                                "Location": { "schema": { "type": "string", "format": "uri" } }
                            },
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Book" }
                                }
                            }
                        },
                        "400": error_response("Invalid book")
                    }
                }
            },
            "/count": {
                "get": {
                    "summary": "Number of stored books",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "Book count",
                            "content": { "text/plain": { "schema": { "type": "integer" } } }
                        },
                        "204": { "description": "No books stored" }
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": {
                            "description": "The book",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Book" }
                                }
                            }
                        },
                        "400": error_response("Id is not a positive integer"),
                        "404": error_response("No such book")
                    }
                },
                "delete": {
                    "summary": "Delete a book; missing ids are ignored",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "204": { "description": "Book removed or already absent" },
                        "400": error_response("Id is not a positive integer")
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
            }
        },
        "components": {
            "schemas": {
                "BookInput": {
                    "type": "object",
                    "properties": {
                        "isbn": {
                            "type": "string",
                            "maxLength": 50,
                            "example": "978-3-86680-192-9"
                        },
                        "title": { "type": "string", "minLength": 1, "maxLength": 100 },
                        "description": { "type": "string", "minLength": 10, "maxLength": 10000 },
                        "price": { "type": "number", "minimum": 1, "example": 19.99 },
                        "publication-date": {
                            "type": "string",
                            "format": "date",
                            "description": "Must lie in the past"
                        },
                        "nb-of-pages": { "type": "integer", "minimum": 40 }
                    },
                    "required": ["title", "price"]
                },
                "Book": {
                    "allOf": [
                        { "$ref": "#/components/schemas/BookInput" },
                        {
                            "type": "object",
                            "properties": {
                                "id": { "type": "integer", "format": "int64", "readOnly": true }
                            },
                            "required": ["id"]
                        }
                    ]
                }
            }
        }
    })
}
