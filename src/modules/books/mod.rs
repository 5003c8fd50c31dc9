pub mod models;
pub mod repository;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use libris_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use crate::state::AppState;

/// Books resource: paginated cached list, detail, title search, and admin writes
pub struct BooksModule {
    state: AppState,
}

impl BooksModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
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
            cache_ttl_secs = ctx.settings.cache.ttl_secs,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer" }
        });
        let book_body = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/BookPayload" }
                }
            }
        });
        let book = json!({
            "application/json": { "schema": { "$ref": "#/components/schemas/Book" } }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1 } },
                            { "name": "limit", "in": "query", "schema": { "type": "integer", "minimum": 1 } }
                        ],
                        "responses": {
                            "200": {
                                "description": "One page of books",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookPage" }
                                    }
                                }
                            },
                            "400": error("Invalid pagination parameters")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": book_body,
                        "responses": {
                            "201": { "description": "Book created", "content": book },
                            "400": error("Validation error"),
                            "401": error("Unknown bearer token"),
                            "403": error("Administrator role required")
                        }
                    }
                },
                "/search/{term}": {
                    "get": {
                        "summary": "Search books by title",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "term", "in": "path", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Matching books ordered by title",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "200": { "description": "The book", "content": book },
                            "404": error("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Replace a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "requestBody": book_body,
                        "responses": {
                            "204": { "description": "Book updated" },
                            "400": error("Validation error"),
                            "403": error("Administrator role required"),
                            "404": error("Book not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "204": { "description": "Book deleted" },
                            "403": error("Administrator role required"),
                            "404": error("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "title": { "type": "string" },
                            "coverText": { "type": "string" },
                            "comment": {
                                "type": ["string", "null"],
                                "description": "Only returned for version 2.0 and later"
                            },
                            "author": {
                                "oneOf": [
                                    { "$ref": "#/components/schemas/AuthorSummary" },
                                    { "type": "null" }
                                ]
                            },
                            "_links": { "type": "object" }
                        },
                        "required": ["id", "title", "coverText", "author", "_links"]
                    },
                    "AuthorSummary": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "firstName": { "type": "string" },
                            "lastName": { "type": "string" }
                        }
                    },
                    "BookPayload": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "minLength": 1, "maxLength": 255 },
                            "coverText": { "type": "string", "maxLength": 255 },
                            "comment": { "type": ["string", "null"], "maxLength": 255 },
                            "idAuthor": { "type": ["integer", "null"] }
                        },
                        "required": ["title", "coverText"]
                    },
                    "BookPage": {
                        "type": "object",
                        "properties": {
                            "items": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                            "page": { "type": "integer" },
                            "limit": { "type": "integer" },
                            "total": { "type": "integer" },
                            "total_pages": { "type": "integer" },
                            "previous_page": { "type": ["string", "null"] },
                            "next_page": { "type": ["string", "null"] }
                        }
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE books (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    title      TEXT NOT NULL,
                    cover_text TEXT NOT NULL,
                    comment    TEXT NULL,
                    author_id  INTEGER NULL REFERENCES authors(id) ON DELETE SET NULL
                );
                CREATE INDEX books_author_id ON books(author_id);
                CREATE INDEX books_title ON books(title);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let stats = self.state.cache.stats();
        tracing::info!(
            module = self.name(),
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            "books module stopped"
        );
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(state: &AppState) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(state.clone()))
}
