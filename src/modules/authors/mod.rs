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

/// Authors resource
pub struct AuthorsModule {
    state: AppState,
}

impl AuthorsModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for AuthorsModule {
    fn name(&self) -> &'static str {
        "authors"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "authors module initialized"
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
        let author_body = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/AuthorPayload" }
                }
            }
        });
        let author = json!({
            "application/json": { "schema": { "$ref": "#/components/schemas/Author" } }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List authors",
                        "tags": ["Authors"],
                        "parameters": [
                            { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1 } },
                            { "name": "limit", "in": "query", "schema": { "type": "integer", "minimum": 1 } }
                        ],
                        "responses": {
                            "200": { "description": "One page of authors" },
                            "400": error("Invalid pagination parameters")
                        }
                    },
                    "post": {
                        "summary": "Create an author",
                        "tags": ["Authors"],
                        "requestBody": author_body,
                        "responses": {
                            "201": { "description": "Author created", "content": author },
                            "400": error("Validation error"),
                            "401": error("Unknown bearer token"),
                            "403": error("Administrator role required")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get an author",
                        "tags": ["Authors"],
                        "parameters": [id_param],
                        "responses": {
                            "200": { "description": "The author", "content": author },
                            "404": error("Author not found")
                        }
                    },
                    "put": {
                        "summary": "Replace an author",
                        "tags": ["Authors"],
                        "parameters": [id_param],
                        "requestBody": author_body,
                        "responses": {
                            "204": { "description": "Author updated" },
                            "400": error("Validation error"),
                            "403": error("Administrator role required"),
                            "404": error("Author not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete an author, keeping their books",
                        "tags": ["Authors"],
                        "parameters": [id_param],
                        "responses": {
                            "204": { "description": "Author deleted" },
                            "403": error("Administrator role required"),
                            "404": error("Author not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Author": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "firstName": { "type": "string" },
                            "lastName": { "type": "string" },
                            "books": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": { "id": { "type": "integer" } }
                                }
                            },
                            "_links": { "type": "object" }
                        },
                        "required": ["id", "firstName", "lastName", "books", "_links"]
                    },
                    "AuthorPayload": {
                        "type": "object",
                        "properties": {
                            "firstName": { "type": "string", "minLength": 1, "maxLength": 255 },
                            "lastName": { "type": "string", "minLength": 1, "maxLength": 255 }
                        },
                        "required": ["firstName", "lastName"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE authors (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    first_name TEXT NOT NULL,
                    last_name  TEXT NOT NULL
                );
                "#,
        }]
    }
}

pub fn create_module(state: &AppState) -> Arc<dyn Module> {
    Arc::new(AuthorsModule::new(state.clone()))
}
