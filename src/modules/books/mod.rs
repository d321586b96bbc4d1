pub mod catalog;
pub mod models;
pub mod negotiate;
pub mod pagination;
pub mod reviews;
pub mod routes;
pub mod views;

#[cfg(test)]
mod fixtures;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use booksearch_db::QueryExecutor;
use booksearch_kernel::{settings::Settings, InitCtx, Module};
use std::sync::Arc;

use catalog::Catalog;
use reviews::ReviewClient;
use routes::BooksState;

/// Book catalog: title search, book detail, and external reviews
pub struct BooksModule {
    state: BooksState,
    mount_path: String,
}

impl BooksModule {
    pub fn new(state: BooksState, mount_path: impl Into<String>) -> Self {
        Self {
            state,
            mount_path: mount_path.into(),
        }
    }

    /// Build the module from settings; the pool connects lazily.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let executor = QueryExecutor::connect(&settings.database)
            .await
            .context("failed to configure catalog connection pool")?;
        let reviews = ReviewClient::new(&settings.reviews)?;

        let state = BooksState {
            catalog: Catalog::new(executor, &settings.catalog)
                .context("invalid catalog table configuration")?,
            reviews,
            root: settings.server.root().to_string(),
        };

        Ok(Self::new(state, settings.server.base_path.clone()))
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    fn mount_path(&self) -> String {
        self.mount_path.clone()
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "pinging catalog store"
        );

        self.state
            .catalog
            .executor()
            .ping()
            .await
            .context("catalog store did not answer ping")?;

        tracing::info!(module = self.name(), "books module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error_response = |description: &str| {
            serde_json::json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };

        Some(serde_json::json!({
            "paths": {
                "/search": {
                    "get": {
                        "summary": "Search titles by prefix",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "q", "in": "query", "schema": { "type": "string" } },
                            { "name": "offset", "in": "query", "schema": { "type": "integer", "minimum": 0 } }
                        ],
                        "responses": {
                            "200": {
                                "description": "One page of matching titles",
                                "content": {
                                    "text/html": { "schema": { "type": "string" } },
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/SearchPage" }
                                    }
                                }
                            },
                            "406": error_response("No acceptable representation"),
                            "500": error_response("Store failure"),
                            "503": error_response("Connection pool exhausted")
                        }
                    }
                },
                "/detailed/{book_id}": {
                    "get": {
                        "summary": "Book detail",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "book_id", "in": "path", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "The book",
                                "content": {
                                    "text/html": { "schema": { "type": "string" } },
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "404": {
                                "description": "No book with this id",
                                "content": {
                                    "text/html": { "schema": { "type": "string" } },
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            },
                            "406": error_response("No acceptable representation"),
                            "500": error_response("Store failure")
                        }
                    }
                },
                "/reviews/{title}": {
                    "get": {
                        "summary": "External reviews for a title",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "title", "in": "path", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Review count and list; empty when the review service fails",
                                "content": {
                                    "text/html": { "schema": { "type": "string" } },
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ReviewPage" }
                                    }
                                }
                            },
                            "406": error_response("No acceptable representation")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "description": "A row of the book table; unlisted columns are passed through",
                        "properties": {
                            "book_id": { "type": "string" },
                            "title": { "type": "string" },
                            "authors": { "type": "string", "description": "Pipe-separated author names" },
                            "genres": { "type": "string", "description": "Pipe-separated genres" }
                        },
                        "required": ["book_id", "title"],
                        "additionalProperties": true
                    },
                    "SearchPage": {
                        "type": "object",
                        "properties": {
                            "q": { "type": "string" },
                            "books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                            "total_count": { "type": "integer" },
                            "page": {
                                "type": "object",
                                "properties": {
                                    "offset": { "type": "integer" },
                                    "page_size": { "type": "integer" },
                                    "prev_offset": { "type": "integer" },
                                    "next_offset": { "type": "integer" },
                                    "current_page": { "type": "integer" },
                                    "total_pages": { "type": "integer" },
                                    "is_first_page": { "type": "boolean" },
                                    "has_more_pages": { "type": "boolean" }
                                }
                            }
                        }
                    },
                    "ReviewPage": {
                        "type": "object",
                        "properties": {
                            "book_title": { "type": "string" },
                            "num_results": { "type": "integer" },
                            "results": { "type": "array", "items": { "type": "object" } }
                        }
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), root = %self.state.root, "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.state.catalog.executor().close().await;
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module from settings
pub async fn create_module(settings: &Settings) -> anyhow::Result<Arc<dyn Module>> {
    Ok(Arc::new(BooksModule::from_settings(settings).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use booksearch_kernel::settings::ReviewSettings;

    async fn module() -> BooksModule {
        let state = BooksState {
            catalog: fixtures::seeded_catalog().await,
            reviews: ReviewClient::new(&ReviewSettings::default()).unwrap(),
            root: "/main".to_string(),
        };
        BooksModule::new(state, "/main")
    }

    #[tokio::test]
    async fn lifecycle_pings_then_closes_the_pool() {
        let module = module().await;
        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };

        module.init(&ctx).await.unwrap();
        module.start(&ctx).await.unwrap();
        module.stop().await.unwrap();

        assert!(module.state.catalog.executor().pool().is_closed());
        assert!(module.init(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn openapi_documents_every_route() {
        let module = module().await;
        let spec = module.openapi().unwrap();
        for path in ["/search", "/detailed/{book_id}", "/reviews/{title}"] {
            assert!(spec["paths"][path]["get"].is_object(), "missing {}", path);
        }
        assert_eq!(module.mount_path(), "/main");
    }
}
