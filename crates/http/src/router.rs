//! Router builder for the booksearch HTTP server

use axum::{
    extract::Request,
    handler::HandlerWithoutStateExt,
    http::HeaderValue,
    response::Redirect,
    routing::get,
    Router,
};
use std::path::Path;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::{NoContext, Timestamp, Uuid};

use booksearch_kernel::ModuleRegistry;

/// Builder for constructing the main HTTP router
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a router under `path`; an empty path or `/` merges it at the root
    pub fn mount(mut self, path: &str, module_router: Router) -> Self {
        let path = path.trim_end_matches('/');
        self.router = if path.is_empty() {
            self.router.merge(module_router)
        } else {
            self.router.nest(path, module_router)
        };
        self
    }

    /// Redirect unmatched requests to `root`, trying `static_dir` first when given
    pub fn with_fallback(mut self, root: &str, static_dir: Option<&Path>) -> Self {
        let target = root.to_string();
        let redirect = move || {
            let target = target.clone();
            async move { Redirect::to(&target) }
        };

        self.router = match static_dir {
            Some(dir) => {
                tracing::info!(dir = %dir.display(), "serving static assets");
                self.router
                    .fallback_service(ServeDir::new(dir).fallback(redirect.into_service()))
            }
            None => self.router.fallback(redirect),
        };
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.router = self.router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
        self
    }

    /// Add request ID middleware; the id is echoed back on the response
    pub fn with_request_id(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self
            .router
            .layer(TimeoutLayer::new(Duration::from_millis(timeout_ms)));
        self
    }

    /// Serve an OpenAPI document merged from every module's fragment
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi_spec = merged_openapi(registry);

        // The merged document is served as-is; a typed parse only flags mistakes
        if let Err(err) =
            serde_json::from_value::<utoipa::openapi::OpenApi>(openapi_spec.clone())
        {
            tracing::warn!(error = %err, "merged OpenAPI document does not parse");
        }

        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(openapi_spec.clone()) }),
        );

        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn merged_openapi(registry: &ModuleRegistry) -> serde_json::Value {
    let mut openapi_spec = serde_json::json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Booksearch API",
            "version": "1.0.0",
            "description": "Book catalog search, detail, and review lookup"
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    openapi_spec["components"]["schemas"]["ErrorResponse"] = serde_json::json!({
        "type": "object",
        "properties": {
            "error": {
                "type": "object",
                "properties": {
                    "code": { "type": "string" },
                    "message": { "type": "string" },
                    "details": { "type": "array", "items": { "type": "object" } },
                    "trace_id": { "type": "string" },
                    "timestamp": { "type": "string" }
                },
                "required": ["code", "message", "trace_id", "timestamp"]
            }
        },
        "required": ["error"]
    });

    openapi_spec["paths"]["/healthz"] = serde_json::json!({
        "get": {
            "summary": "Health check",
            "responses": {
                "200": {
                    "description": "OK",
                    "content": { "text/plain": { "schema": { "type": "string" } } }
                }
            }
        }
    });

    for module in registry.modules() {
        let Some(module_spec) = module.openapi() else {
            continue;
        };
        let prefix = module.mount_path();
        let prefix = prefix.trim_end_matches('/');

        if let Some(paths) = module_spec.get("paths").and_then(|p| p.as_object()) {
            for (path, path_item) in paths {
                let prefixed_path = format!("{}{}", prefix, path);
                openapi_spec["paths"][prefixed_path] = path_item.clone();
            }
        }

        if let Some(schemas) = module_spec
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.as_object())
        {
            for (schema_name, schema_def) in schemas {
                openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }
    }

    openapi_spec
}

/// Request ID generator producing time-ordered UUIDs
#[derive(Clone)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let request_id = Uuid::new_v7(Timestamp::now(NoContext))
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, StatusCode};
    use booksearch_kernel::Module;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    struct CatalogStub;

    #[async_trait]
    impl Module for CatalogStub {
        fn name(&self) -> &'static str {
            "catalog"
        }

        fn mount_path(&self) -> String {
            "/main".to_string()
        }

        fn openapi(&self) -> Option<serde_json::Value> {
            Some(serde_json::json!({
                "paths": {
                    "/search": {
                        "get": {
                            "summary": "Search",
                            "responses": { "200": { "description": "OK" } }
                        }
                    }
                }
            }))
        }
    }

    #[tokio::test]
    async fn test_root_mount_serves_routes() {
        let module_router = Router::new().route("/search", get(|| async { "results" }));
        let router = RouterBuilder::new().mount("", module_router).build();

        let response = router.oneshot(get_request("/search")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_nested_mount() {
        let module_router = Router::new().route("/search", get(|| async { "results" }));
        let router = RouterBuilder::new().mount("/main", module_router).build();

        let response = router.oneshot(get_request("/main/search")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unmatched_path_redirects_to_root() {
        let router = RouterBuilder::new()
            .route("/", get(|| async { "home" }))
            .with_fallback("/main", None)
            .build();

        let response = router.oneshot(get_request("/no/such/page")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/main");
    }

    #[tokio::test]
    async fn test_static_dir_is_tried_before_redirect() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("style.css"), "body {}").unwrap();

        let router = RouterBuilder::new()
            .with_fallback("/", Some(dir.path()))
            .build();

        let found = router.clone().oneshot(get_request("/style.css")).await.unwrap();
        assert_eq!(found.status(), StatusCode::OK);
        let body = to_bytes(found.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"body {}");

        let missing = router.oneshot(get_request("/missing.css")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::SEE_OTHER);
        assert_eq!(missing.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn test_middleware_chain_sets_request_id() {
        let router = RouterBuilder::new()
            .route("/health", get(|| async { "ok" }))
            .with_tracing()
            .with_cors()
            .with_request_id()
            .with_timeout(5000)
            .build();

        let response = router.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let request_id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(Uuid::parse_str(request_id).is_ok());
    }

    #[tokio::test]
    async fn test_openapi_paths_are_prefixed_with_mount_path() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(CatalogStub));

        let router = RouterBuilder::new().with_openapi(&registry).build();
        let response = router
            .oneshot(get_request("/docs/openapi.json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(doc["paths"]["/main/search"]["get"].is_object());
        assert!(doc["paths"]["/healthz"]["get"].is_object());
        assert!(doc["components"]["schemas"]["ErrorResponse"].is_object());
    }
}
