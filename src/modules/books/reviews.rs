//! Client for the external book review service.

use std::time::Duration;

use anyhow::Context;
use booksearch_kernel::settings::ReviewSettings;

use super::models::ReviewSummary;

/// Looks up reviews by title.
///
/// Failures never reach the caller: transport errors, non-success statuses,
/// timeouts, and malformed bodies are logged and yield an empty summary.
#[derive(Clone, Debug)]
pub struct ReviewClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ReviewClient {
    pub fn new(settings: &ReviewSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .context("failed to build review HTTP client")?;

        if settings.api_key.is_none() {
            tracing::warn!(
                endpoint = %settings.endpoint,
                "no review API key configured; lookups will likely be rejected"
            );
        }

        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    /// Reviews for `title`, or an empty summary if the lookup fails.
    pub async fn reviews_for(&self, title: &str) -> ReviewSummary {
        match self.fetch(title).await {
            Ok(summary) => {
                tracing::debug!(title, num_results = summary.num_results, "reviews fetched");
                summary
            }
            Err(err) => {
                tracing::warn!(title, error = %err, "review lookup failed");
                ReviewSummary::default()
            }
        }
    }

    async fn fetch(&self, title: &str) -> Result<ReviewSummary, reqwest::Error> {
        let mut query = Vec::with_capacity(2);
        if let Some(api_key) = &self.api_key {
            query.push(("api-key", api_key.as_str()));
        }
        query.push(("title", title));

        self.http
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json::<ReviewSummary>()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        format!("http://{}/reviews.json", addr)
    }

    fn client(endpoint: String, timeout_ms: u64) -> ReviewClient {
        ReviewClient::new(&ReviewSettings {
            endpoint,
            api_key: Some("secret".to_string()),
            timeout_ms,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn passes_key_and_title_and_returns_reviews() {
        let router = Router::new().route(
            "/reviews.json",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                Json(json!({
                    "status": "OK",
                    "num_results": 1,
                    "results": [{
                        "book_title": params.get("title"),
                        "byline": params.get("api-key"),
                    }]
                }))
            }),
        );
        let endpoint = serve(router).await;

        let summary = client(endpoint, 2000).reviews_for("The Road & Beyond").await;
        assert_eq!(summary.num_results, 1);
        assert_eq!(summary.results[0]["book_title"], "The Road & Beyond");
        assert_eq!(summary.results[0]["byline"], "secret");
    }

    #[tokio::test]
    async fn malformed_body_degrades_to_empty() {
        let router = Router::new().route("/reviews.json", get(|| async { "<html>oops</html>" }));
        let endpoint = serve(router).await;

        let summary = client(endpoint, 2000).reviews_for("Dune").await;
        assert_eq!(summary, ReviewSummary::default());
    }

    #[tokio::test]
    async fn error_status_degrades_to_empty() {
        let router = Router::new().route(
            "/reviews.json",
            get(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    Json(json!({ "fault": "invalid key" })),
                )
            }),
        );
        let endpoint = serve(router).await;

        let summary = client(endpoint, 2000).reviews_for("Dune").await;
        assert_eq!(summary, ReviewSummary::default());
    }

    #[tokio::test]
    async fn unreachable_service_degrades_to_empty() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let summary = client(format!("http://{}/reviews.json", addr), 2000)
            .reviews_for("Dune")
            .await;
        assert_eq!(summary, ReviewSummary::default());
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let router = Router::new().route(
            "/reviews.json",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "num_results": 1, "results": [{}] }))
            }),
        );
        let endpoint = serve(router).await;

        let started = std::time::Instant::now();
        let summary = client(endpoint, 100).reviews_for("Dune").await;
        assert_eq!(summary, ReviewSummary::default());
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
