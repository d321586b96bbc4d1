//! HTTP handlers for the catalog.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use booksearch_db::DbError;
use booksearch_http::error::AppError;
use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use super::models::ReviewPage;
use super::negotiate::Representation;
use super::reviews::ReviewClient;
use super::views;

/// Shared handler state, built once at startup.
#[derive(Clone, Debug)]
pub struct BooksState {
    pub catalog: Catalog,
    pub reviews: ReviewClient,
    /// Catalog root used in generated links, `/` or the mount prefix.
    pub root: String,
}

/// Query string of `GET /search`.
///
/// Both fields are kept as raw strings so malformed values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub offset: Option<String>,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/search", get(search))
        .route("/detailed/{book_id}", get(detailed))
        .route("/reviews/{title}", get(reviews))
        .with_state(state)
}

/// Missing, unparsable, and negative offsets all mean the first page.
pub fn parse_offset(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(|offset| u64::try_from(offset).ok())
        .unwrap_or(0)
}

fn store_error(err: DbError) -> AppError {
    if err.is_unavailable() {
        AppError::unavailable("the catalog is busy, please retry shortly")
    } else {
        AppError::Internal(anyhow::Error::new(err).context("catalog query failed"))
    }
}

fn require_supported(representation: Representation) -> Result<(), AppError> {
    if representation.is_supported() {
        Ok(())
    } else {
        Err(AppError::not_acceptable(&Representation::OFFERED))
    }
}

fn respond<T: Serialize>(
    representation: Representation,
    html: impl FnOnce() -> String,
    payload: &T,
) -> Result<Response, AppError> {
    match representation {
        Representation::Html => Ok(Html(html()).into_response()),
        Representation::Json => Ok(Json(payload).into_response()),
        Representation::Unsupported => Err(AppError::not_acceptable(&Representation::OFFERED)),
    }
}

async fn landing(State(state): State<BooksState>) -> Html<String> {
    Html(views::landing(&state.root))
}

async fn search(
    State(state): State<BooksState>,
    representation: Representation,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    require_supported(representation)?;

    let offset = parse_offset(params.offset.as_deref());
    let q = params.q.unwrap_or_default();

    let page = state.catalog.search(&q, offset).await.map_err(store_error)?;

    respond(representation, || views::search(&state.root, &page), &page)
}

async fn detailed(
    State(state): State<BooksState>,
    representation: Representation,
    Path(book_id): Path<String>,
) -> Result<Response, AppError> {
    require_supported(representation)?;

    let Some(book) = state
        .catalog
        .find_by_id(&book_id)
        .await
        .map_err(store_error)?
    else {
        tracing::info!(book_id = %book_id, "book not found");
        return match representation {
            Representation::Html => Ok((
                StatusCode::NOT_FOUND,
                Html(views::not_found(&state.root, &book_id)),
            )
                .into_response()),
            _ => Err(AppError::not_found(format!("book '{}' not found", book_id))),
        };
    };

    respond(representation, || views::detail(&state.root, &book), &book)
}

async fn reviews(
    State(state): State<BooksState>,
    representation: Representation,
    Path(title): Path<String>,
) -> Result<Response, AppError> {
    require_supported(representation)?;

    let summary = state.reviews.reviews_for(&title).await;
    let page = ReviewPage {
        book_title: title,
        summary,
    };

    respond(representation, || views::reviews(&state.root, &page), &page)
}
