//! In-memory SQLite catalog used by the books tests.

use std::time::Duration;

use booksearch_db::{Param, QueryExecutor};
use booksearch_kernel::settings::CatalogSettings;

use super::catalog::Catalog;

const CREATE_TABLE: &str = "CREATE TABLE book2018 (
    book_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    authors TEXT,
    description BLOB,
    edition TEXT,
    format TEXT,
    pages INTEGER,
    rating REAL,
    rating_count INTEGER,
    review_count INTEGER,
    genres TEXT,
    image_url TEXT
)";

const INSERT_BOOK: &str = "INSERT INTO book2018 \
    (book_id, title, authors, description, edition, format, pages, rating, rating_count, review_count, genres, image_url) \
    VALUES (?, ?, ?, CAST(? AS BLOB), NULL, 'Paperback', ?, ?, ?, ?, ?, NULL)";

async fn memory_executor() -> QueryExecutor {
    // One connection: every SQLite in-memory connection is its own database
    QueryExecutor::connect_url("sqlite::memory:", 1, Duration::from_secs(2))
        .await
        .unwrap()
}

async fn insert(executor: &QueryExecutor, id: &str, title: &str, authors: &str, genres: &str) {
    executor
        .execute(
            INSERT_BOOK,
            &[
                id.into(),
                title.into(),
                authors.into(),
                format!("About {}", title).into(),
                Param::Int(320),
                "4.5".into(),
                Param::Int(1200),
                Param::Int(85),
                genres.into(),
            ],
        )
        .await
        .unwrap();
}

pub async fn seeded_executor() -> QueryExecutor {
    let executor = memory_executor().await;
    executor.execute(CREATE_TABLE, &[]).await.unwrap();

    for n in 0..25 {
        insert(
            &executor,
            &format!("bk-{:02}", n),
            &format!("A Tale {:02}", n),
            "Anon",
            "Fiction",
        )
        .await;
    }
    insert(
        &executor,
        "bk-dune",
        "Dune",
        "Frank Herbert|Brian Herbert",
        "Science Fiction|Classics",
    )
    .await;
    insert(&executor, "bk-wolf", "100% Wolf", "Jayne Lyons", "Children").await;
    insert(&executor, "bk-under", "_Underscored", "", "").await;

    executor
}

/// Catalog with 25 "A Tale NN" books plus a few others.
pub async fn seeded_catalog() -> Catalog {
    Catalog::new(seeded_executor().await, &CatalogSettings::default()).unwrap()
}

/// Catalog whose store has no book table, so every query fails.
pub async fn empty_catalog() -> Catalog {
    Catalog::new(memory_executor().await, &CatalogSettings::default()).unwrap()
}
