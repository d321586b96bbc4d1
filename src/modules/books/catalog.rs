//! Book table queries: prefix search, match count, and point lookup.

use std::num::NonZeroU64;
use std::sync::Arc;

use booksearch_db::{DbError, Param, QueryExecutor};
use booksearch_kernel::settings::{CatalogColumn, CatalogSettings, ColumnKind};
use serde_json::Value;

use super::models::{Book, SearchPage};
use super::pagination::paginate;

const LIKE_ESCAPE: char = '!';

/// Statements built once from the configured table and columns.
#[derive(Debug)]
struct Statements {
    select_by_title_prefix: String,
    count_by_title_prefix: String,
    select_by_id: String,
}

impl Statements {
    fn build(table: &str, columns: &[CatalogColumn]) -> Result<Self, DbError> {
        let table = identifier(table)?;
        let projection = projection(columns)?;

        Ok(Self {
            select_by_title_prefix: format!(
                "SELECT {projection} FROM {table} AS b WHERE b.title LIKE ? ESCAPE '!' \
                 ORDER BY b.title ASC LIMIT ? OFFSET ?"
            ),
            count_by_title_prefix: format!(
                "SELECT count(b.title) AS count FROM {table} AS b WHERE b.title LIKE ? ESCAPE '!'"
            ),
            select_by_id: format!("SELECT {projection} FROM {table} AS b WHERE b.book_id = ?"),
        })
    }
}

/// Select list casting each column to a type every store driver decodes.
fn projection(columns: &[CatalogColumn]) -> Result<String, DbError> {
    if columns.is_empty() {
        return Ok("b.*".to_string());
    }

    let mut casts = Vec::with_capacity(columns.len());
    for column in columns {
        let name = identifier(&column.name)?;
        let target = match column.kind {
            ColumnKind::Text => "CHAR",
            ColumnKind::Integer => "SIGNED",
            ColumnKind::Real => "DOUBLE",
        };
        casts.push(format!("CAST(b.{name} AS {target}) AS {name}"));
    }
    Ok(casts.join(", "))
}

/// Table and column names are spliced into SQL, so only plain identifiers pass.
fn identifier(name: &str) -> Result<&str, DbError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');

    if valid {
        Ok(name)
    } else {
        Err(DbError::InvalidConfig(format!(
            "'{}' is not a valid table or column name",
            name
        )))
    }
}

/// Read access to the book table.
#[derive(Clone, Debug)]
pub struct Catalog {
    executor: QueryExecutor,
    page_size: NonZeroU64,
    statements: Arc<Statements>,
}

impl Catalog {
    pub fn new(executor: QueryExecutor, settings: &CatalogSettings) -> Result<Self, DbError> {
        let statements = Statements::build(&settings.table, &settings.columns)?;

        Ok(Self {
            executor,
            page_size: settings.page_size,
            statements: Arc::new(statements),
        })
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn page_size(&self) -> NonZeroU64 {
        self.page_size
    }

    /// Titles starting with `prefix`, one page from `offset`, plus navigation.
    ///
    /// Runs the page query and the count query; a failure in either fails
    /// the whole search.
    pub async fn search(&self, prefix: &str, offset: u64) -> Result<SearchPage, DbError> {
        let pattern = prefix_pattern(prefix);
        let limit = i64::try_from(self.page_size.get()).unwrap_or(i64::MAX);
        let sql_offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let rows = self
            .executor
            .fetch_json(
                &self.statements.select_by_title_prefix,
                &[
                    Param::Text(pattern.clone()),
                    Param::Int(limit),
                    Param::Int(sql_offset),
                ],
            )
            .await?;
        let books = rows
            .into_iter()
            .map(Book::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let total_count = self.count(pattern).await?;

        tracing::debug!(
            prefix,
            offset,
            returned = books.len(),
            total_count,
            "title prefix search"
        );

        Ok(SearchPage {
            q: prefix.to_string(),
            books,
            total_count,
            page: paginate(offset, self.page_size, total_count),
        })
    }

    async fn count(&self, pattern: String) -> Result<u64, DbError> {
        let rows = self
            .executor
            .fetch_json(
                &self.statements.count_by_title_prefix,
                &[Param::Text(pattern)],
            )
            .await?;

        match rows.first().and_then(|row| row.get("count")) {
            Some(Value::Number(count)) => count.as_u64().ok_or_else(|| DbError::Decode {
                column: "count".to_string(),
                reason: format!("count {} is not a non-negative integer", count),
            }),
            other => Err(DbError::Decode {
                column: "count".to_string(),
                reason: format!("unexpected count value {:?}", other),
            }),
        }
    }

    /// Look up one book. An unknown id is `Ok(None)`, not an error.
    pub async fn find_by_id(&self, book_id: &str) -> Result<Option<Book>, DbError> {
        let rows = self
            .executor
            .fetch_json(
                &self.statements.select_by_id,
                &[Param::Text(book_id.to_string())],
            )
            .await?;

        rows.into_iter().next().map(Book::from_row).transpose()
    }
}

/// LIKE pattern matching titles that start with `prefix` literally.
///
/// `%` and `_` typed by the user are escaped, so they only match themselves.
pub fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::fixtures;

    #[test]
    fn prefix_pattern_escapes_wildcards() {
        assert_eq!(prefix_pattern("A"), "A%");
        assert_eq!(prefix_pattern(""), "%");
        assert_eq!(prefix_pattern("100%"), "100!%%");
        assert_eq!(prefix_pattern("a_b!"), "a!_b!!%");
    }

    #[tokio::test]
    async fn search_pages_through_matches_in_title_order() {
        let catalog = fixtures::seeded_catalog().await;

        let first = catalog.search("A", 0).await.unwrap();
        assert_eq!(first.total_count, 25);
        assert_eq!(first.books.len(), 10);
        assert_eq!(first.books[0].title, "A Tale 00");
        assert!(first.page.is_first_page);
        assert!(first.page.has_more_pages);

        let last = catalog.search("A", 20).await.unwrap();
        assert_eq!(last.books.len(), 5);
        assert_eq!(last.books[4].title, "A Tale 24");
        assert_eq!(last.page.current_page, 3);
        assert!(!last.page.has_more_pages);
    }

    #[tokio::test]
    async fn search_without_matches() {
        let catalog = fixtures::seeded_catalog().await;

        let page = catalog.search("Zzz", 0).await.unwrap();
        assert!(page.books.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.page.total_pages, 0);
        assert!(!page.page.has_more_pages);
    }

    #[tokio::test]
    async fn wildcards_in_the_prefix_match_literally() {
        let catalog = fixtures::seeded_catalog().await;

        let percent = catalog.search("100%", 0).await.unwrap();
        assert_eq!(percent.total_count, 1);
        assert_eq!(percent.books[0].title, "100% Wolf");

        // Unescaped, "_" would match any single character and pick up "A Tale ..."
        let underscore = catalog.search("_", 0).await.unwrap();
        assert_eq!(underscore.total_count, 1);
        assert_eq!(underscore.books[0].title, "_Underscored");
    }

    #[tokio::test]
    async fn find_by_id_distinguishes_missing_books() {
        let catalog = fixtures::seeded_catalog().await;

        let book = catalog.find_by_id("bk-dune").await.unwrap().unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.display_authors(), "Frank Herbert, Brian Herbert");

        assert!(catalog.find_by_id("no-such-book").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_table_is_a_query_error() {
        let catalog = fixtures::empty_catalog().await;
        let err = catalog.search("A", 0).await.unwrap_err();
        assert!(matches!(err, DbError::Query(_)));

        // The single pooled connection must still be usable afterwards
        catalog.executor().ping().await.unwrap();
    }

    fn column(name: &str, kind: ColumnKind) -> CatalogColumn {
        CatalogColumn {
            name: name.to_string(),
            kind,
        }
    }

    #[test]
    fn projection_casts_every_column() {
        let columns = [
            column("title", ColumnKind::Text),
            column("pages", ColumnKind::Integer),
            column("rating", ColumnKind::Real),
        ];
        assert_eq!(
            projection(&columns).unwrap(),
            "CAST(b.title AS CHAR) AS title, CAST(b.pages AS SIGNED) AS pages, \
             CAST(b.rating AS DOUBLE) AS rating"
        );
        assert_eq!(projection(&[]).unwrap(), "b.*");
    }

    #[test]
    fn unsafe_names_are_rejected() {
        for name in ["", "1st", "title; DROP TABLE book2018", "a-b", "`x`"] {
            assert!(
                matches!(identifier(name), Err(DbError::InvalidConfig(_))),
                "{:?} accepted",
                name
            );
        }
        assert_eq!(identifier("review_count").unwrap(), "review_count");

        let settings = CatalogSettings {
            table: "books; --".to_string(),
            ..CatalogSettings::default()
        };
        assert!(Statements::build(&settings.table, &settings.columns).is_err());
    }

    #[tokio::test]
    async fn detail_columns_decode_with_their_kinds() {
        let catalog = fixtures::seeded_catalog().await;
        let book = catalog.find_by_id("bk-dune").await.unwrap().unwrap();

        assert_eq!(book.extra["description"], Value::from("About Dune"));
        assert_eq!(book.extra["pages"], Value::from(320));
        assert_eq!(book.extra["rating"], Value::from(4.5));
        assert_eq!(book.extra["review_count"], Value::from(85));
        assert_eq!(book.extra["format"], Value::from("Paperback"));
        assert_eq!(book.extra["edition"], Value::Null);
    }

    #[tokio::test]
    async fn empty_column_list_selects_raw_columns() {
        let settings = CatalogSettings {
            columns: Vec::new(),
            ..CatalogSettings::default()
        };
        let catalog = Catalog::new(fixtures::seeded_executor().await, &settings).unwrap();

        let book = catalog.find_by_id("bk-wolf").await.unwrap().unwrap();
        assert_eq!(book.title, "100% Wolf");
        // Stored as a blob, read back as text
        assert_eq!(book.extra["description"], Value::from("About 100% Wolf"));
    }
}
