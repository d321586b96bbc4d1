use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use booksearch_db::DbError;

use super::pagination::PageWindow;

/// Separator used by the store for multi-valued text fields.
pub const STORED_DELIMITER: char = '|';
/// Separator shown to readers.
pub const DISPLAY_SEPARATOR: &str = ", ";

/// A row of the book table.
///
/// `authors` and `genres` keep their stored pipe-joined form; use
/// [`display_list`] to format them for readers. Columns the catalog does not
/// interpret are carried in `extra` and serialized alongside the known ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub book_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub genres: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Book {
    /// Build a book from a decoded row.
    pub fn from_row(mut columns: Map<String, Value>) -> Result<Self, DbError> {
        let book_id = match columns.remove("book_id") {
            Some(Value::String(id)) => id,
            Some(Value::Number(id)) => id.to_string(),
            other => return Err(decode_error("book_id", other)),
        };
        let title = match columns.remove("title") {
            Some(Value::String(title)) => title,
            other => return Err(decode_error("title", other)),
        };
        let authors = take_text(&mut columns, "authors")?;
        let genres = take_text(&mut columns, "genres")?;

        Ok(Self {
            book_id,
            title,
            authors,
            genres,
            extra: columns,
        })
    }

    pub fn display_authors(&self) -> String {
        display_list(&self.authors)
    }

    pub fn display_genres(&self) -> String {
        display_list(&self.genres)
    }
}

fn take_text(columns: &mut Map<String, Value>, column: &str) -> Result<String, DbError> {
    match columns.remove(column) {
        Some(Value::String(text)) => Ok(text),
        Some(Value::Null) | None => Ok(String::new()),
        other => Err(decode_error(column, other)),
    }
}

fn decode_error(column: &str, found: Option<Value>) -> DbError {
    DbError::Decode {
        column: column.to_string(),
        reason: match found {
            None => "column missing from result".to_string(),
            Some(value) => format!("unexpected value {}", value),
        },
    }
}

/// Reformat a stored pipe-joined list for display: `"Smith|Jones"` becomes `"Smith, Jones"`.
pub fn display_list(stored: &str) -> String {
    stored.replace(STORED_DELIMITER, DISPLAY_SEPARATOR)
}

/// One page of title-prefix search results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub q: String,
    pub books: Vec<Book>,
    pub total_count: u64,
    pub page: PageWindow,
}

/// Reviews returned by the external review service.
///
/// Anything beyond the count and the list is dropped; review objects are
/// passed through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewSummary {
    #[serde(default)]
    pub num_results: u64,
    #[serde(default)]
    pub results: Vec<Value>,
}

/// Reviews for one title, as handed to the view.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewPage {
    pub book_title: String,
    #[serde(flatten)]
    pub summary: ReviewSummary,
}
