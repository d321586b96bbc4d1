//! HTML views for the catalog pages.

use std::fmt::Write;

use serde_json::Value;

use super::models::{Book, ReviewPage, SearchPage};
use crate::utils::{escape_html, join_path};

const LETTERS: [char; 26] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];
const DIGITS: [char; 10] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

fn layout(root: &str, title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Booksearch {title}</title>\n</head>\n<body>\n\
         <header><a href=\"{home}\">Booksearch</a></header>\n<main>\n{body}</main>\n</body>\n</html>\n",
        title = escape_html(title),
        home = escape_html(root),
        body = body,
    )
}

fn search_href(root: &str, q: &str, offset: Option<u64>) -> String {
    let mut href = format!("{}?q={}", join_path(root, "search"), urlencoding::encode(q));
    if let Some(offset) = offset {
        let _ = write!(href, "&offset={}", offset);
    }
    href
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        other => Some(other.to_string()),
    }
}

/// Landing page listing the letter and digit index.
pub fn landing(root: &str) -> String {
    let mut body = String::from("<h1>Browse titles</h1>\n");
    for (heading, keys) in [("Letters", &LETTERS[..]), ("Numbers", &DIGITS[..])] {
        let _ = writeln!(body, "<h2>{}</h2>\n<ul class=\"index\">", heading);
        for key in keys {
            let key = key.to_string();
            let _ = writeln!(
                body,
                "<li><a href=\"{}\">{}</a></li>",
                escape_html(&search_href(root, &key, None)),
                key
            );
        }
        body.push_str("</ul>\n");
    }
    layout(root, "| Home", &body)
}

/// One page of search results with previous/next links.
pub fn search(root: &str, page: &SearchPage) -> String {
    let mut body = format!(
        "<h1>Titles starting with &quot;{}&quot;</h1>\n<p>{} matching titles</p>\n",
        escape_html(&page.q),
        page.total_count
    );

    if page.books.is_empty() {
        body.push_str("<p>No titles found.</p>\n");
    } else {
        body.push_str("<ol class=\"results\">\n");
        for book in &page.books {
            let detail = join_path(root, &format!("detailed/{}", urlencoding::encode(&book.book_id)));
            let _ = writeln!(
                body,
                "<li><a href=\"{}\">{}</a></li>",
                escape_html(&detail),
                escape_html(&book.title)
            );
        }
        body.push_str("</ol>\n");
    }

    body.push_str("<nav class=\"pager\">\n");
    if !page.page.is_first_page {
        let _ = writeln!(
            body,
            "<a rel=\"prev\" href=\"{}\">Previous</a>",
            escape_html(&search_href(root, &page.q, Some(page.page.prev_offset)))
        );
    }
    if page.page.total_pages > 0 {
        let _ = writeln!(
            body,
            "<span>Page {} of {}</span>",
            page.page.current_page, page.page.total_pages
        );
    }
    if page.page.has_more_pages {
        let _ = writeln!(
            body,
            "<a rel=\"next\" href=\"{}\">Next</a>",
            escape_html(&search_href(root, &page.q, Some(page.page.next_offset)))
        );
    }
    body.push_str("</nav>\n");

    layout(root, "| Searching", &body)
}

/// Detail page for one book.
pub fn detail(root: &str, book: &Book) -> String {
    let mut body = format!(
        "<h1>{}</h1>\n<dl>\n<dt>Authors</dt><dd>{}</dd>\n<dt>Genres</dt><dd>{}</dd>\n",
        escape_html(&book.title),
        escape_html(&book.display_authors()),
        escape_html(&book.display_genres())
    );
    for (column, value) in &book.extra {
        if let Some(text) = scalar_text(value) {
            let _ = writeln!(
                body,
                "<dt>{}</dt><dd>{}</dd>",
                escape_html(column),
                escape_html(&text)
            );
        }
    }
    body.push_str("</dl>\n");

    let reviews = join_path(root, &format!("reviews/{}", urlencoding::encode(&book.title)));
    let _ = writeln!(
        body,
        "<p><a href=\"{}\">Reviews</a></p>",
        escape_html(&reviews)
    );

    layout(root, "| Detail", &body)
}

/// Page shown with a 404 when no book has the requested id.
pub fn not_found(root: &str, book_id: &str) -> String {
    let body = format!(
        "<h1>Book not found</h1>\n<p>No book has the id &quot;{}&quot;.</p>\n\
         <p><a href=\"{}\">Back to the index</a></p>\n",
        escape_html(book_id),
        escape_html(root)
    );
    layout(root, "| Not Found", &body)
}

/// Review listing for one title.
pub fn reviews(root: &str, page: &ReviewPage) -> String {
    let mut body = format!(
        "<h1>Reviews of {}</h1>\n<p>{} review(s) found</p>\n",
        escape_html(&page.book_title),
        page.summary.num_results
    );

    if !page.summary.results.is_empty() {
        body.push_str("<ul class=\"reviews\">\n");
        for review in &page.summary.results {
            body.push_str("<li>");
            if let Some(byline) = review.get("byline").and_then(scalar_text) {
                let _ = write!(body, "<strong>{}</strong> ", escape_html(&byline));
            }
            if let Some(date) = review.get("publication_dt").and_then(scalar_text) {
                let _ = write!(body, "<time>{}</time> ", escape_html(&date));
            }
            if let Some(summary) = review.get("summary").and_then(scalar_text) {
                let _ = write!(body, "<p>{}</p>", escape_html(&summary));
            }
            if let Some(url) = review
                .get("url")
                .and_then(Value::as_str)
                .filter(|url| url.starts_with("https://") || url.starts_with("http://"))
            {
                let _ = write!(body, "<a href=\"{}\">Read review</a>", escape_html(url));
            }
            body.push_str("</li>\n");
        }
        body.push_str("</ul>\n");
    }

    layout(root, "| Reviews", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::models::ReviewSummary;
    use crate::modules::books::pagination::paginate;
    use serde_json::{json, Map};
    use std::num::NonZeroU64;

    fn book(id: &str, title: &str) -> Book {
        Book {
            book_id: id.to_string(),
            title: title.to_string(),
            authors: "Smith|Jones".to_string(),
            genres: "Horror".to_string(),
            extra: Map::new(),
        }
    }

    fn page(q: &str, offset: u64, total_count: u64) -> SearchPage {
        SearchPage {
            q: q.to_string(),
            books: vec![book("b1", "Tom & Jerry")],
            total_count,
            page: paginate(offset, NonZeroU64::new(10).unwrap(), total_count),
        }
    }

    #[test]
    fn landing_links_every_index_value() {
        let html = landing("/main");
        assert!(html.contains("href=\"/main/search?q=A\""));
        assert!(html.contains("href=\"/main/search?q=N\""));
        assert!(html.contains("href=\"/main/search?q=9\""));
    }

    #[test]
    fn first_page_has_only_next_link() {
        let html = search("/", &page("A & B", 0, 25));
        assert!(html.contains("Tom &amp; Jerry"));
        assert!(html.contains("href=\"/detailed/b1\""));
        assert!(html.contains("/search?q=A%20%26%20B&amp;offset=10"));
        assert!(!html.contains("rel=\"prev\""));
        assert!(html.contains("Page 1 of 3"));
    }

    #[test]
    fn last_page_has_only_previous_link() {
        let html = search("/", &page("A", 20, 25));
        assert!(html.contains("rel=\"prev\" href=\"/search?q=A&amp;offset=10\""));
        assert!(!html.contains("rel=\"next\""));
    }

    #[test]
    fn detail_reformats_lists_and_links_reviews() {
        let mut book = book("b1", "It");
        book.extra.insert("pages".to_string(), json!(1138));
        let html = detail("/", &book);
        assert!(html.contains("<dd>Smith, Jones</dd>"));
        assert!(html.contains("<dt>pages</dt><dd>1138</dd>"));
        assert!(html.contains("href=\"/reviews/It\""));
    }

    #[test]
    fn reviews_skip_non_http_links() {
        let html = reviews(
            "/",
            &ReviewPage {
                book_title: "It".to_string(),
                summary: ReviewSummary {
                    num_results: 2,
                    results: vec![
                        json!({ "byline": "A Critic", "url": "https://example.com/r1" }),
                        json!({ "byline": "<script>", "url": "javascript:alert(1)" }),
                    ],
                },
            },
        );
        assert!(html.contains("2 review(s) found"));
        assert!(html.contains("href=\"https://example.com/r1\""));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn not_found_page_escapes_the_id() {
        let html = not_found("/main", "<b>42</b>");
        assert!(html.contains("Book not found"));
        assert!(html.contains("&lt;b&gt;42&lt;/b&gt;"));
        assert!(html.contains("href=\"/main\""));
    }
}
