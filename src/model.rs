use chrono::NaiveDate;
use serde::Serialize;

pub const OPEN_LIBRARY_COVER_URL: &str = "https://covers.openlibrary.org/b/isbn";
pub const DEFAULT_COVER_PATH: &str = "/static/images/default-cover.svg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub birth_date: NaiveDate,
    pub date_of_death: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub id: i64,
    pub isbn: Option<String>,
    pub title: String,
    pub publication_year: i32,
    pub author_id: i64,
}

impl Book {
    pub fn cover_url(&self) -> String {
        cover_url(self.isbn.as_deref())
    }
}

/// A book joined with its author, as shown in the listing.
#[derive(Debug, Clone, Serialize)]
pub struct BookListing {
    #[serde(flatten)]
    pub book: Book,
    pub author_name: String,
    pub cover_url: String,
}

impl BookListing {
    pub fn new(book: Book, author_name: String) -> Self {
        let cover_url = book.cover_url();
        Self {
            book,
            author_name,
            cover_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub name: String,
    pub birth_date: NaiveDate,
    pub date_of_death: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub isbn: Option<String>,
    pub publication_year: i32,
    pub author_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Title,
    Author,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Title => "title",
            SortBy::Author => "author",
        }
    }

    /// Anything other than `author` sorts by title.
    pub fn from_param(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("author") => SortBy::Author,
            _ => SortBy::Title,
        }
    }

    pub(crate) fn order_clause(&self) -> &'static str {
        match self {
            SortBy::Title => "books.title COLLATE NOCASE ASC, books.id ASC",
            SortBy::Author => "authors.name COLLATE NOCASE ASC, books.id ASC",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub sort: SortBy,
    pub search: Option<String>,
}

/// Outcome of deleting a book; `author_removed` is set when the author lost their last book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDeletion {
    pub book_id: i64,
    pub author_removed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorDeletion {
    pub author_id: i64,
    pub books_removed: u64,
}

pub fn cover_url(isbn: Option<&str>) -> String {
    match isbn.map(str::trim) {
        Some(isbn) if !isbn.is_empty() => format!("{}/{}-L.jpg", OPEN_LIBRARY_COVER_URL, isbn),
        _ => DEFAULT_COVER_PATH.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_url() {
        assert_eq!(
            cover_url(Some("9780261103573")),
            "https://covers.openlibrary.org/b/isbn/9780261103573-L.jpg"
        );
        assert_eq!(cover_url(Some("")), DEFAULT_COVER_PATH);
        assert_eq!(cover_url(Some("   ")), DEFAULT_COVER_PATH);
        assert_eq!(cover_url(None), DEFAULT_COVER_PATH);
    }

    #[test]
    fn test_listing_carries_cover_url() {
        let book = Book {
            id: 1,
            isbn: None,
            title: "Example".into(),
            publication_year: 2020,
            author_id: 1,
        };
        let listing = BookListing::new(book, "Jane Doe".into());
        assert_eq!(listing.cover_url, DEFAULT_COVER_PATH);

        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["title"], "Example");
        assert_eq!(json["author_name"], "Jane Doe");
    }

    #[test]
    fn test_sort_by_from_param() {
        assert_eq!(SortBy::from_param(None), SortBy::Title);
        assert_eq!(SortBy::from_param(Some("title")), SortBy::Title);
        assert_eq!(SortBy::from_param(Some("author")), SortBy::Author);
        assert_eq!(SortBy::from_param(Some("Author")), SortBy::Author);
        assert_eq!(SortBy::from_param(Some("year")), SortBy::Title);
        assert_eq!(SortBy::from_param(Some("")), SortBy::Title);
    }
}
