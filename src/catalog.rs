//! Catalog store
//!
//! Explicit queries over a borrowed [`libsql::Connection`]. Every mutation runs
//! in its own `BEGIN IMMEDIATE` transaction and rolls back on any error, so a
//! failed request never leaves a partial write behind.
//!
//! ```rust,ignore
//! let conn = db.connect().await?;
//! let catalog = Catalog::new(&conn);
//! let books = catalog.list_books(&ListingQuery::default()).await?;
//! ```

use chrono::NaiveDate;
use libsql::Connection;

use crate::error::{CatalogError, Result};
use crate::model::{Author, AuthorDeletion, Book, BookDeletion, BookListing, ListingQuery, NewAuthor, NewBook};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct Catalog<'a> {
    conn: &'a Connection,
}

impl<'a> Catalog<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub async fn list_books(&self, query: &ListingQuery) -> Result<Vec<BookListing>> {
        let mut sql = String::from(
            r#"
SELECT
    books.id,
    books.isbn,
    books.title,
    books.publication_year,
    books.author_id,
    authors.name
FROM books
JOIN authors ON authors.id = books.author_id
"#,
        );
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(search) = &query.search {
            sql.push_str("WHERE books.title_folded LIKE ? ESCAPE '\\' OR authors.name_folded LIKE ? ESCAPE '\\'\n");
            let pattern = format!("%{}%", escape_like(&fold_case(search)));
            params.push(pattern.clone().into());
            params.push(pattern.into());
        }

        sql.push_str("ORDER BY ");
        sql.push_str(query.sort.order_clause());

        let mut rows = self.conn.query(&sql, params).await?;
        let mut books = Vec::new();

        while let Some(row) = rows.next().await? {
            let book = row_to_book(&row)?;
            let author_name: String = row.get(5)?;
            books.push(BookListing::new(book, author_name));
        }

        Ok(books)
    }

    pub async fn list_authors(&self) -> Result<Vec<Author>> {
        let query = r#"
            SELECT id, name, birth_date, date_of_death
            FROM authors
            ORDER BY name COLLATE NOCASE ASC, id ASC
        "#;

        let mut rows = self.conn.query(query, ()).await?;
        let mut authors = Vec::new();

        while let Some(row) = rows.next().await? {
            authors.push(row_to_author(&row)?);
        }

        Ok(authors)
    }

    pub async fn get_author(&self, id: i64) -> Result<Option<Author>> {
        get_author(self.conn, id).await
    }

    pub async fn get_book(&self, id: i64) -> Result<Option<Book>> {
        get_book(self.conn, id).await
    }

    pub async fn create_author(&self, input: NewAuthor) -> Result<Author> {
        self.begin().await?;
        let result = create_author_internal(self.conn, &input).await;
        self.finish(result).await
    }

    pub async fn create_book(&self, input: NewBook) -> Result<Book> {
        self.begin().await?;
        let result = create_book_internal(self.conn, &input).await;
        self.finish(result).await
    }

    /// Deletes a book, and its author too when that was the author's last book.
    pub async fn delete_book(&self, id: i64) -> Result<BookDeletion> {
        self.begin().await?;
        let result = delete_book_internal(self.conn, id).await;
        self.finish(result).await
    }

    /// Deletes an author together with all of their books.
    pub async fn delete_author(&self, id: i64) -> Result<AuthorDeletion> {
        self.begin().await?;
        let result = delete_author_internal(self.conn, id).await;
        self.finish(result).await
    }

    async fn begin(&self) -> Result<()> {
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        Ok(())
    }

    async fn finish<T>(&self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                if let Err(e) = self.conn.execute("COMMIT", ()).await {
                    if let Err(rollback_err) = self.conn.execute("ROLLBACK", ()).await {
                        tracing::error!(error = %rollback_err, "rollback after failed commit failed");
                    }
                    return Err(e.into());
                }
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.conn.execute("ROLLBACK", ()).await {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

async fn get_author(conn: &Connection, id: i64) -> Result<Option<Author>> {
    let query = r#"
        SELECT id, name, birth_date, date_of_death
        FROM authors WHERE id = ?
    "#;

    let mut rows = conn.query(query, libsql::params![id]).await?;

    if let Some(row) = rows.next().await? {
        Ok(Some(row_to_author(&row)?))
    } else {
        Ok(None)
    }
}

async fn get_book(conn: &Connection, id: i64) -> Result<Option<Book>> {
    let query = r#"
        SELECT id, isbn, title, publication_year, author_id
        FROM books WHERE id = ?
    "#;

    let mut rows = conn.query(query, libsql::params![id]).await?;

    if let Some(row) = rows.next().await? {
        Ok(Some(row_to_book(&row)?))
    } else {
        Ok(None)
    }
}

async fn create_author_internal(conn: &Connection, input: &NewAuthor) -> Result<Author> {
    let query = r#"
        INSERT INTO authors (name, name_folded, birth_date, date_of_death)
        VALUES (?, ?, ?, ?)
        RETURNING id, name, birth_date, date_of_death
    "#;

    let birth_date = input.birth_date.format(DATE_FORMAT).to_string();
    let date_of_death = input.date_of_death.map(|d| d.format(DATE_FORMAT).to_string());

    let mut rows = conn
        .query(query, libsql::params![input.name.as_str(), fold_case(&input.name), birth_date, date_of_death])
        .await?;

    if let Some(row) = rows.next().await? {
        Ok(row_to_author(&row)?)
    } else {
        Err(CatalogError::InvalidRow("insert into authors returned no row".into()))
    }
}

async fn create_book_internal(conn: &Connection, input: &NewBook) -> Result<Book> {
    if get_author(conn, input.author_id).await?.is_none() {
        return Err(CatalogError::Reference {
            author_id: input.author_id,
        });
    }

    let query = r#"
        INSERT INTO books (isbn, title, title_folded, publication_year, author_id)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, isbn, title, publication_year, author_id
    "#;

    let result = conn
        .query(
            query,
            libsql::params![
                input.isbn.as_deref(),
                input.title.as_str(),
                fold_case(&input.title),
                input.publication_year,
                input.author_id
            ],
        )
        .await;

    let mut rows = match result {
        Ok(rows) => rows,
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(CatalogError::Reference {
                author_id: input.author_id,
            });
        }
        Err(e) => return Err(e.into()),
    };

    match rows.next().await {
        Ok(Some(row)) => Ok(row_to_book(&row)?),
        Ok(None) => Err(CatalogError::InvalidRow("insert into books returned no row".into())),
        Err(e) if is_foreign_key_violation(&e) => Err(CatalogError::Reference {
            author_id: input.author_id,
        }),
        Err(e) => Err(e.into()),
    }
}

async fn delete_book_internal(conn: &Connection, id: i64) -> Result<BookDeletion> {
    let book = get_book(conn, id)
        .await?
        .ok_or(CatalogError::NotFound { entity: "book", id })?;

    conn.execute("DELETE FROM books WHERE id = ?", libsql::params![id])
        .await?;

    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM books WHERE author_id = ?",
            libsql::params![book.author_id],
        )
        .await?;
    let remaining: i64 = match rows.next().await? {
        Some(row) => row.get(0)?,
        None => 0,
    };

    let author_removed = if remaining == 0 {
        conn.execute("DELETE FROM authors WHERE id = ?", libsql::params![book.author_id])
            .await?;
        Some(book.author_id)
    } else {
        None
    };

    Ok(BookDeletion {
        book_id: id,
        author_removed,
    })
}

async fn delete_author_internal(conn: &Connection, id: i64) -> Result<AuthorDeletion> {
    if get_author(conn, id).await?.is_none() {
        return Err(CatalogError::NotFound { entity: "author", id });
    }

    let books_removed = conn
        .execute("DELETE FROM books WHERE author_id = ?", libsql::params![id])
        .await?;
    conn.execute("DELETE FROM authors WHERE id = ?", libsql::params![id])
        .await?;

    Ok(AuthorDeletion {
        author_id: id,
        books_removed,
    })
}

/// Search columns hold this folding so matching is case-insensitive beyond ASCII.
pub(crate) fn fold_case(s: &str) -> String {
    s.to_lowercase()
}

fn is_foreign_key_violation(e: &libsql::Error) -> bool {
    e.to_string().contains("FOREIGN KEY constraint failed")
}

/// Escapes `LIKE` wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn parse_stored_date(column: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| CatalogError::InvalidRow(format!("{column} '{value}': {e}")))
}

fn row_to_author(row: &libsql::Row) -> Result<Author> {
    let birth_date: String = row.get(2)?;
    let date_of_death: Option<String> = row.get(3)?;

    Ok(Author {
        id: row.get(0)?,
        name: row.get(1)?,
        birth_date: parse_stored_date("birth_date", &birth_date)?,
        date_of_death: date_of_death
            .as_deref()
            .map(|d| parse_stored_date("date_of_death", d))
            .transpose()?,
    })
}

fn row_to_book(row: &libsql::Row) -> Result<Book> {
    let isbn: Option<String> = row.get(1)?;

    Ok(Book {
        id: row.get(0)?,
        isbn: isbn.filter(|s| !s.is_empty()),
        title: row.get(2)?,
        publication_year: row.get(3)?,
        author_id: row.get(4)?,
    })
}
