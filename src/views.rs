use anyhow::Result;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use handlebars::Handlebars;
use serde::Serialize;

use crate::api::{AuthorForm, BookForm};
use crate::model::{Author, BookListing, SortBy};

const PARTIALS: &[(&str, &str)] = &[("layout", include_str!("../templates/layout.hbs"))];

const TEMPLATES: &[(&str, &str)] = &[
    ("home", include_str!("../templates/home.hbs")),
    ("add_author", include_str!("../templates/add_author.hbs")),
    ("add_book", include_str!("../templates/add_book.hbs")),
    ("message", include_str!("../templates/message.hbs")),
];

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub page_title: &'static str,
    pub books: Vec<BookListing>,
    pub search_query: String,
    pub sort_by: &'static str,
    pub sorted_by_title: bool,
    pub sorted_by_author: bool,
}

impl HomePage {
    pub fn new(books: Vec<BookListing>, sort: SortBy, search: Option<String>) -> Self {
        HomePage {
            page_title: "Library",
            books,
            search_query: search.unwrap_or_default(),
            sort_by: sort.as_str(),
            sorted_by_title: sort == SortBy::Title,
            sorted_by_author: sort == SortBy::Author,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorFormPage {
    pub page_title: &'static str,
    pub form: AuthorForm,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl AuthorFormPage {
    pub fn blank() -> Self {
        Self::with_form(AuthorForm::default())
    }

    pub fn with_form(form: AuthorForm) -> Self {
        AuthorFormPage {
            page_title: "Add author",
            form,
            error: None,
            message: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorOption {
    pub id: i64,
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct BookFormPage {
    pub page_title: &'static str,
    pub form: BookForm,
    pub authors: Vec<AuthorOption>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl BookFormPage {
    pub fn new(form: BookForm, authors: Vec<Author>) -> Self {
        let selected = form.selected_author();
        let authors = authors
            .into_iter()
            .map(|a| AuthorOption {
                selected: Some(a.id) == selected,
                id: a.id,
                name: a.name,
            })
            .collect();

        BookFormPage {
            page_title: "Add book",
            form,
            authors,
            error: None,
            message: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessagePage {
    pub page_title: &'static str,
    pub heading: String,
    pub message: String,
}

pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();

        for (name, source) in PARTIALS {
            registry
                .register_partial(name, *source)
                .map_err(|e| anyhow::anyhow!("failed to register partial {name}: {e}"))?;
        }

        for (name, source) in TEMPLATES {
            registry
                .register_template_string(name, *source)
                .map_err(|e| anyhow::anyhow!("failed to register template {name}: {e}"))?;
        }

        Ok(Views { registry })
    }

    pub fn render_string<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        Ok(self.registry.render(name, data)?)
    }

    pub fn render<T: Serialize>(&self, status: StatusCode, name: &str, data: &T) -> Response {
        match self.render_string(name, data) {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                tracing::error!(template = name, error = %e, "failed to render template");
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page").into_response()
            }
        }
    }

    pub fn message(&self, status: StatusCode, heading: &str, message: &str) -> Response {
        self.render(
            status,
            "message",
            &MessagePage {
                page_title: "Library",
                heading: heading.to_string(),
                message: message.to_string(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Book;

    fn listing(title: &str, isbn: Option<&str>, author: &str) -> BookListing {
        BookListing::new(
            Book {
                id: 3,
                isbn: isbn.map(str::to_string),
                title: title.into(),
                publication_year: 1937,
                author_id: 9,
            },
            author.into(),
        )
    }

    #[test]
    fn test_home_renders_books_and_escapes_html() {
        let views = Views::new().unwrap();
        let page = HomePage::new(
            vec![
                listing("The Hobbit", Some("9780261103573"), "J.R.R. Tolkien"),
                listing("<script>alert(1)</script>", None, "Mallory"),
            ],
            SortBy::Author,
            Some("o".into()),
        );

        let html = views.render_string("home", &page).unwrap();
        assert!(html.contains("The Hobbit"));
        assert!(html.contains("https://covers.openlibrary.org/b/isbn/9780261103573-L.jpg"));
        assert!(html.contains("/book/3/delete"));
        assert!(html.contains("/author/9/delete"));
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_home_renders_empty_state() {
        let views = Views::new().unwrap();
        let html = views
            .render_string("home", &HomePage::new(vec![], SortBy::Title, None))
            .unwrap();
        assert!(html.contains("No books found"));
    }

    #[test]
    fn test_book_form_marks_selected_author() {
        let views = Views::new().unwrap();
        let authors = vec![
            Author {
                id: 1,
                name: "Jane Doe".into(),
                birth_date: chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
                date_of_death: None,
            },
            Author {
                id: 2,
                name: "John Roe".into(),
                birth_date: chrono::NaiveDate::from_ymd_opt(1971, 1, 1).unwrap(),
                date_of_death: None,
            },
        ];
        let form = BookForm {
            author_id: "2".into(),
            ..BookForm::default()
        };
        let mut page = BookFormPage::new(form, authors);
        page.error = Some("publication_year is required".into());

        let html = views.render_string("add_book", &page).unwrap();
        assert!(html.contains(r#"<option value="2" selected>John Roe</option>"#));
        assert!(html.contains(r#"<option value="1">Jane Doe</option>"#));
        assert!(html.contains("publication_year is required"));
    }

    #[test]
    fn test_author_form_success_message() {
        let views = Views::new().unwrap();
        let mut page = AuthorFormPage::blank();
        page.message = Some("Author Jane Doe added".into());
        let html = views.render_string("add_author", &page).unwrap();
        assert!(html.contains("Author Jane Doe added"));
        assert!(html.contains(r#"name="date_of_death""#));
    }
}
