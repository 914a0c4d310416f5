use std::sync::Arc;

use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use libsql::Connection;
use tracing::info;

use crate::api::{AuthorForm, BookForm, ListParams};
use crate::catalog::Catalog;
use crate::db::Database;
use crate::error::CatalogError;
use crate::unpack_error;
use crate::views::{AuthorFormPage, BookFormPage, HomePage, Views};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub views: Arc<Views>,
}

impl AppState {
    pub fn new(db: Database, views: Views) -> Self {
        AppState {
            db: Arc::new(db),
            views: Arc::new(views),
        }
    }

    async fn connect(&self) -> Result<Connection, Response> {
        self.db.connect().await.map_err(|e| {
            tracing::error!(error = %unpack_error(&e), "failed to open database connection");
            self.server_error()
        })
    }

    fn server_error(&self) -> Response {
        self.views.message(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong",
            "The library could not complete your request. Please try again.",
        )
    }

    fn not_found(&self, msg: &str) -> Response {
        self.views.message(StatusCode::NOT_FOUND, "Not found", msg)
    }
}

pub async fn healthcheck(State(state): State<AppState>) -> Response {
    info!("got healthcheck request");
    match state.db.ping().await {
        Ok(_) => (StatusCode::OK, "ok").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "healthcheck failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable").into_response()
        }
    }
}

pub async fn list_books(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let query = params.into_listing_query();
    let conn = match state.connect().await {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match Catalog::new(&conn).list_books(&query).await {
        Ok(books) => {
            info!(count = books.len(), sort_by = query.sort.as_str(), search = ?query.search, "listed books");
            state.views.render(
                StatusCode::OK,
                "home",
                &HomePage::new(books, query.sort, query.search),
            )
        }
        Err(e) => {
            tracing::error!(error = %unpack_error(&e), "failed to list books");
            state.server_error()
        }
    }
}

pub async fn show_author_form(State(state): State<AppState>) -> Response {
    state
        .views
        .render(StatusCode::OK, "add_author", &AuthorFormPage::blank())
}

pub async fn add_author(State(state): State<AppState>, Form(form): Form<AuthorForm>) -> Response {
    let input = match form.validate() {
        Ok(input) => input,
        Err(e) => {
            info!(error = %e, "rejected author form");
            let mut page = AuthorFormPage::with_form(form);
            page.error = Some(e.user_message());
            return state.views.render(StatusCode::UNPROCESSABLE_ENTITY, "add_author", &page);
        }
    };

    let conn = match state.connect().await {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match Catalog::new(&conn).create_author(input).await {
        Ok(author) => {
            info!(author_id = author.id, "created author");
            let mut page = AuthorFormPage::blank();
            page.message = Some(format!("Author {} added", author.name));
            state.views.render(StatusCode::OK, "add_author", &page)
        }
        Err(e) => {
            tracing::error!(error = %unpack_error(&e), "failed to create author");
            state.server_error()
        }
    }
}

pub async fn show_book_form(State(state): State<AppState>) -> Response {
    render_book_form(&state, StatusCode::OK, BookForm::default(), None, None).await
}

pub async fn add_book(State(state): State<AppState>, Form(form): Form<BookForm>) -> Response {
    let input = match form.validate() {
        Ok(input) => input,
        Err(e) => {
            info!(error = %e, "rejected book form");
            return render_book_form(&state, StatusCode::UNPROCESSABLE_ENTITY, form, Some(e.user_message()), None)
                .await;
        }
    };

    let result = {
        let conn = match state.connect().await {
            Ok(conn) => conn,
            Err(response) => return response,
        };
        Catalog::new(&conn).create_book(input).await
    };

    match result {
        Ok(book) => {
            info!(book_id = book.id, author_id = book.author_id, "created book");
            let message = format!("Book {} added", book.title);
            render_book_form(&state, StatusCode::OK, BookForm::default(), None, Some(message)).await
        }
        Err(e @ CatalogError::Reference { .. }) => {
            info!(error = %e, "rejected book for unknown author");
            render_book_form(&state, StatusCode::UNPROCESSABLE_ENTITY, form, Some(e.user_message()), None).await
        }
        Err(e) => {
            tracing::error!(error = %unpack_error(&e), "failed to create book");
            state.server_error()
        }
    }
}

async fn render_book_form(
    state: &AppState,
    status: StatusCode,
    form: BookForm,
    error: Option<String>,
    message: Option<String>,
) -> Response {
    let conn = match state.connect().await {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match Catalog::new(&conn).list_authors().await {
        Ok(authors) => {
            let mut page = BookFormPage::new(form, authors);
            page.error = error;
            page.message = message;
            state.views.render(status, "add_book", &page)
        }
        Err(e) => {
            tracing::error!(error = %unpack_error(&e), "failed to list authors");
            state.server_error()
        }
    }
}

pub async fn delete_book(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<i64>() else {
        info!(book_id = %id, "book to delete has a malformed id");
        return state.not_found(&format!("No book with id {id} exists"));
    };

    let conn = match state.connect().await {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match Catalog::new(&conn).delete_book(id).await {
        Ok(deletion) => {
            info!(book_id = deletion.book_id, author_removed = ?deletion.author_removed, "deleted book");
            Redirect::to("/").into_response()
        }
        Err(e @ CatalogError::NotFound { .. }) => {
            info!(error = %e, "book to delete not found");
            state.not_found(&e.user_message())
        }
        Err(e) => {
            tracing::error!(error = %unpack_error(&e), book_id = id, "failed to delete book");
            state.server_error()
        }
    }
}

pub async fn delete_author(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<i64>() else {
        info!(author_id = %id, "author to delete has a malformed id");
        return state.not_found(&format!("No author with id {id} exists"));
    };

    let conn = match state.connect().await {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match Catalog::new(&conn).delete_author(id).await {
        Ok(deletion) => {
            info!(author_id = deletion.author_id, books_removed = deletion.books_removed, "deleted author");
            Redirect::to("/").into_response()
        }
        Err(e @ CatalogError::NotFound { .. }) => {
            info!(error = %e, "author to delete not found");
            state.not_found(&e.user_message())
        }
        Err(e) => {
            tracing::error!(error = %unpack_error(&e), author_id = id, "failed to delete author");
            state.server_error()
        }
    }
}

pub async fn fallback(State(state): State<AppState>) -> Response {
    state.not_found("There is nothing at this address.")
}
