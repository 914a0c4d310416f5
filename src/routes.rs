use axum::{
    Router,
    routing::{get, post},
};

use crate::assets::serve_static;
use crate::handler::{self, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list_books))
        .route("/health", get(handler::healthcheck))
        .route("/add_author", get(handler::show_author_form).post(handler::add_author))
        .route("/add_book", get(handler::show_book_form).post(handler::add_book))
        .route("/book/:id/delete", post(handler::delete_book))
        .route("/author/:id/delete", post(handler::delete_author))
        .route("/static/*path", get(serve_static))
        .fallback(handler::fallback)
}
