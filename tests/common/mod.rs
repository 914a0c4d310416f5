//! Shared helpers for HTTP tests: a router over a real SQLite file in a temp dir.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use bibliotheca::db::Database;
use bibliotheca::handler::AppState;
use bibliotheca::routes::routes;
use bibliotheca::views::Views;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestApp {
    pub router: Router,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let db = Database::open(&temp_dir.path().join("library.sqlite"))
            .await
            .expect("failed to open database");
        let views = Views::new().expect("failed to load templates");
        let router = routes().with_state(AppState::new(db, views));

        Self {
            router,
            _temp_dir: temp_dir,
        }
    }

    pub async fn get(&self, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_form(&self, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn add_author(&self, name: &str) {
        let body = format!("name={}&birthdate=1970-01-01&date_of_death=", name.replace(' ', "+"));
        let response = self.post_form("/add_author", &body).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    pub async fn add_book(&self, title: &str, isbn: &str, author_id: i64) {
        let body = format!(
            "title={}&isbn={}&publication_year=2020&author_id={}",
            title.replace(' ', "+"),
            isbn,
            author_id
        );
        let response = self.post_form("/add_book", &body).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
