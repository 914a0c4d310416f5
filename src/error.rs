use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("ValidationError: {0}")]
    Validation(String),
    #[error("ReferenceError: author {author_id} does not exist")]
    Reference { author_id: i64 },
    #[error("NotFoundError: {entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("DatabaseError")]
    Database(#[from] libsql::Error),
    #[error("InvalidRow: {0}")]
    InvalidRow(String),
}

impl CatalogError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CatalogError::Validation(msg.into())
    }

    /// Message shown on a re-rendered form.
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::Validation(msg) => msg.clone(),
            CatalogError::Reference { author_id } => format!("No author with id {author_id} exists"),
            CatalogError::NotFound { entity, id } => format!("No {entity} with id {id} exists"),
            _ => "Something went wrong, please try again".to_string(),
        }
    }
}
