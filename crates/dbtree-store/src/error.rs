use dbtree_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("document {collection}/{id} not found")]
    Missing { collection: String, id: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by [`crate::ProjectService`].
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProjectError {
    pub fn not_found(id: &str) -> Self {
        ProjectError::NotFound(format!("Project with ID {id} not found"))
    }
}
