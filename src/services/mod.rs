pub mod exam_results;
pub mod prerequisites;
pub mod recommendation;
pub mod user_topics;

use thiserror::Error;

use crate::repository::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {message}")]
    Validation { message: String, fields: Vec<String> },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
    #[error("recommendations unavailable: {0}")]
    RecommendationUnavailable(#[source] StoreError),
}

impl ServiceError {
    pub fn invalid_fields(message: impl Into<String>, fields: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields,
        }
    }
}
