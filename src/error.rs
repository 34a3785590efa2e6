use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::models::itinerary::ValidationError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{error}: {message}")]
    Internal { error: String, message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(error: impl Into<String>, message: impl ToString) -> Self {
        ApiError::Internal {
            error: error.into(),
            message: message.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::BadRequest(error) | ApiError::NotFound(error) => json!({ "error": error }),
            ApiError::Internal { error, message } => json!({ "error": error, "message": message }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Failure of a single upstream provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{0} does not support this operation")]
    Unsupported(&'static str),

    #[error("{0}")]
    NotFound(String),

    /// The request itself cannot be served by this provider (e.g. routing
    /// between free-text places on a coordinates-only router).
    #[error("{0}")]
    InvalidInput(String),

    #[error("{provider} returned {status}: {message}")]
    Status {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Maps an exhausted chain to the API error the client sees.
    pub fn into_api(self, summary: &str, not_found: &str) -> ApiError {
        match self {
            ProviderError::NotFound(_) => ApiError::not_found(not_found),
            ProviderError::InvalidInput(message) => ApiError::bad_request(message),
            other => ApiError::internal(summary, other),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] bson::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] bson::de::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}
