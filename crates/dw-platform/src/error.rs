//! Platform Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dw_common::StoreError;
use thiserror::Error;
use tracing::error;

use crate::aggregator::AggregatorError;
use crate::api::common::ApiError;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("No {collection} found")]
    Empty { collection: String },

    /// Malformed request: unparseable body, bad path segment
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Well-formed request with unacceptable content
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] AggregatorError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn empty(collection: impl Into<String>) -> Self {
        Self::Empty {
            collection: collection.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } | Self::Empty { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } | Self::Json(_) => StatusCode::BAD_REQUEST,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store(StoreError::Protected(_)) => StatusCode::FORBIDDEN,
            Self::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } | Self::Empty { .. } => "NOT_FOUND",
            Self::BadRequest { .. } | Self::Json(_) => "BAD_REQUEST",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Store(StoreError::Protected(_)) => "FORBIDDEN",
            Self::Store(StoreError::Duplicate(_)) => "CONFLICT",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Store(_) => "STORAGE_ERROR",
        }
    }
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ApiError {
            error: self.code().to_string(),
            message: self.to_string(),
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
