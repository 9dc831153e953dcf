//! Common API types and utilities

use axum::extract::rejection::JsonRejection;
use axum::Json;
use dw_common::looks_like_id;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::PlatformError;

/// Standard API error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Created response with ID
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: String,
}

impl CreatedResponse {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

pub type ApiResult<T> = Result<Json<T>, PlatformError>;

/// Reject path IDs that cannot be generated IDs before touching storage.
pub fn require_id(id: &str) -> Result<&str, PlatformError> {
    if looks_like_id(id) {
        Ok(id)
    } else {
        Err(PlatformError::bad_request(format!("'{}' is not a valid id", id)))
    }
}

/// Unwrap a JSON body, turning any extractor rejection into a 400.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, PlatformError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| PlatformError::bad_request(rejection.body_text()))
}
