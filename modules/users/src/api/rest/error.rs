use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::rest::dto::ErrorEnvelope;
use crate::api::rest::reporter;
use crate::contract::model::UserId;
use crate::domain::validation::FieldErrors;

/// Handler-level failure. Validation and not-found are rendered here;
/// everything unexpected goes to the reporter.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("invalid user id: {0}")]
    InvalidId(FieldErrors),

    #[error("user {0} not found")]
    NotFound(UserId),

    /// The body could not be read (e.g. over the size limit).
    #[error(transparent)]
    Body(#[from] BytesRejection),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => ErrorEnvelope::new(
                StatusCode::BAD_REQUEST,
                "Validation failed",
                errors.into_messages(),
            )
            .into_response(),
            ApiError::InvalidId(errors) => ErrorEnvelope::new(
                StatusCode::BAD_REQUEST,
                "Invalid user ID",
                errors.into_messages(),
            )
            .into_response(),
            ApiError::NotFound(id) => ErrorEnvelope::new(
                StatusCode::NOT_FOUND,
                "User not found",
                vec![format!("User with ID {id} was not found")],
            )
            .into_response(),
            ApiError::Body(rejection) => rejection.into_response(),
            ApiError::Internal(err) => reporter::report(err, false).into_response_or_bare(),
        }
    }
}
