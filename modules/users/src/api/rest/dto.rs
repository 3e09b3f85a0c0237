use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::contract::model::User;

/// REST DTO for user representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub age: i32,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            age: user.age,
        }
    }
}

/// Success envelope: `{status, message, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            data,
        }
    }
}

/// Rejection envelope for validation, not-found and health failures:
/// `{status, message, errors}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: u16,
    pub message: String,
    pub errors: Vec<String>,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            errors,
        }
    }
}

/// Unhandled fault envelope: `{status, message, error}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultEnvelope {
    pub status: u16,
    pub message: String,
    pub error: String,
}

/// Health payload carried in `data` of a healthy response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDto {
    pub database: String,
}

fn status_of(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (status_of(self.status), Json(self)).into_response()
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        (status_of(self.status), Json(self)).into_response()
    }
}

impl IntoResponse for FaultEnvelope {
    fn into_response(self) -> Response {
        (status_of(self.status), Json(self)).into_response()
    }
}
