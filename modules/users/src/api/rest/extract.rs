//! Extractors that run the validation rules before a handler body executes.
//!
//! Axum resolves `FromRequestParts` extractors before the single
//! `FromRequest` one, so an invalid id rejects the request before the body is
//! read or validated. A rejection never reaches the repository.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header, request::Parts, HeaderMap},
};
use serde_json::{Map, Value};

use crate::api::rest::error::ApiError;
use crate::contract::model::{NewUser, UserId, UserPatch};
use crate::domain::validation::{
    validate_create, validate_identifier, validate_update, FieldErrors, INVALID_JSON,
};

/// `{id}` path segment that passed the identifier rules.
#[derive(Debug, Clone, Copy)]
pub struct ValidUserId(pub UserId);

/// Body that passed the creation rules.
#[derive(Debug, Clone)]
pub struct ValidCreateUser(pub NewUser);

/// Body that passed the partial-update rules.
#[derive(Debug, Clone)]
pub struct ValidUpdateUser(pub UserPatch);

impl<S> FromRequestParts<S> for ValidUserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let params = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .ok();
        let raw = params.as_ref().and_then(|p| p.get("id")).map(String::as_str);

        validate_identifier(raw).map(ValidUserId).map_err(|errors| {
            tracing::debug!(id = ?raw, %errors, "Rejected user id");
            ApiError::InvalidId(errors)
        })
    }
}

impl<S> FromRequest<S> for ValidCreateUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let raw = json_body(req, state).await?;
        validate_create(&raw).map(ValidCreateUser).map_err(|errors| {
            tracing::debug!(%errors, "Rejected create body");
            ApiError::Validation(errors)
        })
    }
}

impl<S> FromRequest<S> for ValidUpdateUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let raw = json_body(req, state).await?;
        validate_update(&raw).map(ValidUpdateUser).map_err(|errors| {
            tracing::debug!(%errors, "Rejected update body");
            ApiError::Validation(errors)
        })
    }
}

/// Read the body as untyped JSON. A body without a JSON content type is not
/// parsed and reads as `{}`, as does an empty one.
async fn json_body<S>(req: Request, state: &S) -> Result<Value, ApiError>
where
    S: Send + Sync,
{
    if !has_json_content_type(req.headers()) {
        tracing::debug!("Request body is not declared as JSON; treating it as empty");
        return Ok(Value::Object(Map::new()));
    }
    let bytes = Bytes::from_request(req, state).await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(error = %e, "Request body is not JSON");
        ApiError::Validation(FieldErrors::single(INVALID_JSON))
    })
}

/// `application/json`, optionally with parameters, or any `+json` suffix type.
fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let essence = value.split(';').next().unwrap_or_default().trim();
    let Some((kind, subtype)) = essence.split_once('/') else {
        return false;
    };
    kind.eq_ignore_ascii_case("application")
        && (subtype.eq_ignore_ascii_case("json")
            || subtype.to_ascii_lowercase().ends_with("+json"))
}
