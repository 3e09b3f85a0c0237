use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use tracing::{error, info};

use crate::api::rest::dto::{Envelope, ErrorEnvelope, HealthDto, UserDto};
use crate::api::rest::error::ApiError;
use crate::api::rest::extract::{ValidCreateUser, ValidUpdateUser, ValidUserId};
use crate::domain::repo::SharedUsersRepository;

/// List all users
pub async fn list_users(
    Extension(repo): Extension<SharedUsersRepository>,
) -> Result<Envelope<Vec<UserDto>>, ApiError> {
    info!("Listing users");

    match repo.list().await {
        Ok(users) => Ok(Envelope::ok(
            "Users Retrieved",
            users.into_iter().map(UserDto::from).collect(),
        )),
        Err(e) => Err(ApiError::Internal(e))
    }
}

/// Get a specific user by ID
pub async fn get_user(
    Extension(repo): Extension<SharedUsersRepository>,
    ValidUserId(id): ValidUserId,
) -> Result<Envelope<UserDto>, ApiError> {
    info!("Getting user with id: {}", id);

    match repo.get_by_id(id).await {
        Ok(Some(user)) => Ok(Envelope::ok("User Retrieved", user.into())),
        Ok(None) => Err(ApiError::NotFound(id)),
        Err(e) => Err(ApiError::Internal(e))
    }
}

/// Create a new user
pub async fn create_user(
    Extension(repo): Extension<SharedUsersRepository>,
    ValidCreateUser(new_user): ValidCreateUser,
) -> Result<Envelope<UserDto>, ApiError> {
    info!("Creating user: {:?}", new_user);

    match repo.create(new_user).await {
        Ok(user) => Ok(Envelope::created("User Created", user.into())),
        Err(e) => Err(ApiError::Internal(e))
    }
}

/// Update an existing user; fields missing from the body are left as stored
pub async fn update_user(
    Extension(repo): Extension<SharedUsersRepository>,
    ValidUserId(id): ValidUserId,
    ValidUpdateUser(patch): ValidUpdateUser,
) -> Result<Envelope<UserDto>, ApiError> {
    info!("Updating user {} with: {:?}", id, patch);

    match repo.update(id, patch).await {
        Ok(Some(user)) => Ok(Envelope::ok("User Updated", user.into())),
        Ok(None) => Err(ApiError::NotFound(id)),
        Err(e) => Err(ApiError::Internal(e))
    }
}

/// Delete a user by ID, answering with the row as it was
pub async fn delete_user(
    Extension(repo): Extension<SharedUsersRepository>,
    ValidUserId(id): ValidUserId,
) -> Result<Envelope<UserDto>, ApiError> {
    info!("Deleting user: {}", id);

    match repo.remove(id).await {
        Ok(Some(user)) => Ok(Envelope::ok("User Deleted", user.into())),
        Ok(None) => Err(ApiError::NotFound(id)),
        Err(e) => Err(ApiError::Internal(e))
    }
}

/// Store connectivity probe
pub async fn health(Extension(repo): Extension<SharedUsersRepository>) -> Response {
    match repo.ping().await {
        Ok(()) => Envelope::ok(
            "Healthy",
            HealthDto {
                database: "up".to_string(),
            },
        )
        .into_response(),
        Err(e) => {
            error!("Health check failed: {:#}", e);
            ErrorEnvelope::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Unhealthy",
                vec![format!("Database is unreachable: {e}")],
            )
            .into_response()
        }
    }
}
