use std::sync::Arc;

use async_trait::async_trait;

use crate::contract::model::{NewUser, User, UserId, UserPatch};

/// Port for the domain layer: persistence operations the handlers need.
/// Object-safe and async-friendly via `async_trait`.
///
/// Every method maps to exactly one statement. Absence is an `Ok(None)`,
/// never an error; store faults surface as `anyhow::Error` with context.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// All rows in id order.
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    /// Load a user by id.
    async fn get_by_id(&self, id: UserId) -> anyhow::Result<Option<User>>;
    /// Insert and return the persisted row with its assigned id.
    async fn create(&self, new_user: NewUser) -> anyhow::Result<User>;
    /// Apply the present fields of `patch`; absent fields keep their stored value.
    async fn update(&self, id: UserId, patch: UserPatch) -> anyhow::Result<Option<User>>;
    /// Delete by id and return the row as it was before deletion.
    async fn remove(&self, id: UserId) -> anyhow::Result<Option<User>>;
    /// Round-trip a trivial statement to prove the store answers.
    async fn ping(&self) -> anyhow::Result<()>;
}

/// Handle injected into the router.
pub type SharedUsersRepository = Arc<dyn UsersRepository>;
