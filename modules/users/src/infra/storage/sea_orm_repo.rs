//! SeaORM-backed repository implementation for the domain port.
//!
//! Generic over `C: ConnectionTrait`, so it accepts a pooled
//! `DatabaseConnection` or a transaction. Reads and the insert go through the
//! entity; the partial update and the delete are single raw statements with
//! `RETURNING`.

use anyhow::Context;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbBackend, EntityTrait, NotSet, QueryOrder, Set, Statement,
    Value,
};
use tracing::instrument;

use crate::contract::model::{NewUser, User, UserId, UserPatch};
use crate::domain::repo::UsersRepository;
use crate::infra::storage::entity::{ActiveModel as UserAM, Column, Entity as UserEntity};

const UPDATE_PG: &str = "UPDATE users SET name = COALESCE($1, name), email = COALESCE($2, email), \
     age = COALESCE($3, age) WHERE id = $4 RETURNING id, name, email, age";
const UPDATE_SQLITE: &str = "UPDATE users SET name = COALESCE(?, name), email = COALESCE(?, email), \
     age = COALESCE(?, age) WHERE id = ? RETURNING id, name, email, age";

const DELETE_PG: &str = "DELETE FROM users WHERE id = $1 RETURNING id, name, email, age";
const DELETE_SQLITE: &str = "DELETE FROM users WHERE id = ? RETURNING id, name, email, age";

/// SeaORM repository impl.
/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    fn statement(&self, postgres: &str, sqlite: &str, values: Vec<Value>) -> Statement {
        let backend = self.conn.get_database_backend();
        let sql = match backend {
            DbBackend::Postgres => postgres,
            _ => sqlite,
        };
        Statement::from_sql_and_values(backend, sql, values)
    }
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    #[instrument(name = "users.repo.list", skip(self))]
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let rows = UserEntity::find()
            .order_by_asc(Column::Id)
            .all(&self.conn)
            .await
            .context("list users failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(name = "users.repo.get_by_id", skip(self), fields(user_id = id))]
    async fn get_by_id(&self, id: UserId) -> anyhow::Result<Option<User>> {
        let found = UserEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("get user failed")?;
        Ok(found.map(Into::into))
    }

    #[instrument(name = "users.repo.create", skip(self, new_user))]
    async fn create(&self, new_user: NewUser) -> anyhow::Result<User> {
        let m = UserAM {
            id: NotSet,
            name: Set(new_user.name),
            email: Set(new_user.email),
            age: Set(new_user.age),
        };
        let inserted = m.insert(&self.conn).await.context("create user failed")?;
        Ok(inserted.into())
    }

    #[instrument(name = "users.repo.update", skip(self, patch), fields(user_id = id))]
    async fn update(&self, id: UserId, patch: UserPatch) -> anyhow::Result<Option<User>> {
        let stmt = self.statement(
            UPDATE_PG,
            UPDATE_SQLITE,
            vec![
                Value::from(patch.name),
                Value::from(patch.email),
                Value::from(patch.age),
                Value::from(id),
            ],
        );
        let updated = UserEntity::find()
            .from_raw_sql(stmt)
            .one(&self.conn)
            .await
            .context("update user failed")?;
        Ok(updated.map(Into::into))
    }

    #[instrument(name = "users.repo.remove", skip(self), fields(user_id = id))]
    async fn remove(&self, id: UserId) -> anyhow::Result<Option<User>> {
        let stmt = self.statement(DELETE_PG, DELETE_SQLITE, vec![Value::from(id)]);
        let removed = UserEntity::find()
            .from_raw_sql(stmt)
            .one(&self.conn)
            .await
            .context("delete user failed")?;
        Ok(removed.map(Into::into))
    }

    #[instrument(name = "users.repo.ping", skip(self))]
    async fn ping(&self) -> anyhow::Result<()> {
        let stmt = Statement::from_string(self.conn.get_database_backend(), "SELECT 1");
        self.conn
            .query_one(stmt)
            .await
            .context("database ping failed")?;
        Ok(())
    }
}
