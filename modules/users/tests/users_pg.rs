#![cfg(feature = "integration")]

mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use tower::ServiceExt;
use users::api::rest::middleware::HttpOptions;
use users::api::rest::routes::router;
use users::contract::model::UserPatch;
use users::domain::repo::UsersRepository;
use users::infra::storage::migrations::Migrator;
use users::infra::storage::SeaOrmUsersRepository;

#[tokio::test]
async fn users_work_with_postgres() -> Result<()> {
    let dut = common::bring_up_postgres().await?;

    let conn = runtime::db::connect(&dut.url, &runtime::ConnectOpts::default()).await?;
    Migrator::up(&conn, None)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    let repo = SeaOrmUsersRepository::new(conn.clone());

    let created = repo
        .create(common::new_user("Ada", "ada@example.com", 30))
        .await?;
    assert!(created.id > 0);

    let updated = repo
        .update(
            created.id,
            UserPatch {
                age: Some(31),
                ..Default::default()
            },
        )
        .await?
        .expect("row exists");
    assert_eq!(updated.name, "Ada");
    assert_eq!(updated.email, "ada@example.com");
    assert_eq!(updated.age, 31);

    assert_eq!(repo.remove(created.id).await?, Some(updated));
    assert_eq!(repo.get_by_id(created.id).await?, None);
    repo.ping().await?;

    // Same flows through HTTP
    let app = router(Arc::new(SeaOrmUsersRepository::new(conn)), &HttpOptions::default());
    let res = app
        .clone()
        .oneshot(common::json_request(
            "POST",
            "/api/users",
            r#"{"name":"Grace","email":"grace@example.com","age":"45"}"#,
        ))
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let id = common::body_json(res).await["data"]["id"]
        .as_i64()
        .expect("numeric id");

    let res = app
        .clone()
        .oneshot(common::json_request(
            "PUT",
            &format!("/api/users/{id}"),
            r#"{"name":"Grace Hopper"}"#,
        ))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        common::body_json(res).await["data"],
        json!({"id": id, "name": "Grace Hopper", "email": "grace@example.com", "age": 45})
    );

    let res = app.oneshot(common::empty_request("GET", "/health")).await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}
