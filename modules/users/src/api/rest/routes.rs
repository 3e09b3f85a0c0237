use axum::{routing::get, Extension, Router};

use crate::api::rest::handlers;
use crate::api::rest::middleware::{self, HttpOptions};
use crate::domain::repo::SharedUsersRepository;

/// Mount the users resource and the health probe on `router`, injecting the
/// repository as an extension.
pub fn register_routes(router: Router, repo: SharedUsersRepository) -> Router {
    router
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/api/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/health", get(handlers::health))
        .layer(Extension(repo))
}

/// Complete application router: routes plus the middleware stack.
pub fn router(repo: SharedUsersRepository, opts: &HttpOptions) -> Router {
    middleware::apply(register_routes(Router::new(), repo), opts)
}
