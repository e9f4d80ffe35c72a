use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/profile", profile_routes())
        .nest("/news", news_routes())
        .nest("/public", public_routes())
        .nest("/categories", category_routes())
        .nest("/admin", admin_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
}

fn profile_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::profile::get_profile).patch(handlers::profile::update_profile),
        )
        .route(
            "/avatar",
            post(handlers::profile::upload_avatar)
                .delete(handlers::profile::delete_avatar)
                .layer(handlers::profile::avatar_body_limit()),
        )
}

fn news_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::news::list_news).post(handlers::news::create_news),
        )
        .route(
            "/{id}",
            get(handlers::news::get_news)
                .post(handlers::news::update_news)
                .delete(handlers::news::delete_news),
        )
        .route(
            "/{id}/toggle-status",
            patch(handlers::news::toggle_status),
        )
        .layer(handlers::news::news_body_limit())
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/news", get(handlers::public_news::list_public_news))
        .route("/news/{id}", get(handlers::public_news::get_public_news))
        .route("/categories", get(handlers::category::list_public_categories))
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::category::list_categories).post(handlers::category::create_category),
        )
        .route(
            "/{id}",
            patch(handlers::category::update_category).delete(handlers::category::delete_category),
        )
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::admin::list_users))
        .route("/users/{id}", get(handlers::admin::get_user))
        .route("/users/{id}/role", patch(handlers::admin::update_user_role))
}
