pub mod blocks;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Newsroom API",
        version = "1.0.0",
        description = "API for the Newsroom publishing backend"
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::profile::get_profile,
        handlers::profile::update_profile,
        handlers::profile::upload_avatar,
        handlers::profile::delete_avatar,
        handlers::news::list_news,
        handlers::news::create_news,
        handlers::news::get_news,
        handlers::news::update_news,
        handlers::news::toggle_status,
        handlers::news::delete_news,
        handlers::public_news::list_public_news,
        handlers::public_news::get_public_news,
        handlers::category::list_categories,
        handlers::category::list_public_categories,
        handlers::category::create_category,
        handlers::category::update_category,
        handlers::category::delete_category,
        handlers::admin::list_users,
        handlers::admin::get_user,
        handlers::admin::update_user_role,
        handlers::assets::serve_blob,
    ),
    tags(
        (name = "Auth", description = "Authentication and registration"),
        (name = "Profile", description = "Own profile and avatar management"),
        (name = "News", description = "Authoring news articles and content blocks"),
        (name = "Public", description = "Unauthenticated feed and assets"),
        (name = "Categories", description = "News taxonomy management"),
        (name = "Admin", description = "User administration"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age));

    if config.allow_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allow_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);

    axum::Router::new()
        .nest("/api", routes::api_routes())
        .route(
            "/storage/{*path}",
            axum::routing::get(handlers::assets::serve_blob),
        )
        .with_state(state)
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
}
