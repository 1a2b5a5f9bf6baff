use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::get,
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::server::config::ServerConfig;
use crate::web::middleware::{auth, i18n};
use crate::web::routes::*;

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabaseConnection,
    pub config: Arc<ServerConfig>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(db_pool: DatabaseConnection, config: Arc<ServerConfig>) -> Router {
    let media_dir = config.media_dir.clone();
    let app_state = Arc::new(AppState { db_pool, config });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let protected = auth_routes::create_protected_router()
        .merge(user_routes::create_protected_router())
        .merge(recipe_routes::create_protected_router())
        .route_layer(axum_middleware::from_fn(auth::require_auth));

    // Layers run outside-in: locale first, then caller resolution.
    let api = Router::new()
        .route("/health", get(health_check_handler))
        .merge(auth_routes::create_public_router())
        .merge(user_routes::create_public_router())
        .merge(tag_routes::create_tags_router())
        .merge(ingredient_routes::create_ingredients_router())
        .merge(recipe_routes::create_public_router())
        .merge(protected)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth::authenticate,
        ))
        .layer(axum_middleware::from_fn(i18n::i18n_middleware));

    Router::new()
        .nest("/api", api)
        .nest_service("/media", ServeDir::new(media_dir))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
