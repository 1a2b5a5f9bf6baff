use axum::{
    extract::{Extension, OriginalUri, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::db::entities::user;
use crate::db::services;
use crate::services::auth_service;
use crate::web::middleware::auth::require_user;
use crate::web::models::pagination::{Page, PageRequest, PaginationQuery};
use crate::web::models::recipe_models::RecipeMini;
use crate::web::models::user_models::{
    RegisterRequest, RegisteredUser, SetPasswordRequest, SubscriptionQuery, SubscriptionResponse,
    UserResponse,
};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

/// Maps users to responses with the caller's `is_subscribed` flag.
async fn to_user_responses(
    pool: &DatabaseConnection,
    caller: Option<&AuthenticatedUser>,
    users: Vec<user::Model>,
) -> Result<Vec<UserResponse>, AppError> {
    let followed = match caller {
        Some(caller) => {
            let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
            services::followed_among(pool, caller.id, &ids).await?
        }
        None => Default::default(),
    };
    Ok(users
        .into_iter()
        .map(|u| {
            let is_subscribed = followed.contains(&u.id);
            UserResponse::from_model(u, is_subscribed)
        })
        .collect())
}

async fn to_subscription(
    app_state: &AppState,
    author: user::Model,
    recipes_limit: Option<u64>,
) -> Result<SubscriptionResponse, AppError> {
    let (recipes, recipes_count) =
        services::author_recipes_preview(&app_state.db_pool, author.id, recipes_limit).await?;
    let base_url = &app_state.config.base_url;
    Ok(SubscriptionResponse {
        user: UserResponse::from_model(author, true),
        recipes: recipes
            .into_iter()
            .map(|r| RecipeMini::from_model(r, base_url))
            .collect(),
        recipes_count,
    })
}

async fn list_users_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<AuthenticatedUser>>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Page<UserResponse>>, AppError> {
    let page = PageRequest::new(query.page, query.limit, app_state.config.page_size)?;
    let (users, total) = services::list_users(&app_state.db_pool, page).await?;
    let results = to_user_responses(&app_state.db_pool, caller.as_ref(), users).await?;
    Ok(Json(Page::build(
        results,
        total,
        page,
        &app_state.config.base_url,
        &uri,
    )))
}

async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredUser>), AppError> {
    let user_model =
        auth_service::register_user(&app_state.db_pool, payload, app_state.config.password_cost)
            .await?;
    Ok((StatusCode::CREATED, Json(user_model.into())))
}

async fn get_user_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<AuthenticatedUser>>,
    Path(user_id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    let user_model = services::get_user(&app_state.db_pool, user_id).await?;
    let is_subscribed = match &caller {
        Some(caller) => services::is_following(&app_state.db_pool, caller.id, user_model.id).await?,
        None => false,
    };
    Ok(Json(UserResponse::from_model(user_model, is_subscribed)))
}

async fn delete_user_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<AuthenticatedUser>>,
    Path(user_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let caller = require_user(caller)?;
    services::delete_user(&app_state.db_pool, &app_state.config.media_dir, &caller, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<UserResponse>, AppError> {
    let user_model = services::get_user(&app_state.db_pool, caller.id).await?;
    Ok(Json(UserResponse::from_model(user_model, false)))
}

async fn set_password_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    auth_service::set_password(
        &app_state.db_pool,
        &caller,
        payload,
        app_state.config.password_cost,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn subscriptions_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<SubscriptionQuery>,
) -> Result<Json<Page<SubscriptionResponse>>, AppError> {
    let page = PageRequest::new(query.page, query.limit, app_state.config.page_size)?;
    let (authors, total) = services::list_subscriptions(&app_state.db_pool, &caller, page).await?;

    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(to_subscription(&app_state, author, query.recipes_limit).await?);
    }
    Ok(Json(Page::build(
        results,
        total,
        page,
        &app_state.config.base_url,
        &uri,
    )))
}

async fn subscribe_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(author_id): Path<i32>,
    Query(query): Query<SubscriptionQuery>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), AppError> {
    let author = services::subscribe(&app_state.db_pool, &caller, author_id).await?;
    let subscription = to_subscription(&app_state, author, query.recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

async fn unsubscribe_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(author_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    services::unsubscribe(&app_state.db_pool, &caller, author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Routes open to anonymous callers. Deleting an account checks the caller
/// inside the handler.
pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/", get(list_users_handler).post(register_handler))
        .route("/users/{id}/", get(get_user_handler).delete(delete_user_handler))
}

pub fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/me/", get(me_handler))
        .route("/users/set_password/", post(set_password_handler))
        .route("/users/subscriptions/", get(subscriptions_handler))
        .route(
            "/users/{id}/subscribe/",
            post(subscribe_handler).delete(unsubscribe_handler),
        )
}
