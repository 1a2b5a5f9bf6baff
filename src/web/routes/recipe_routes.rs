use axum::{
    extract::{Extension, OriginalUri, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::Query;
use std::sync::Arc;

use crate::db::services::{self, RecipeCollection, RecipeFilter, SHOPPING_LIST_FILE_NAME};
use crate::web::middleware::auth::require_user;
use crate::web::models::pagination::{Page, PageRequest};
use crate::web::models::recipe_models::{
    RecipeListQuery, RecipeMini, RecipeResponse, RecipeWriteRequest,
};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

async fn list_recipes_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<AuthenticatedUser>>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<Page<RecipeResponse>>, AppError> {
    let page = PageRequest::new(query.page, query.limit, app_state.config.page_size)?;
    let filter = RecipeFilter::from(&query);

    let (recipes, total) =
        services::list_recipes(&app_state.db_pool, caller.as_ref(), &filter, page).await?;
    let details = services::load_details(&app_state.db_pool, caller.as_ref(), recipes).await?;

    let base_url = &app_state.config.base_url;
    let results = details
        .into_iter()
        .map(|d| RecipeResponse::from_details(d, base_url))
        .collect();
    Ok(Json(Page::build(results, total, page, base_url, &uri)))
}

async fn create_recipe_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<AuthenticatedUser>>,
    Json(payload): Json<RecipeWriteRequest>,
) -> Result<(StatusCode, Json<RecipeResponse>), AppError> {
    let caller = require_user(caller)?;
    let recipe = services::create_recipe(
        &app_state.db_pool,
        &app_state.config.media_dir,
        &caller,
        payload,
    )
    .await?;

    let details = services::get_recipe_details(&app_state.db_pool, Some(&caller), recipe.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RecipeResponse::from_details(details, &app_state.config.base_url)),
    ))
}

async fn get_recipe_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<AuthenticatedUser>>,
    Path(recipe_id): Path<i32>,
) -> Result<Json<RecipeResponse>, AppError> {
    let details =
        services::get_recipe_details(&app_state.db_pool, caller.as_ref(), recipe_id).await?;
    Ok(Json(RecipeResponse::from_details(details, &app_state.config.base_url)))
}

async fn update_recipe_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<AuthenticatedUser>>,
    Path(recipe_id): Path<i32>,
    Json(payload): Json<RecipeWriteRequest>,
) -> Result<Json<RecipeResponse>, AppError> {
    let caller = require_user(caller)?;
    services::update_recipe(
        &app_state.db_pool,
        &app_state.config.media_dir,
        &caller,
        recipe_id,
        payload,
    )
    .await?;

    let details = services::get_recipe_details(&app_state.db_pool, Some(&caller), recipe_id).await?;
    Ok(Json(RecipeResponse::from_details(details, &app_state.config.base_url)))
}

async fn delete_recipe_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<AuthenticatedUser>>,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let caller = require_user(caller)?;
    services::delete_recipe(
        &app_state.db_pool,
        &app_state.config.media_dir,
        &caller,
        recipe_id,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_collection(
    app_state: &AppState,
    collection: RecipeCollection,
    caller: &AuthenticatedUser,
    recipe_id: i32,
) -> Result<(StatusCode, Json<RecipeMini>), AppError> {
    let recipe =
        services::add_to_collection(&app_state.db_pool, collection, caller, recipe_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RecipeMini::from_model(recipe, &app_state.config.base_url)),
    ))
}

async fn add_favorite_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(recipe_id): Path<i32>,
) -> Result<(StatusCode, Json<RecipeMini>), AppError> {
    add_to_collection(&app_state, RecipeCollection::Favorites, &caller, recipe_id).await
}

async fn remove_favorite_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    services::remove_from_collection(
        &app_state.db_pool,
        RecipeCollection::Favorites,
        &caller,
        recipe_id,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_cart_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(recipe_id): Path<i32>,
) -> Result<(StatusCode, Json<RecipeMini>), AppError> {
    add_to_collection(&app_state, RecipeCollection::ShoppingCart, &caller, recipe_id).await
}

async fn remove_from_cart_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    services::remove_from_collection(
        &app_state.db_pool,
        RecipeCollection::ShoppingCart,
        &caller,
        recipe_id,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_shopping_cart_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let body = services::build_shopping_list(&app_state.db_pool, &caller).await?;
    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={SHOPPING_LIST_FILE_NAME}"),
        ),
    ];
    Ok((headers, body))
}

/// Reads are open to everyone; writes on these paths check the caller in
/// the handler.
pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/recipes/",
            get(list_recipes_handler).post(create_recipe_handler),
        )
        .route(
            "/recipes/{id}/",
            get(get_recipe_handler)
                .patch(update_recipe_handler)
                .delete(delete_recipe_handler),
        )
}

pub fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/recipes/download_shopping_cart/",
            get(download_shopping_cart_handler),
        )
        .route(
            "/recipes/{id}/favorite/",
            post(add_favorite_handler).delete(remove_favorite_handler),
        )
        .route(
            "/recipes/{id}/shopping_cart/",
            post(add_to_cart_handler).delete(remove_from_cart_handler),
        )
}
