use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::db::services;
use crate::web::models::recipe_models::{IngredientResponse, IngredientSearchQuery};
use crate::web::{AppError, AppState};

async fn search_ingredients_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<IngredientSearchQuery>,
) -> Result<Json<Vec<IngredientResponse>>, AppError> {
    let ingredients =
        services::search_ingredients(&app_state.db_pool, query.prefix()).await?;
    Ok(Json(ingredients.into_iter().map(IngredientResponse::from).collect()))
}

async fn get_ingredient_handler(
    State(app_state): State<Arc<AppState>>,
    Path(ingredient_id): Path<i32>,
) -> Result<Json<IngredientResponse>, AppError> {
    let ingredient = services::get_ingredient(&app_state.db_pool, ingredient_id).await?;
    Ok(Json(ingredient.into()))
}

pub fn create_ingredients_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ingredients/", get(search_ingredients_handler))
        .route("/ingredients/{id}/", get(get_ingredient_handler))
}
