use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::db::services;
use crate::web::models::recipe_models::TagResponse;
use crate::web::{AppError, AppState};

async fn list_tags_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<TagResponse>>, AppError> {
    let tags = services::list_tags(&app_state.db_pool).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

async fn get_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
) -> Result<Json<TagResponse>, AppError> {
    let tag = services::get_tag(&app_state.db_pool, tag_id).await?;
    Ok(Json(tag.into()))
}

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tags/", get(list_tags_handler))
        .route("/tags/{id}/", get(get_tag_handler))
}
