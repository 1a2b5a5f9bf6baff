use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::tag;
use crate::web::error::AppError;

/// All tags ordered by id. Tags are not paginated.
pub async fn list_tags(pool: &DatabaseConnection) -> Result<Vec<tag::Model>, DbErr> {
    tag::Entity::find()
        .order_by_asc(tag::Column::Id)
        .all(pool)
        .await
}

pub async fn get_tag(pool: &DatabaseConnection, tag_id: i32) -> Result<tag::Model, AppError> {
    tag::Entity::find_by_id(tag_id)
        .one(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(t!("errors.tag_not_found").to_string()))
}

/// Returns the tag with this slug, inserting it when missing.
///
/// The bool is true when a row was created.
pub async fn get_or_create_tag<C: ConnectionTrait>(
    db: &C,
    name: &str,
    color: &str,
    slug: &str,
) -> Result<(tag::Model, bool), DbErr> {
    if let Some(existing) = tag::Entity::find()
        .filter(tag::Column::Slug.eq(slug))
        .one(db)
        .await?
    {
        return Ok((existing, false));
    }

    let created = tag::ActiveModel {
        name: Set(name.to_string()),
        color: Set(color.to_string()),
        slug: Set(slug.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok((created, true))
}
