use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::ingredient;
use crate::web::error::AppError;

/// Escapes LIKE wildcards so user input only ever matches literally.
fn like_prefix(search: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(search.len() + 1);
    for ch in search.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape('\\')
}

/// Ingredients ordered by name, optionally narrowed to a case-insensitive
/// name prefix. Not paginated.
pub async fn search_ingredients(
    pool: &DatabaseConnection,
    search: Option<&str>,
) -> Result<Vec<ingredient::Model>, DbErr> {
    let mut query = ingredient::Entity::find();
    if let Some(prefix) = search.map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(
            Expr::expr(Func::lower(Expr::col((
                ingredient::Entity,
                ingredient::Column::Name,
            ))))
            .like(like_prefix(prefix)),
        );
    }
    query
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::Id)
        .all(pool)
        .await
}

pub async fn get_ingredient(
    pool: &DatabaseConnection,
    ingredient_id: i32,
) -> Result<ingredient::Model, AppError> {
    ingredient::Entity::find_by_id(ingredient_id)
        .one(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(t!("errors.ingredient_not_found").to_string()))
}

/// Returns the (name, unit) ingredient, inserting it when missing.
pub async fn get_or_create_ingredient<C: ConnectionTrait>(
    db: &C,
    name: &str,
    measurement_unit: &str,
) -> Result<(ingredient::Model, bool), DbErr> {
    if let Some(existing) = ingredient::Entity::find()
        .filter(ingredient::Column::Name.eq(name))
        .filter(ingredient::Column::MeasurementUnit.eq(measurement_unit))
        .one(db)
        .await?
    {
        return Ok((existing, false));
    }

    let created = ingredient::ActiveModel {
        name: Set(name.to_string()),
        measurement_unit: Set(measurement_unit.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok((created, true))
}

