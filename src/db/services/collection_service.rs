use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, Set,
};
use std::collections::HashSet;
use tracing::info;

use crate::db::entities::{favorite, recipe, shopping_cart};
use crate::db::services::recipe_service;
use crate::web::error::{is_unique_violation, AppError};
use crate::web::models::AuthenticatedUser;

/// Per-user recipe lists that share the same add/remove rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeCollection {
    Favorites,
    ShoppingCart,
}

impl RecipeCollection {
    fn already_added(self) -> String {
        match self {
            RecipeCollection::Favorites => t!("errors.already_favorited").to_string(),
            RecipeCollection::ShoppingCart => t!("errors.already_in_cart").to_string(),
        }
    }

    fn not_added(self) -> String {
        match self {
            RecipeCollection::Favorites => t!("errors.not_favorited").to_string(),
            RecipeCollection::ShoppingCart => t!("errors.not_in_cart").to_string(),
        }
    }
}

async fn entry_count(
    pool: &DatabaseConnection,
    collection: RecipeCollection,
    user_id: i32,
    recipe_id: i32,
) -> Result<u64, DbErr> {
    match collection {
        RecipeCollection::Favorites => {
            favorite::Entity::find()
                .filter(favorite::Column::UserId.eq(user_id))
                .filter(favorite::Column::RecipeId.eq(recipe_id))
                .count(pool)
                .await
        }
        RecipeCollection::ShoppingCart => {
            shopping_cart::Entity::find()
                .filter(shopping_cart::Column::UserId.eq(user_id))
                .filter(shopping_cart::Column::RecipeId.eq(recipe_id))
                .count(pool)
                .await
        }
    }
}

/// Adds a recipe to the caller's collection and returns the recipe.
pub async fn add_to_collection(
    pool: &DatabaseConnection,
    collection: RecipeCollection,
    caller: &AuthenticatedUser,
    recipe_id: i32,
) -> Result<recipe::Model, AppError> {
    let recipe_model = recipe_service::get_recipe(pool, recipe_id).await?;

    if entry_count(pool, collection, caller.id, recipe_id).await? > 0 {
        return Err(AppError::Conflict(collection.already_added()));
    }

    let now = Utc::now();
    let inserted = match collection {
        RecipeCollection::Favorites => favorite::ActiveModel {
            user_id: Set(caller.id),
            recipe_id: Set(recipe_id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(pool)
        .await
        .map(|_| ()),
        RecipeCollection::ShoppingCart => shopping_cart::ActiveModel {
            user_id: Set(caller.id),
            recipe_id: Set(recipe_id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(pool)
        .await
        .map(|_| ()),
    };
    inserted.map_err(|db_err| {
        if is_unique_violation(&db_err) {
            AppError::Conflict(collection.already_added())
        } else {
            AppError::DatabaseError(db_err.to_string())
        }
    })?;

    info!(user_id = caller.id, recipe_id, ?collection, "Recipe added to collection.");
    Ok(recipe_model)
}

/// Removes the caller's own entry. Other users' entries are never touched.
pub async fn remove_from_collection(
    pool: &DatabaseConnection,
    collection: RecipeCollection,
    caller: &AuthenticatedUser,
    recipe_id: i32,
) -> Result<(), AppError> {
    recipe_service::get_recipe(pool, recipe_id).await?;

    let result = match collection {
        RecipeCollection::Favorites => {
            favorite::Entity::delete_many()
                .filter(favorite::Column::UserId.eq(caller.id))
                .filter(favorite::Column::RecipeId.eq(recipe_id))
                .exec(pool)
                .await?
        }
        RecipeCollection::ShoppingCart => {
            shopping_cart::Entity::delete_many()
                .filter(shopping_cart::Column::UserId.eq(caller.id))
                .filter(shopping_cart::Column::RecipeId.eq(recipe_id))
                .exec(pool)
                .await?
        }
    };

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(collection.not_added()));
    }
    info!(user_id = caller.id, recipe_id, ?collection, "Recipe removed from collection.");
    Ok(())
}

/// Recipe ids in the user's collection. With `among`, only those ids are checked.
pub async fn collection_recipe_ids(
    pool: &DatabaseConnection,
    collection: RecipeCollection,
    user_id: i32,
    among: Option<&[i32]>,
) -> Result<HashSet<i32>, DbErr> {
    let ids: Vec<i32> = match collection {
        RecipeCollection::Favorites => {
            let mut query = favorite::Entity::find()
                .select_only()
                .column(favorite::Column::RecipeId)
                .filter(favorite::Column::UserId.eq(user_id));
            if let Some(recipe_ids) = among {
                query = query.filter(favorite::Column::RecipeId.is_in(recipe_ids.to_vec()));
            }
            query.into_tuple().all(pool).await?
        }
        RecipeCollection::ShoppingCart => {
            let mut query = shopping_cart::Entity::find()
                .select_only()
                .column(shopping_cart::Column::RecipeId)
                .filter(shopping_cart::Column::UserId.eq(user_id));
            if let Some(recipe_ids) = among {
                query = query.filter(shopping_cart::Column::RecipeId.is_in(recipe_ids.to_vec()));
            }
            query.into_tuple().all(pool).await?
        }
    };
    Ok(ids.into_iter().collect())
}
