use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::info;

use crate::db::entities::{favorite, follow, recipe, shopping_cart, user};
use crate::db::services::recipe_service;
use crate::services::image_service;
use crate::services::permissions::ensure_can_modify;
use crate::web::error::AppError;
use crate::web::models::pagination::PageRequest;
use crate::web::models::AuthenticatedUser;

pub async fn get_user(pool: &DatabaseConnection, user_id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(user_id)
        .one(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(t!("errors.user_not_found").to_string()))
}

/// One page of users ordered by id.
pub async fn list_users(
    pool: &DatabaseConnection,
    page: PageRequest,
) -> Result<(Vec<user::Model>, u64), AppError> {
    let paginator = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .paginate(pool, page.size);
    let total = paginator.num_items().await?;
    let users = paginator.fetch_page(page.index_within(total)?).await?;
    Ok((users, total))
}

/// Deletes an account with its recipes, collections and follows in both
/// directions. Allowed for the account itself and for administrators.
pub async fn delete_user(
    pool: &DatabaseConnection,
    media_dir: &str,
    caller: &AuthenticatedUser,
    user_id: i32,
) -> Result<(), AppError> {
    let target = get_user(pool, user_id).await?;
    ensure_can_modify(caller, target.id)?;

    let txn = pool.begin().await?;
    let owned: Vec<(i32, String)> = recipe::Entity::find()
        .select_only()
        .column(recipe::Column::Id)
        .column(recipe::Column::Image)
        .filter(recipe::Column::AuthorId.eq(target.id))
        .into_tuple()
        .all(&txn)
        .await?;
    let recipe_ids: Vec<i32> = owned.iter().map(|(id, _)| *id).collect();

    recipe_service::delete_recipe_rows(&txn, &recipe_ids).await?;
    favorite::Entity::delete_many()
        .filter(favorite::Column::UserId.eq(target.id))
        .exec(&txn)
        .await?;
    shopping_cart::Entity::delete_many()
        .filter(shopping_cart::Column::UserId.eq(target.id))
        .exec(&txn)
        .await?;
    follow::Entity::delete_many()
        .filter(
            Condition::any()
                .add(follow::Column::UserId.eq(target.id))
                .add(follow::Column::AuthorId.eq(target.id)),
        )
        .exec(&txn)
        .await?;
    user::Entity::delete_by_id(target.id).exec(&txn).await?;
    txn.commit().await?;

    for (_, image) in &owned {
        image_service::delete_image(media_dir, image).await;
    }
    info!(
        user_id = target.id,
        deleted_by = caller.id,
        recipes = recipe_ids.len(),
        "User deleted."
    );
    Ok(())
}
