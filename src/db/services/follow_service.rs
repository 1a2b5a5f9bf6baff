use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::HashSet;
use tracing::info;

use crate::db::entities::{follow, user};
use crate::db::services::user_service;
use crate::web::error::{is_unique_violation, AppError};
use crate::web::models::pagination::PageRequest;
use crate::web::models::AuthenticatedUser;

pub async fn is_following(
    pool: &DatabaseConnection,
    user_id: i32,
    author_id: i32,
) -> Result<bool, DbErr> {
    let count = follow::Entity::find()
        .filter(follow::Column::UserId.eq(user_id))
        .filter(follow::Column::AuthorId.eq(author_id))
        .count(pool)
        .await?;
    Ok(count > 0)
}

/// Which of `author_ids` the user follows.
pub async fn followed_among(
    pool: &DatabaseConnection,
    user_id: i32,
    author_ids: &[i32],
) -> Result<HashSet<i32>, DbErr> {
    let ids: Vec<i32> = follow::Entity::find()
        .select_only()
        .column(follow::Column::AuthorId)
        .filter(follow::Column::UserId.eq(user_id))
        .filter(follow::Column::AuthorId.is_in(author_ids.to_vec()))
        .into_tuple()
        .all(pool)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Follows `author_id`. Following yourself is rejected for every role.
pub async fn subscribe(
    pool: &DatabaseConnection,
    caller: &AuthenticatedUser,
    author_id: i32,
) -> Result<user::Model, AppError> {
    let author = user_service::get_user(pool, author_id).await?;

    if author.id == caller.id {
        return Err(AppError::InvalidInput(t!("errors.self_follow").to_string()));
    }
    if is_following(pool, caller.id, author.id).await? {
        return Err(AppError::Conflict(t!("errors.already_subscribed").to_string()));
    }

    follow::ActiveModel {
        user_id: Set(caller.id),
        author_id: Set(author.id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(pool)
    .await
    .map_err(|db_err| {
        if is_unique_violation(&db_err) {
            AppError::Conflict(t!("errors.already_subscribed").to_string())
        } else {
            AppError::DatabaseError(db_err.to_string())
        }
    })?;

    info!(user_id = caller.id, author_id = author.id, "Subscribed to author.");
    Ok(author)
}

pub async fn unsubscribe(
    pool: &DatabaseConnection,
    caller: &AuthenticatedUser,
    author_id: i32,
) -> Result<(), AppError> {
    let author = user_service::get_user(pool, author_id).await?;

    let result = follow::Entity::delete_many()
        .filter(follow::Column::UserId.eq(caller.id))
        .filter(follow::Column::AuthorId.eq(author.id))
        .exec(pool)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::InvalidInput(t!("errors.not_subscribed").to_string()));
    }

    info!(user_id = caller.id, author_id = author.id, "Unsubscribed from author.");
    Ok(())
}

/// One page of the authors the caller follows, ordered by id.
pub async fn list_subscriptions(
    pool: &DatabaseConnection,
    caller: &AuthenticatedUser,
    page: PageRequest,
) -> Result<(Vec<user::Model>, u64), AppError> {
    let author_ids: Vec<i32> = follow::Entity::find()
        .select_only()
        .column(follow::Column::AuthorId)
        .filter(follow::Column::UserId.eq(caller.id))
        .into_tuple()
        .all(pool)
        .await?;

    let paginator = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids))
        .order_by_asc(user::Column::Id)
        .paginate(pool, page.size);
    let total = paginator.num_items().await?;
    let authors = paginator.fetch_page(page.index_within(total)?).await?;
    Ok((authors, total))
}
