use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::db::entities::{
    favorite, ingredient, recipe, recipe_ingredient, recipe_tag, shopping_cart, tag, user,
};
use crate::db::services::collection_service::{collection_recipe_ids, RecipeCollection};
use crate::db::services::follow_service;
use crate::services::image_service;
use crate::services::permissions::ensure_can_modify;
use crate::services::validation::{self, ValidatedRecipe};
use crate::web::error::{is_unique_violation, AppError};
use crate::web::models::pagination::PageRequest;
use crate::web::models::recipe_models::{RecipeListQuery, RecipeWriteRequest};
use crate::web::models::AuthenticatedUser;

/// A recipe with everything its full representation needs.
#[derive(Debug, Clone)]
pub struct RecipeDetails {
    pub recipe: recipe::Model,
    pub author: user::Model,
    pub author_is_followed: bool,
    pub tags: Vec<tag::Model>,
    /// (ingredient, amount) in insertion order.
    pub ingredients: Vec<(ingredient::Model, i32)>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Filters accepted by the recipe list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<i32>,
    /// Any-of match on tag slugs.
    pub tag_slugs: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl From<&RecipeListQuery> for RecipeFilter {
    fn from(query: &RecipeListQuery) -> Self {
        RecipeFilter {
            author: query.author,
            tag_slugs: query
                .tags
                .iter()
                .map(|slug| slug.trim().to_string())
                .filter(|slug| !slug.is_empty())
                .collect(),
            is_favorited: query.is_favorited == Some(1),
            is_in_shopping_cart: query.is_in_shopping_cart == Some(1),
        }
    }
}

pub async fn get_recipe(pool: &DatabaseConnection, recipe_id: i32) -> Result<recipe::Model, AppError> {
    recipe::Entity::find_by_id(recipe_id)
        .one(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(t!("errors.recipe_not_found").to_string()))
}

/// One page of recipes, newest first.
pub async fn list_recipes(
    pool: &DatabaseConnection,
    caller: Option<&AuthenticatedUser>,
    filter: &RecipeFilter,
    page: PageRequest,
) -> Result<(Vec<recipe::Model>, u64), AppError> {
    let mut query = recipe::Entity::find();

    if let Some(author_id) = filter.author {
        query = query.filter(recipe::Column::AuthorId.eq(author_id));
    }

    if !filter.tag_slugs.is_empty() {
        let tag_ids: Vec<i32> = tag::Entity::find()
            .select_only()
            .column(tag::Column::Id)
            .filter(tag::Column::Slug.is_in(filter.tag_slugs.clone()))
            .into_tuple()
            .all(pool)
            .await?;
        let tagged: Vec<i32> = recipe_tag::Entity::find()
            .select_only()
            .column(recipe_tag::Column::RecipeId)
            .filter(recipe_tag::Column::TagId.is_in(tag_ids))
            .distinct()
            .into_tuple()
            .all(pool)
            .await?;
        query = query.filter(recipe::Column::Id.is_in(tagged));
    }

    for (enabled, collection) in [
        (filter.is_favorited, RecipeCollection::Favorites),
        (filter.is_in_shopping_cart, RecipeCollection::ShoppingCart),
    ] {
        if !enabled {
            continue;
        }
        // Anonymous callers have no collections, so the filter matches nothing.
        let ids: Vec<i32> = match caller {
            Some(user) => collection_recipe_ids(pool, collection, user.id, None)
                .await?
                .into_iter()
                .collect(),
            None => Vec::new(),
        };
        query = query.filter(recipe::Column::Id.is_in(ids));
    }

    let paginator = query
        .order_by_desc(recipe::Column::PubDate)
        .order_by_desc(recipe::Column::Id)
        .paginate(pool, page.size);
    let total = paginator.num_items().await?;
    let recipes = paginator.fetch_page(page.index_within(total)?).await?;
    debug!(total, page = page.number, "Listed recipes.");
    Ok((recipes, total))
}

/// Loads authors, tags, ingredients and the caller's flags for a batch of
/// recipes with a fixed number of queries.
pub async fn load_details(
    pool: &DatabaseConnection,
    caller: Option<&AuthenticatedUser>,
    recipes: Vec<recipe::Model>,
) -> Result<Vec<RecipeDetails>, AppError> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }
    let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();
    let author_ids: Vec<i32> = recipes
        .iter()
        .map(|r| r.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let authors: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids.clone()))
        .all(pool)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let recipe_tags = recipe_tag::Entity::find()
        .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.clone()))
        .all(pool)
        .await?;
    let tags: HashMap<i32, tag::Model> = tag::Entity::find()
        .filter(tag::Column::Id.is_in(recipe_tags.iter().map(|rt| rt.tag_id).collect::<Vec<_>>()))
        .all(pool)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();
    let mut tags_by_recipe: HashMap<i32, Vec<tag::Model>> = HashMap::new();
    for link in recipe_tags {
        if let Some(tag_model) = tags.get(&link.tag_id) {
            tags_by_recipe
                .entry(link.recipe_id)
                .or_default()
                .push(tag_model.clone());
        }
    }

    let amounts = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids.clone()))
        .order_by_asc(recipe_ingredient::Column::Id)
        .all(pool)
        .await?;
    let ingredients: HashMap<i32, ingredient::Model> = ingredient::Entity::find()
        .filter(
            ingredient::Column::Id
                .is_in(amounts.iter().map(|a| a.ingredient_id).collect::<Vec<_>>()),
        )
        .all(pool)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();
    let mut ingredients_by_recipe: HashMap<i32, Vec<(ingredient::Model, i32)>> = HashMap::new();
    for line in amounts {
        if let Some(ingredient_model) = ingredients.get(&line.ingredient_id) {
            ingredients_by_recipe
                .entry(line.recipe_id)
                .or_default()
                .push((ingredient_model.clone(), line.amount));
        }
    }

    let (followed, favorited, in_cart) = match caller {
        Some(user) => (
            follow_service::followed_among(pool, user.id, &author_ids).await?,
            collection_recipe_ids(pool, RecipeCollection::Favorites, user.id, Some(&recipe_ids))
                .await?,
            collection_recipe_ids(pool, RecipeCollection::ShoppingCart, user.id, Some(&recipe_ids))
                .await?,
        ),
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    let mut details = Vec::with_capacity(recipes.len());
    for recipe_model in recipes {
        let author = authors.get(&recipe_model.author_id).cloned().ok_or_else(|| {
            AppError::InternalServerError(format!(
                "Author {} of recipe {} is missing",
                recipe_model.author_id, recipe_model.id
            ))
        })?;
        let mut recipe_tags = tags_by_recipe.remove(&recipe_model.id).unwrap_or_default();
        recipe_tags.sort_by_key(|t| t.id);
        details.push(RecipeDetails {
            author_is_followed: followed.contains(&author.id),
            author,
            tags: recipe_tags,
            ingredients: ingredients_by_recipe
                .remove(&recipe_model.id)
                .unwrap_or_default(),
            is_favorited: favorited.contains(&recipe_model.id),
            is_in_shopping_cart: in_cart.contains(&recipe_model.id),
            recipe: recipe_model,
        });
    }
    Ok(details)
}

pub async fn get_recipe_details(
    pool: &DatabaseConnection,
    caller: Option<&AuthenticatedUser>,
    recipe_id: i32,
) -> Result<RecipeDetails, AppError> {
    let recipe_model = get_recipe(pool, recipe_id).await?;
    load_details(pool, caller, vec![recipe_model])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(t!("errors.recipe_not_found").to_string()))
}

/// Every ingredient and tag id must exist.
async fn check_references(
    txn: &DatabaseTransaction,
    validated: &ValidatedRecipe,
) -> Result<(), AppError> {
    let ingredient_ids: Vec<i32> = validated.ingredients.iter().map(|(id, _)| *id).collect();
    let known_ingredients = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ingredient_ids.clone()))
        .count(txn)
        .await?;
    if known_ingredients != ingredient_ids.len() as u64 {
        return Err(AppError::validation(
            "ingredients",
            t!("validation.unknown_ingredient"),
        ));
    }

    let known_tags = tag::Entity::find()
        .filter(tag::Column::Id.is_in(validated.tags.clone()))
        .count(txn)
        .await?;
    if known_tags != validated.tags.len() as u64 {
        return Err(AppError::validation("tags", t!("validation.unknown_tag")));
    }
    Ok(())
}

/// Rejects a (name, author) pair already used by another recipe.
async fn check_name_free(
    txn: &DatabaseTransaction,
    author_id: i32,
    name: &str,
    except_recipe: Option<i32>,
) -> Result<(), AppError> {
    let mut query = recipe::Entity::find()
        .filter(recipe::Column::AuthorId.eq(author_id))
        .filter(recipe::Column::Name.eq(name));
    if let Some(recipe_id) = except_recipe {
        query = query.filter(recipe::Column::Id.ne(recipe_id));
    }
    if query.count(txn).await? > 0 {
        return Err(AppError::validation("name", t!("errors.recipe_name_taken")));
    }
    Ok(())
}

fn map_recipe_write_err(db_err: DbErr) -> AppError {
    if is_unique_violation(&db_err) {
        AppError::validation("name", t!("errors.recipe_name_taken"))
    } else {
        AppError::DatabaseError(db_err.to_string())
    }
}

async fn replace_links(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    validated: &ValidatedRecipe,
) -> Result<(), DbErr> {
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(txn)
        .await?;
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(txn)
        .await?;

    recipe_ingredient::Entity::insert_many(validated.ingredients.iter().map(
        |(ingredient_id, amount)| recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(*ingredient_id),
            amount: Set(*amount),
            ..Default::default()
        },
    ))
    .exec_without_returning(txn)
    .await?;

    recipe_tag::Entity::insert_many(validated.tags.iter().map(|tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(*tag_id),
    }))
    .exec_without_returning(txn)
    .await?;
    Ok(())
}

async fn insert_recipe_rows(
    txn: &DatabaseTransaction,
    author_id: i32,
    image_path: &str,
    validated: &ValidatedRecipe,
) -> Result<recipe::Model, AppError> {
    check_references(txn, validated).await?;

    let (Some(name), Some(text), Some(cooking_time)) = (
        validated.name.as_ref(),
        validated.text.as_ref(),
        validated.cooking_time,
    ) else {
        return Err(AppError::validation("name", t!("validation.required")));
    };
    check_name_free(txn, author_id, name, None).await?;

    let recipe_model = recipe::ActiveModel {
        author_id: Set(author_id),
        name: Set(name.clone()),
        text: Set(text.clone()),
        image: Set(image_path.to_string()),
        cooking_time: Set(cooking_time),
        pub_date: Set(Utc::now()),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(map_recipe_write_err)?;

    replace_links(txn, recipe_model.id, validated).await?;
    Ok(recipe_model)
}

/// Creates a recipe with its ingredient amounts and tags in one transaction.
///
/// The image is written before the transaction and removed again if any
/// later step fails.
pub async fn create_recipe(
    pool: &DatabaseConnection,
    media_dir: &str,
    caller: &AuthenticatedUser,
    req: RecipeWriteRequest,
) -> Result<recipe::Model, AppError> {
    let validated = validation::validate_recipe_write(req, true)?;
    let image = validated
        .image
        .as_deref()
        .ok_or_else(|| AppError::validation("image", t!("validation.required")))?;
    let image_path = image_service::save_image(media_dir, image).await?;

    let txn = pool.begin().await?;
    let result = match insert_recipe_rows(&txn, caller.id, &image_path, &validated).await {
        Ok(model) => txn.commit().await.map(|_| model).map_err(AppError::from),
        Err(e) => Err(e),
    };

    match result {
        Ok(model) => {
            info!(recipe_id = model.id, author_id = caller.id, "Recipe created.");
            Ok(model)
        }
        Err(e) => {
            image_service::delete_image(media_dir, &image_path).await;
            Err(e)
        }
    }
}

async fn update_recipe_rows(
    txn: &DatabaseTransaction,
    existing: recipe::Model,
    new_image: Option<&str>,
    validated: &ValidatedRecipe,
) -> Result<recipe::Model, AppError> {
    check_references(txn, validated).await?;
    if let Some(name) = validated.name.as_deref() {
        check_name_free(txn, existing.author_id, name, Some(existing.id)).await?;
    }

    let recipe_id = existing.id;
    let mut active: recipe::ActiveModel = existing.clone().into();
    if let Some(name) = &validated.name {
        active.name = Set(name.clone());
    }
    if let Some(text) = &validated.text {
        active.text = Set(text.clone());
    }
    if let Some(cooking_time) = validated.cooking_time {
        active.cooking_time = Set(cooking_time);
    }
    if let Some(image_path) = new_image {
        active.image = Set(image_path.to_string());
    }
    let updated = if active.is_changed() {
        active.update(txn).await.map_err(map_recipe_write_err)?
    } else {
        existing
    };

    replace_links(txn, recipe_id, validated).await?;
    Ok(updated)
}

/// Partial update by the author or an administrator. Ingredients and tags
/// are always replaced as a whole.
pub async fn update_recipe(
    pool: &DatabaseConnection,
    media_dir: &str,
    caller: &AuthenticatedUser,
    recipe_id: i32,
    req: RecipeWriteRequest,
) -> Result<recipe::Model, AppError> {
    let existing = get_recipe(pool, recipe_id).await?;
    ensure_can_modify(caller, existing.author_id)?;
    let validated = validation::validate_recipe_write(req, false)?;

    let new_image = match validated.image.as_deref() {
        Some(data_uri) => Some(image_service::save_image(media_dir, data_uri).await?),
        None => None,
    };
    let old_image = existing.image.clone();

    let txn = pool.begin().await?;
    let result =
        match update_recipe_rows(&txn, existing, new_image.as_deref(), &validated).await {
            Ok(model) => txn.commit().await.map(|_| model).map_err(AppError::from),
            Err(e) => Err(e),
        };

    match result {
        Ok(model) => {
            if new_image.is_some() {
                image_service::delete_image(media_dir, &old_image).await;
            }
            info!(recipe_id, user_id = caller.id, "Recipe updated.");
            Ok(model)
        }
        Err(e) => {
            if let Some(path) = &new_image {
                image_service::delete_image(media_dir, path).await;
            }
            Err(e)
        }
    }
}

/// Deletes recipes and every row that references them.
pub async fn delete_recipe_rows<C: ConnectionTrait>(db: &C, recipe_ids: &[i32]) -> Result<(), DbErr> {
    if recipe_ids.is_empty() {
        return Ok(());
    }
    let ids = recipe_ids.to_vec();
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.is_in(ids.clone()))
        .exec(db)
        .await?;
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.is_in(ids.clone()))
        .exec(db)
        .await?;
    favorite::Entity::delete_many()
        .filter(favorite::Column::RecipeId.is_in(ids.clone()))
        .exec(db)
        .await?;
    shopping_cart::Entity::delete_many()
        .filter(shopping_cart::Column::RecipeId.is_in(ids.clone()))
        .exec(db)
        .await?;
    recipe::Entity::delete_many()
        .filter(recipe::Column::Id.is_in(ids))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn delete_recipe(
    pool: &DatabaseConnection,
    media_dir: &str,
    caller: &AuthenticatedUser,
    recipe_id: i32,
) -> Result<(), AppError> {
    let existing = get_recipe(pool, recipe_id).await?;
    ensure_can_modify(caller, existing.author_id)?;

    let txn = pool.begin().await?;
    delete_recipe_rows(&txn, &[existing.id]).await?;
    txn.commit().await?;

    image_service::delete_image(media_dir, &existing.image).await;
    info!(recipe_id, user_id = caller.id, "Recipe deleted.");
    Ok(())
}

/// The newest recipes of an author, optionally capped, plus their total count.
pub async fn author_recipes_preview(
    pool: &DatabaseConnection,
    author_id: i32,
    limit: Option<u64>,
) -> Result<(Vec<recipe::Model>, u64), DbErr> {
    let base = recipe::Entity::find().filter(recipe::Column::AuthorId.eq(author_id));
    let total = base.clone().count(pool).await?;

    let mut query = base
        .order_by_desc(recipe::Column::PubDate)
        .order_by_desc(recipe::Column::Id);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    Ok((query.all(pool).await?, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_query() {
        let query = RecipeListQuery {
            author: Some(3),
            tags: vec!["lunch".to_string(), " ".to_string(), "dinner".to_string()],
            is_favorited: Some(1),
            is_in_shopping_cart: Some(0),
            ..Default::default()
        };
        let filter = RecipeFilter::from(&query);
        assert_eq!(filter.author, Some(3));
        assert_eq!(filter.tag_slugs, vec!["lunch", "dinner"]);
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
    }
}
