use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, RelationTrait,
};
use std::collections::BTreeMap;
use tracing::debug;

use crate::db::entities::{ingredient, recipe, recipe_ingredient, shopping_cart};
use crate::web::error::AppError;
use crate::web::models::AuthenticatedUser;

pub const SHOPPING_LIST_FILE_NAME: &str = "shopping_list.txt";

/// One ingredient line of one recipe in the cart.
#[derive(Debug, Clone, FromQueryResult)]
pub struct CartIngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

async fn fetch_cart_ingredients(
    pool: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<CartIngredientRow>, DbErr> {
    recipe_ingredient::Entity::find()
        .select_only()
        .column_as(ingredient::Column::Name, "name")
        .column_as(ingredient::Column::MeasurementUnit, "measurement_unit")
        .column_as(recipe_ingredient::Column::Amount, "amount")
        .join(JoinType::InnerJoin, recipe_ingredient::Relation::Ingredient.def())
        .join(JoinType::InnerJoin, recipe_ingredient::Relation::Recipe.def())
        .join(JoinType::InnerJoin, recipe::Relation::ShoppingCarts.def())
        .filter(shopping_cart::Column::UserId.eq(user_id))
        .into_model::<CartIngredientRow>()
        .all(pool)
        .await
}

/// Groups rows by (name, unit) and sums the amounts.
///
/// Items come out ordered by total ascending, then by name and unit.
pub fn aggregate(rows: impl IntoIterator<Item = CartIngredientRow>) -> Vec<ShoppingListItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
    }

    let mut items: Vec<ShoppingListItem> = totals
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingListItem {
            name,
            measurement_unit,
            total,
        })
        .collect();
    // BTreeMap order already breaks ties by name and unit; the sort is stable.
    items.sort_by_key(|item| item.total);
    items
}

pub fn render(items: &[ShoppingListItem], generated_at: DateTime<Utc>) -> String {
    let date = generated_at.format("%d-%m-%Y").to_string();
    let mut out = t!("shopping_list.header", date = date).to_string();
    out.push_str("\n\n");
    for item in items {
        out.push_str(&format!(
            "{} ({}) — {}\n",
            item.name, item.measurement_unit, item.total
        ));
    }
    out
}

/// Builds the text body for `download_shopping_cart`.
pub async fn build_shopping_list(
    pool: &DatabaseConnection,
    caller: &AuthenticatedUser,
) -> Result<String, AppError> {
    let rows = fetch_cart_ingredients(pool, caller.id).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound(t!("errors.cart_empty").to_string()));
    }

    let items = aggregate(rows);
    debug!(user_id = caller.id, lines = items.len(), "Built shopping list.");
    Ok(render(&items, Utc::now()))
}
