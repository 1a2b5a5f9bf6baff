use serde::{Deserialize, Serialize};

use crate::db::entities::{ingredient, recipe, tag};
use crate::db::services::RecipeDetails;
use crate::services::image_service::image_url;
use crate::web::models::user_models::UserResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<tag::Model> for TagResponse {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
            slug: model.slug,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<ingredient::Model> for IngredientResponse {
    fn from(model: ingredient::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            measurement_unit: model.measurement_unit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: i32,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeResponse {
    pub fn from_details(details: RecipeDetails, base_url: &str) -> Self {
        let RecipeDetails {
            recipe,
            author,
            author_is_followed,
            tags,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
        } = details;
        Self {
            id: recipe.id,
            tags: tags.into_iter().map(TagResponse::from).collect(),
            author: UserResponse::from_model(author, author_is_followed),
            ingredients: ingredients
                .into_iter()
                .map(|(ingredient, amount)| RecipeIngredientResponse {
                    id: ingredient.id,
                    name: ingredient.name,
                    measurement_unit: ingredient.measurement_unit,
                    amount,
                })
                .collect(),
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name,
            image: image_url(base_url, &recipe.image),
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Short form used by favorite/cart responses and subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeMini {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeMini {
    pub fn from_model(model: recipe::Model, base_url: &str) -> Self {
        Self {
            id: model.id,
            name: model.name,
            image: image_url(base_url, &model.image),
            cooking_time: model.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientAmount {
    pub id: i32,
    pub amount: i64,
}

/// Body of `POST /recipes/` and `PATCH /recipes/{id}/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeWriteRequest {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<i32>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RecipeListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub author: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<u8>,
    pub is_in_shopping_cart: Option<u8>,
}

/// `search` wins when both it and the `name` alias are given.
#[derive(Debug, Deserialize, Default)]
pub struct IngredientSearchQuery {
    pub search: Option<String>,
    pub name: Option<String>,
}

impl IngredientSearchQuery {
    pub fn prefix(&self) -> Option<&str> {
        self.search.as_deref().or(self.name.as_deref())
    }
}
