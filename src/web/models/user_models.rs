use serde::{Deserialize, Deserializer, Serialize};

use crate::db::entities::user;
use crate::web::models::recipe_models::RecipeMini;

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Returned by registration; carries no subscription flag.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<user::Model> for RegisteredUser {
    fn from(model: user::Model) -> Self {
        Self {
            email: model.email,
            id: model.id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn from_model(model: user::Model, is_subscribed: bool) -> Self {
        Self {
            email: model.email,
            id: model.id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            is_subscribed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// An author the caller follows, with a preview of their recipes.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<RecipeMini>,
    pub recipes_count: u64,
}

#[derive(Debug, Deserialize, Default)]
pub struct SubscriptionQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    #[serde(default, deserialize_with = "digits_or_none")]
    pub recipes_limit: Option<u64>,
}

/// Values that are not plain digits are treated as absent.
fn digits_or_none<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}
