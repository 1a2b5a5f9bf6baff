//! Request validation that does not need the database.
//!
//! Every check returns a field-scoped `AppError::Validation` so the client
//! knows which input to fix. Existence checks (tag and ingredient ids,
//! uniqueness) are done by the services that own those tables.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::web::error::AppError;
use crate::web::models::recipe_models::RecipeWriteRequest;
use crate::web::models::user_models::RegisterRequest;

pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_USER_FIELD_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Upper bound shared by `amount` and `cooking_time`.
pub const MAX_SMALL_POSITIVE: i64 = 32_767;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[A-Fa-f0-9]{6}$").expect("valid hex colour regex"));
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));
static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug regex"));

/// A recipe write that passed the stateless checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecipe {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
    /// (ingredient id, amount), in request order.
    pub ingredients: Vec<(i32, i32)>,
    pub tags: Vec<i32>,
}

fn positive_small(value: i64, field: &str) -> Result<i32, AppError> {
    if value < 1 {
        return Err(AppError::validation(field, t!("validation.must_be_positive")));
    }
    if value > MAX_SMALL_POSITIVE {
        return Err(AppError::validation(
            field,
            t!("validation.too_large", max = MAX_SMALL_POSITIVE),
        ));
    }
    Ok(value as i32)
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::validation(field, t!("validation.required")))
}

fn non_blank(value: String, field: &str, max_len: Option<usize>) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(field, t!("validation.blank")));
    }
    if let Some(max) = max_len {
        if trimmed.chars().count() > max {
            return Err(AppError::validation(field, t!("validation.too_long", max = max)));
        }
    }
    Ok(trimmed.to_string())
}

/// Validates a recipe create (`is_create`) or update body.
///
/// Ingredients and tags are required on both; the remaining fields are
/// required on create and optional on update.
pub fn validate_recipe_write(
    req: RecipeWriteRequest,
    is_create: bool,
) -> Result<ValidatedRecipe, AppError> {
    let ingredients = required(req.ingredients, "ingredients")?;
    if ingredients.is_empty() {
        return Err(AppError::validation("ingredients", t!("validation.no_ingredients")));
    }
    let mut seen_ingredients = HashSet::new();
    let mut validated_ingredients = Vec::with_capacity(ingredients.len());
    for item in ingredients {
        if !seen_ingredients.insert(item.id) {
            return Err(AppError::validation(
                "ingredients",
                t!("validation.duplicate_ingredient"),
            ));
        }
        let amount = positive_small(item.amount, "amount")?;
        validated_ingredients.push((item.id, amount));
    }

    let tags = required(req.tags, "tags")?;
    if tags.is_empty() {
        return Err(AppError::validation("tags", t!("validation.no_tags")));
    }
    let mut seen_tags = HashSet::new();
    if tags.iter().any(|id| !seen_tags.insert(*id)) {
        return Err(AppError::validation("tags", t!("validation.duplicate_tag")));
    }

    let name = match req.name {
        Some(name) => Some(non_blank(name, "name", Some(MAX_NAME_LENGTH))?),
        None if is_create => return Err(AppError::validation("name", t!("validation.required"))),
        None => None,
    };
    let text = match req.text {
        Some(text) => Some(non_blank(text, "text", None)?),
        None if is_create => return Err(AppError::validation("text", t!("validation.required"))),
        None => None,
    };
    let cooking_time = match req.cooking_time {
        Some(value) => Some(positive_small(value, "cooking_time")?),
        None if is_create => {
            return Err(AppError::validation("cooking_time", t!("validation.required")))
        }
        None => None,
    };
    let image = match req.image {
        Some(image) if !image.trim().is_empty() => Some(image),
        _ if is_create => return Err(AppError::validation("image", t!("validation.required"))),
        _ => None,
    };

    Ok(ValidatedRecipe {
        name,
        text,
        cooking_time,
        image,
        ingredients: validated_ingredients,
        tags,
    })
}

pub fn validate_password(password: &str, field: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(
            field,
            t!("validation.password_too_short", min = MIN_PASSWORD_LENGTH),
        ));
    }
    Ok(())
}

/// Normalizes and checks a sign-up request.
pub fn validate_registration(req: RegisterRequest) -> Result<RegisterRequest, AppError> {
    let email = req.email.trim().to_lowercase();
    if email.len() > MAX_EMAIL_LENGTH || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::validation("email", t!("validation.invalid_email")));
    }

    let username = non_blank(req.username, "username", Some(MAX_USER_FIELD_LENGTH))?;
    if !USERNAME_RE.is_match(&username) {
        return Err(AppError::validation("username", t!("validation.invalid_username")));
    }

    let first_name = non_blank(req.first_name, "first_name", Some(MAX_USER_FIELD_LENGTH))?;
    let last_name = non_blank(req.last_name, "last_name", Some(MAX_USER_FIELD_LENGTH))?;
    validate_password(&req.password, "password")?;

    Ok(RegisterRequest {
        email,
        username,
        first_name,
        last_name,
        password: req.password,
    })
}

pub fn validate_tag(name: &str, color: &str, slug: &str) -> Result<(), AppError> {
    non_blank(name.to_string(), "name", Some(MAX_NAME_LENGTH))?;
    if !HEX_COLOR_RE.is_match(color) {
        return Err(AppError::validation("color", t!("validation.invalid_color")));
    }
    if slug.len() > MAX_NAME_LENGTH || !SLUG_RE.is_match(slug) {
        return Err(AppError::validation("slug", t!("validation.invalid_slug")));
    }
    Ok(())
}
