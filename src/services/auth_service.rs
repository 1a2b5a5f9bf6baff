use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use tracing::{info, warn};

use crate::db::entities::user;
use crate::db::enums::UserRole;
use crate::services::validation;
use crate::web::error::{is_unique_violation, AppError};
use crate::web::models::user_models::{RegisterRequest, SetPasswordRequest};
use crate::web::models::{AuthenticatedUser, Claims, LoginRequest, LoginResponse};

pub async fn register_user(
    pool: &DatabaseConnection,
    req: RegisterRequest,
    password_cost: u32,
) -> Result<user::Model, AppError> {
    let req = validation::validate_registration(req)?;

    let email_taken = user::Entity::find()
        .filter(user::Column::Email.eq(&req.email))
        .one(pool)
        .await?
        .is_some();
    if email_taken {
        return Err(AppError::validation("email", t!("errors.email_taken")));
    }

    let username_taken = user::Entity::find()
        .filter(user::Column::Username.eq(&req.username))
        .one(pool)
        .await?
        .is_some();
    if username_taken {
        return Err(AppError::validation("username", t!("errors.username_taken")));
    }

    let password_hash = hash(&req.password, password_cost)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    let new_user = user::ActiveModel {
        email: Set(req.email),
        username: Set(req.username),
        first_name: Set(req.first_name),
        last_name: Set(req.last_name),
        password_hash: Set(password_hash),
        role: Set(UserRole::User.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let user_model = new_user.insert(pool).await.map_err(|db_err: DbErr| {
        if is_unique_violation(&db_err) {
            AppError::validation("email", t!("errors.email_taken"))
        } else {
            AppError::DatabaseError(db_err.to_string())
        }
    })?;
    info!(user_id = user_model.id, "Registered new user.");
    Ok(user_model)
}

pub async fn login_user(
    pool: &DatabaseConnection,
    req: LoginRequest,
    jwt_secret: &str,
    token_ttl_hours: i64,
) -> Result<LoginResponse, AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(t!("errors.credentials_required").to_string()));
    }

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(req.email.trim().to_lowercase()))
        .one(pool)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        warn!(user_id = user.id, "Rejected login with a wrong password.");
        return Err(AppError::InvalidCredentials);
    }

    let token = create_jwt_for_user(&user, jwt_secret, token_ttl_hours)?;
    Ok(LoginResponse { auth_token: token })
}

pub fn create_jwt_for_user(
    user: &user::Model,
    jwt_secret: &str,
    token_ttl_hours: i64,
) -> Result<String, AppError> {
    let expiration = (Utc::now() + Duration::hours(token_ttl_hours)).timestamp() as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        exp: expiration,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_ref()))
        .map_err(|e| AppError::TokenCreationError(e.to_string()))
}

/// Resolves a bearer token to the current state of its user.
///
/// The user row is reloaded so a deleted account or a changed role takes
/// effect on the next request.
pub async fn authenticate_token(
    pool: &DatabaseConnection,
    token: &str,
    jwt_secret: &str,
) -> Result<AuthenticatedUser, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!(error = ?e, "JWT decoding error during authentication.");
        AppError::InvalidCredentials
    })?;

    let user = user::Entity::find_by_id(token_data.claims.user_id)
        .one(pool)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    Ok(AuthenticatedUser {
        id: user.id,
        username: user.username,
        is_admin: user.role.parse::<UserRole>() == Ok(UserRole::Admin),
    })
}

pub async fn set_password(
    pool: &DatabaseConnection,
    caller: &AuthenticatedUser,
    req: SetPasswordRequest,
    password_cost: u32,
) -> Result<(), AppError> {
    let user_model = user::Entity::find_by_id(caller.id)
        .one(pool)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid_password = verify(&req.current_password, &user_model.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        return Err(AppError::validation(
            "current_password",
            t!("errors.wrong_password"),
        ));
    }

    validation::validate_password(&req.new_password, "new_password")?;

    let new_password_hash = hash(&req.new_password, password_cost)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    let mut user_active_model: user::ActiveModel = user_model.into();
    user_active_model.password_hash = Set(new_password_hash);
    user_active_model.update(pool).await?;
    info!(user_id = caller.id, "Password changed.");
    Ok(())
}

/// Grants the admin role. Used by the `promote` CLI command.
pub async fn promote_to_admin(pool: &DatabaseConnection, email: &str) -> Result<user::Model, AppError> {
    let user_model = user::Entity::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(t!("errors.user_not_found").to_string()))?;

    let mut active: user::ActiveModel = user_model.into();
    active.role = Set(UserRole::Admin.to_string());
    Ok(active.update(pool).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> user::Model {
        user::Model {
            id: 7,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            password_hash: String::new(),
            role: "user".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_carries_user_id() {
        let token = create_jwt_for_user(&sample_user(), "secret", 1).unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.user_id, 7);
        assert_eq!(data.claims.sub, "cook@example.com");
    }

    #[test]
    fn test_token_rejected_with_other_secret() {
        let token = create_jwt_for_user(&sample_user(), "secret", 1).unwrap();
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}
