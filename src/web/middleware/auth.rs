use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::services::auth_service;
use crate::web::models::AuthenticatedUser;
use crate::web::{error::AppError, AppState};

pub const TOKEN_COOKIE: &str = "token";

/// Reads the token from `Authorization: Token <jwt>`, `Authorization: Bearer <jwt>`
/// or the `token` cookie, in that order.
fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Token ")
                .or_else(|| value.strip_prefix("Bearer "))
        })
        .map(|token| token.trim().to_string())
        .or_else(|| jar.get(TOKEN_COOKIE).map(|c| c.value().to_string()))
        .filter(|token| !token.is_empty())
}

/// Resolves the caller for every API request.
///
/// Inserts `Option<AuthenticatedUser>`: `None` for anonymous requests. A
/// token that is present but invalid is rejected with 401.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let caller = match extract_token(req.headers(), &jar) {
        Some(token) => Some(
            auth_service::authenticate_token(&state.db_pool, &token, &state.config.jwt_secret)
                .await?,
        ),
        None => None,
    };

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

/// Route layer for endpoints that need a signed-in caller. Exposes the caller
/// as a plain `AuthenticatedUser` extension.
pub async fn require_auth(mut req: Request<AxumBody>, next: Next) -> Result<Response, AppError> {
    let caller = req
        .extensions()
        .get::<Option<AuthenticatedUser>>()
        .cloned()
        .flatten()
        .ok_or_else(|| AppError::Unauthorized(t!("errors.auth_required").to_string()))?;

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

/// For handlers that serve anonymous reads and authenticated writes on one path.
pub fn require_user(caller: Option<AuthenticatedUser>) -> Result<AuthenticatedUser, AppError> {
    caller.ok_or_else(|| AppError::Unauthorized(t!("errors.auth_required").to_string()))
}
