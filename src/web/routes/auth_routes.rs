use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

use crate::services::auth_service;
use crate::web::middleware::auth::TOKEN_COOKIE;
use crate::web::models::{LoginRequest, LoginResponse};
use crate::web::{AppError, AppState};

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let login_response = auth_service::login_user(
        &app_state.db_pool,
        payload,
        &app_state.config.jwt_secret,
        app_state.config.token_ttl_hours,
    )
    .await?;

    let auth_cookie = Cookie::build((TOKEN_COOKIE, login_response.auth_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build();

    Ok((jar.add(auth_cookie), Json(login_response)))
}

/// Tokens are stateless; logging out only clears the cookie. The expired
/// cookie is sent even when the request authenticated with a header.
async fn logout_handler(jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.add(expired_token_cookie()),
        StatusCode::NO_CONTENT,
    )
}

fn expired_token_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build();
    cookie.make_removal();
    cookie
}

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/auth/token/login/", post(login_handler))
}

pub fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new().route("/auth/token/logout/", post(logout_handler))
}
