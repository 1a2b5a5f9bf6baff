//! Drives the full router in-process against an in-memory SQLite database.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use foodgram::db;
use foodgram::db::services::{get_or_create_ingredient, get_or_create_tag};
use foodgram::server::config::ServerConfig;
use foodgram::web::create_axum_router;

// 1x1 transparent PNG
pub const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub media: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is UTF-8")
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let media = tempfile::tempdir().expect("temp media dir");
        let db = db::connect("sqlite::memory:").await.expect("sqlite schema");
        let config = ServerConfig {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            base_url: "http://testserver".to_string(),
            listen_addr: "127.0.0.1:0".to_string(),
            media_dir: media.path().to_string_lossy().into_owned(),
            log_dir: media.path().to_string_lossy().into_owned(),
            page_size: 6,
            token_ttl_hours: 1,
            password_cost: 4,
        };
        let router = create_axum_router(db.clone(), Arc::new(config));
        Self { router, db, media }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request builds"))
            .await
            .expect("router responds");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        self.request(Method::POST, uri, token, body).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Registers `username` with a fixed password and returns (user id, token).
    pub async fn register_and_login(&self, username: &str) -> (i32, String) {
        let email = format!("{username}@example.com");
        let registered = self
            .post(
                "/api/users/",
                None,
                Some(json!({
                    "email": email,
                    "username": username,
                    "first_name": "Test",
                    "last_name": "Cook",
                    "password": "correct-horse",
                })),
            )
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.text());
        let id = registered.json()["id"].as_i64().expect("user id") as i32;

        let login = self
            .post(
                "/api/auth/token/login/",
                None,
                Some(json!({ "email": email, "password": "correct-horse" })),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.text());
        let token = login.json()["auth_token"]
            .as_str()
            .expect("auth token")
            .to_string();
        (id, token)
    }

    pub async fn seed_tag(&self, name: &str, color: &str, slug: &str) -> i32 {
        get_or_create_tag(&self.db, name, color, slug)
            .await
            .expect("tag seeded")
            .0
            .id
    }

    pub async fn seed_ingredient(&self, name: &str, unit: &str) -> i32 {
        get_or_create_ingredient(&self.db, name, unit)
            .await
            .expect("ingredient seeded")
            .0
            .id
    }

    /// POSTs a recipe; `ingredients` are (id, amount) pairs.
    pub async fn create_recipe(
        &self,
        token: &str,
        name: &str,
        ingredients: &[(i32, i64)],
        tags: &[i32],
    ) -> TestResponse {
        let ingredients: Vec<Value> = ingredients
            .iter()
            .map(|(id, amount)| json!({ "id": id, "amount": amount }))
            .collect();
        self.post(
            "/api/recipes/",
            Some(token),
            Some(json!({
                "ingredients": ingredients,
                "tags": tags,
                "image": PNG,
                "name": name,
                "text": "Mix everything and bake.",
                "cooking_time": 30,
            })),
        )
        .await
    }
}
