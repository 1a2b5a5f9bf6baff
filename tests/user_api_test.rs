mod common;

use axum::http::{header, Method, StatusCode};
use common::TestApp;
use foodgram::services::auth_service;
use serde_json::json;

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new().await;
    let (user_id, token) = app.register_and_login("alice").await;

    let me = app.get("/api/users/me/", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    let body = me.json();
    assert_eq!(body["id"], user_id);
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["is_subscribed"], false);
    assert!(body.get("password_hash").is_none());

    assert_eq!(app.get("/api/users/me/", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.get("/api/users/me/", Some("not-a-jwt")).await.status,
        StatusCode::UNAUTHORIZED
    );

    let bad_login = app
        .post(
            "/api/auth/token/login/",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(bad_login.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_sets_cookie_and_logout_clears_it() {
    let app = TestApp::new().await;
    app.register_and_login("carol").await;

    let login = app
        .post(
            "/api/auth/token/login/",
            None,
            Some(json!({ "email": "CAROL@example.com", "password": "correct-horse" })),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let cookie = login.headers[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    let token = login.json()["auth_token"].as_str().unwrap().to_string();

    let logout = app.post("/api/auth/token/logout/", Some(&token), None).await;
    assert_eq!(logout.status, StatusCode::NO_CONTENT);
    let cleared = logout.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with("token=;"));
    assert!(cleared.contains("Max-Age=0"));
    assert_eq!(
        app.post("/api/auth/token/logout/", None, None).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_registration_errors_are_field_scoped() {
    let app = TestApp::new().await;
    app.register_and_login("bob").await;

    let duplicate = app
        .post(
            "/api/users/",
            None,
            Some(json!({
                "email": "bob@example.com",
                "username": "bobby",
                "first_name": "Bob",
                "last_name": "Smith",
                "password": "long-enough",
            })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.json()["field"], "email");

    let short_password = app
        .post(
            "/api/users/",
            None,
            Some(json!({
                "email": "new@example.com",
                "username": "newbie",
                "first_name": "New",
                "last_name": "Bie",
                "password": "short",
            })),
        )
        .await;
    assert_eq!(short_password.status, StatusCode::BAD_REQUEST);
    assert_eq!(short_password.json()["field"], "password");
}

#[tokio::test]
async fn test_set_password() {
    let app = TestApp::new().await;
    let (_, token) = app.register_and_login("dave").await;

    let wrong = app
        .post(
            "/api/users/set_password/",
            Some(&token),
            Some(json!({ "current_password": "nope-nope", "new_password": "brand-new-pass" })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong.json()["field"], "current_password");

    let changed = app
        .post(
            "/api/users/set_password/",
            Some(&token),
            Some(json!({ "current_password": "correct-horse", "new_password": "brand-new-pass" })),
        )
        .await;
    assert_eq!(changed.status, StatusCode::NO_CONTENT);

    let login = app
        .post(
            "/api/auth/token/login/",
            None,
            Some(json!({ "email": "dave@example.com", "password": "brand-new-pass" })),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_self_follow_fails_even_for_admin() {
    let app = TestApp::new().await;
    let (admin_id, admin_token) = app.register_and_login("root").await;
    auth_service::promote_to_admin(&app.db, "root@example.com")
        .await
        .unwrap();

    let response = app
        .post(&format!("/api/users/{admin_id}/subscribe/"), Some(&admin_token), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let subscriptions = app.get("/api/users/subscriptions/", Some(&admin_token)).await;
    assert_eq!(subscriptions.json()["count"], 0);
}

#[tokio::test]
async fn test_subscribe_lifecycle() {
    let app = TestApp::new().await;
    let (author_id, author_token) = app.register_and_login("chef").await;
    let (_, fan_token) = app.register_and_login("follower").await;
    let tag = app.seed_tag("Dinner", "#8775D2", "dinner").await;
    let salt = app.seed_ingredient("salt", "pinch").await;
    for name in ["Stew", "Roast", "Curry"] {
        app.create_recipe(&author_token, name, &[(salt, 1)], &[tag]).await;
    }

    let uri = format!("/api/users/{author_id}/subscribe/");
    let subscribed = app
        .post(&format!("{uri}?recipes_limit=2"), Some(&fan_token), None)
        .await;
    assert_eq!(subscribed.status, StatusCode::CREATED);
    let body = subscribed.json();
    assert_eq!(body["id"], author_id);
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes_count"], 3);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 2);

    assert_eq!(
        app.post(&uri, Some(&fan_token), None).await.status,
        StatusCode::BAD_REQUEST
    );

    let profile = app
        .get(&format!("/api/users/{author_id}/"), Some(&fan_token))
        .await
        .json();
    assert_eq!(profile["is_subscribed"], true);
    let anonymous_profile = app.get(&format!("/api/users/{author_id}/"), None).await.json();
    assert_eq!(anonymous_profile["is_subscribed"], false);

    let subscriptions = app
        .get("/api/users/subscriptions/?recipes_limit=1", Some(&fan_token))
        .await
        .json();
    assert_eq!(subscriptions["count"], 1);
    assert_eq!(subscriptions["results"][0]["username"], "chef");
    assert_eq!(
        subscriptions["results"][0]["recipes"].as_array().unwrap().len(),
        1
    );

    let unparsed_limit = app
        .get("/api/users/subscriptions/?recipes_limit=all", Some(&fan_token))
        .await;
    assert_eq!(unparsed_limit.status, StatusCode::OK);
    assert_eq!(
        unparsed_limit.json()["results"][0]["recipes"]
            .as_array()
            .unwrap()
            .len(),
        3
    );

    assert_eq!(app.delete(&uri, Some(&fan_token)).await.status, StatusCode::NO_CONTENT);
    assert_eq!(app.delete(&uri, Some(&fan_token)).await.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        app.post("/api/users/9999/subscribe/", Some(&fan_token), None)
            .await
            .status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_user_list_and_account_deletion() {
    let app = TestApp::new().await;
    let (owner_id, owner_token) = app.register_and_login("leaving").await;
    let (_, other_token) = app.register_and_login("staying").await;
    let tag = app.seed_tag("Lunch", "#49B64E", "lunch").await;
    let rice = app.seed_ingredient("rice", "g").await;
    let recipe_id = app
        .create_recipe(&owner_token, "Pilaf", &[(rice, 200)], &[tag])
        .await
        .json()["id"]
        .as_i64()
        .unwrap();
    app.post(&format!("/api/recipes/{recipe_id}/favorite/"), Some(&other_token), None)
        .await;
    app.post(&format!("/api/users/{owner_id}/subscribe/"), Some(&other_token), None)
        .await;

    let users = app.get("/api/users/?limit=1", None).await.json();
    assert_eq!(users["count"], 2);
    assert_eq!(users["results"][0]["username"], "leaving");
    assert_eq!(users["next"], "http://testserver/api/users/?limit=1&page=2");

    let user_uri = format!("/api/users/{owner_id}/");
    assert_eq!(app.delete(&user_uri, None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.delete(&user_uri, Some(&other_token)).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.delete(&user_uri, Some(&owner_token)).await.status,
        StatusCode::NO_CONTENT
    );

    assert_eq!(app.get(&user_uri, None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/recipes/", None).await.json()["count"], 0);
    let subscriptions = app.get("/api/users/subscriptions/", Some(&other_token)).await;
    assert_eq!(subscriptions.json()["count"], 0);
    // The deleted account's token no longer authenticates.
    assert_eq!(
        app.request(Method::GET, "/api/users/me/", Some(&owner_token), None)
            .await
            .status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let response = app.get("/api/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "OK");
}
