mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use common::{PASSWORD, read_json, spawn_app, spawn_app_with, test_config};
use recipe_api::db::entities::user;
use recipe_api::db::services::UserExtra;
use recipe_api::web::AppError;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;

const CREATE_URL: &str = "/api/user/create/";
const TOKEN_URL: &str = "/api/user/token/";
const ME_URL: &str = "/api/user/me/";

#[tokio::test]
async fn health_check() {
    let app = spawn_app().await;
    let (status, body) = app.request(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn create_user_success() {
    let app = spawn_app().await;
    let payload = json!({ "email": "test@EXAMPLE.com", "password": "testpass123", "name": "Test Name" });
    let (status, body) = app.request(Method::POST, CREATE_URL, None, Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "email": "test@example.com", "name": "Test Name" }));

    let stored = app
        .state
        .user_service
        .get_user_by_email("test@example.com")
        .await
        .unwrap()
        .expect("user stored");
    assert!(stored.check_password("testpass123"));
    assert!(!stored.check_password("testpass124"));
    assert!(stored.is_active);
    assert!(!stored.is_staff);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = spawn_app().await;
    app.create_user("test@example.com").await;
    let payload = json!({ "email": "test@example.com", "password": "testpass123", "name": "Again" });
    let (status, _) = app.request(Method::POST, CREATE_URL, None, Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = spawn_app().await;
    let payload = json!({ "email": "test@example.com", "password": "pw", "name": "Test" });
    let (status, body) = app.request(Method::POST, CREATE_URL, None, Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["password"].is_array());

    let stored = app
        .state
        .user_service
        .get_user_by_email("test@example.com")
        .await
        .unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let app = spawn_app().await;
    let payload = json!({ "email": "not-an-email", "password": "testpass123", "name": "Test" });
    let (status, body) = app.request(Method::POST, CREATE_URL, None, Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["email"].is_array());
}

#[tokio::test]
async fn token_is_issued_for_valid_credentials() {
    let app = spawn_app().await;
    let user = app.create_user("test@example.com").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(TOKEN_URL)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "test@example.com", "password": PASSWORD }).to_string(),
        ))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .expect("token cookie");
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    // Plain HTTP by default.
    assert!(!cookie.contains("Secure"));

    let body = read_json(response).await;
    assert_eq!(body["user_id"], user.id);
    assert_eq!(body["email"], "test@example.com");
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn token_cookie_is_secure_when_configured() {
    let app = spawn_app_with(recipe_api::server::config::ServerConfig {
        cookie_secure: true,
        ..test_config()
    })
    .await;
    app.create_user("test@example.com").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(TOKEN_URL)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "test@example.com", "password": PASSWORD }).to_string(),
        ))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("token cookie");
    assert!(cookie.contains("Secure"));
}

#[tokio::test]
async fn token_is_refused_for_bad_credentials() {
    let app = spawn_app().await;
    app.create_user("test@example.com").await;

    let payload = json!({ "email": "test@example.com", "password": "badpass" });
    let (status, body) = app.request(Method::POST, TOKEN_URL, None, Some(payload)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("token").is_none());

    let payload = json!({ "email": "nobody@example.com", "password": PASSWORD });
    let (status, _) = app.request(Method::POST, TOKEN_URL, None, Some(payload)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let payload = json!({ "email": "test@example.com", "password": "" });
    let (status, _) = app.request(Method::POST, TOKEN_URL, None, Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_requires_authentication() {
    let app = spawn_app().await;
    let (status, _) = app.request(Method::GET, ME_URL, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_is_returned_for_bearer_and_cookie() {
    let app = spawn_app().await;
    let user = app.create_user("test@example.com").await;
    let token = app.token_for(&user);

    let (status, body) = app.get(ME_URL, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "email": "test@example.com", "name": "Test Name" }));

    let request = Request::builder()
        .uri(ME_URL)
        .header(header::COOKIE, format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn post_to_profile_is_not_allowed() {
    let app = spawn_app().await;
    let user = app.create_user("test@example.com").await;
    let (status, _) = app
        .request(Method::POST, ME_URL, Some(&app.token_for(&user)), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn profile_update_changes_name_and_password() {
    let app = spawn_app().await;
    let user = app.create_user("test@example.com").await;

    let payload = json!({ "name": "Updated name", "password": "newpassword123" });
    let (status, body) = app
        .request(Method::PATCH, ME_URL, Some(&app.token_for(&user)), Some(payload))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Updated name");

    let stored = app.state.user_service.get_user_by_id(user.id).await.unwrap().unwrap();
    assert!(stored.check_password("newpassword123"));
    assert!(!stored.check_password(PASSWORD));

    let (status, _) = app
        .request(
            Method::PATCH,
            ME_URL,
            Some(&app.token_for(&user)),
            Some(json!({ "password": "abc" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn inactive_user_is_locked_out() {
    let app = spawn_app().await;
    let user = app.create_user("test@example.com").await;
    let token = app.token_for(&user);

    let mut active: user::ActiveModel = user.into();
    active.is_active = Set(false);
    active.update(&app.state.db_pool).await.unwrap();

    let (status, _) = app.get(ME_URL, &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let payload = json!({ "email": "test@example.com", "password": PASSWORD });
    let (status, _) = app.request(Method::POST, TOKEN_URL, None, Some(payload)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn new_user_email_domain_is_normalized() {
    let app = spawn_app().await;
    let samples = [
        ("test1@EXAMPLE.com", "test1@example.com"),
        ("Test2@Example.com", "Test2@example.com"),
        ("TEST3@EXAMPLE.COM", "TEST3@example.com"),
        ("test4@example.COM", "test4@example.com"),
    ];
    for (raw, expected) in samples {
        let created = app.create_user(raw).await;
        assert_eq!(created.email, expected);
    }
}

#[tokio::test]
async fn new_user_without_email_fails() {
    let app = spawn_app().await;
    let result = app
        .state
        .user_service
        .create_user("", "test123", UserExtra::default())
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn create_superuser_sets_flags() {
    let app = spawn_app().await;
    let admin = app
        .state
        .user_service
        .create_superuser("admin@example.com", "test123")
        .await
        .unwrap();
    assert!(admin.is_superuser);
    assert!(admin.is_staff);
    assert!(admin.is_active);
}
