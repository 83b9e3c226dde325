#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use recipe_api::db::entities::user;
use recipe_api::db::schema;
use recipe_api::db::services::{NewRecipe, RecipeWithLabels, UserExtra};
use recipe_api::server::config::ServerConfig;
use recipe_api::services::auth_service;
use recipe_api::web::{AppState, create_axum_router};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "testpass123";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        log_dir: "logs".to_string(),
        token_ttl_hours: 1,
        bcrypt_cost: 4,
        max_connections: 1,
        cookie_secure: false,
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

/// Builds the full router over a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: ServerConfig) -> TestApp {
    let mut opt = ConnectOptions::new(config.database_url.clone());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect to sqlite");
    schema::create_tables(&db).await.expect("create tables");

    let state = Arc::new(AppState::new(db, Arc::new(config)));
    TestApp {
        router: create_axum_router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn create_user(&self, email: &str) -> user::Model {
        self.state
            .user_service
            .create_user(
                email,
                PASSWORD,
                UserExtra {
                    name: "Test Name".to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect("create user")
    }

    pub fn token_for(&self, user: &user::Model) -> String {
        auth_service::create_jwt_for_user(user, &self.state.config.jwt_secret, 1)
            .expect("create token")
            .token
    }

    /// Creates a recipe directly through the service with default values.
    pub async fn create_recipe(&self, user_id: i32, title: &str) -> RecipeWithLabels {
        self.create_recipe_with(user_id, title, None, None).await
    }

    pub async fn create_recipe_with(
        &self,
        user_id: i32,
        title: &str,
        tags: Option<Vec<&str>>,
        ingredients: Option<Vec<&str>>,
    ) -> RecipeWithLabels {
        let to_owned = |names: Vec<&str>| names.into_iter().map(String::from).collect();
        self.state
            .recipe_service
            .create_recipe(
                user_id,
                NewRecipe {
                    title: title.to_string(),
                    time_minutes: 22,
                    price: Decimal::new(525, 2),
                    description: "Sample description".to_string(),
                    link: "http://example.com/recipe.pdf".to_string(),
                    tags: tags.map(to_owned),
                    ingredients: ingredients.map(to_owned),
                },
            )
            .await
            .expect("create recipe")
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Sends a JSON request and returns the status with the decoded body.
    /// An empty body decodes to `Value::Null`, a non-JSON one to a string.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self.send(request).await;
        let status = response.status();
        (status, read_json(response).await)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }
}

pub async fn read_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}

pub fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .expect("array body")
        .iter()
        .map(|item| item["id"].as_i64().expect("id"))
        .collect()
}

pub fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .expect("array body")
        .iter()
        .map(|item| item["name"].as_str().expect("name").to_string())
        .collect()
}

pub fn recipe_url(recipe_id: i32) -> String {
    format!("/api/recipe/recipes/{recipe_id}/")
}
