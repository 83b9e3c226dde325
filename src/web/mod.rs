use axum::{
    Router,
    http::Method,
    middleware as axum_middleware,
    routing::get,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::db::entities::{ingredient, tag};
use crate::db::services::{IngredientService, RecipeService, TagService, UserService};
use crate::server::config::ServerConfig;
use crate::web::{middleware::auth, routes::*};

pub use crate::web::error::AppError;

pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabaseConnection,
    pub config: Arc<ServerConfig>,
    pub user_service: Arc<UserService>,
    pub recipe_service: Arc<RecipeService>,
    pub tag_service: Arc<TagService>,
    pub ingredient_service: Arc<IngredientService>,
}

impl AppState {
    /// Wires every service to the given connection.
    pub fn new(db_pool: DatabaseConnection, config: Arc<ServerConfig>) -> Self {
        Self {
            user_service: Arc::new(UserService::new(db_pool.clone(), config.bcrypt_cost)),
            recipe_service: Arc::new(RecipeService::new(db_pool.clone())),
            tag_service: Arc::new(TagService::new(db_pool.clone())),
            ingredient_service: Arc::new(IngredientService::new(db_pool.clone())),
            db_pool,
            config,
        }
    }
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest(
            "/api/user",
            user_routes::create_public_router().merge(
                user_routes::create_protected_router()
                    .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
            ),
        )
        .nest(
            "/api/recipe",
            recipe_routes::create_recipe_router()
                .merge(label_routes::create_label_router::<tag::Entity>())
                .merge(label_routes::create_label_router::<ingredient::Entity>())
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .with_state(app_state)
        .layer(cors)
}
