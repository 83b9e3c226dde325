use axum::{
    Json, Router,
    extract::{Extension, State},
    http::StatusCode,
    routing::get,
};
use std::sync::Arc;

use crate::db::services::RecipeFilter;
use crate::web::extract::{AppJson, AppPath, AppQuery};
use crate::web::models::AuthenticatedUser;
use crate::web::models::recipe_models::{
    RecipeDetailResponse, RecipeListQuery, RecipeRequest, RecipeResponse,
};
use crate::web::{AppError, AppState};

async fn list_recipes_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<RecipeListQuery>,
) -> Result<Json<Vec<RecipeResponse>>, AppError> {
    let filter = RecipeFilter {
        tag_ids: query.tag_ids()?,
        ingredient_ids: query.ingredient_ids()?,
    };
    let recipes = app_state
        .recipe_service
        .list_recipes(authenticated_user.id, &filter)
        .await?;
    Ok(Json(recipes.into_iter().map(RecipeResponse::from).collect()))
}

async fn create_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<RecipeRequest>,
) -> Result<(StatusCode, Json<RecipeDetailResponse>), AppError> {
    let new_recipe = payload.into_new_recipe()?;
    let created = app_state
        .recipe_service
        .create_recipe(authenticated_user.id, new_recipe)
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn get_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath(recipe_id): AppPath<i32>,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    let recipe = app_state
        .recipe_service
        .get_recipe(authenticated_user.id, recipe_id)
        .await?;
    Ok(Json(recipe.into()))
}

async fn update_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath(recipe_id): AppPath<i32>,
    AppJson(payload): AppJson<RecipeRequest>,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    let changes = payload.into_changes(true)?;
    let updated = app_state
        .recipe_service
        .update_recipe(authenticated_user.id, recipe_id, changes)
        .await?;
    Ok(Json(updated.into()))
}

async fn partial_update_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath(recipe_id): AppPath<i32>,
    AppJson(payload): AppJson<RecipeRequest>,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    let changes = payload.into_changes(false)?;
    let updated = app_state
        .recipe_service
        .update_recipe(authenticated_user.id, recipe_id, changes)
        .await?;
    Ok(Json(updated.into()))
}

async fn delete_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath(recipe_id): AppPath<i32>,
) -> Result<StatusCode, AppError> {
    app_state
        .recipe_service
        .delete_recipe(authenticated_user.id, recipe_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Router ---

pub fn create_recipe_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/recipes/",
            get(list_recipes_handler).post(create_recipe_handler),
        )
        .route(
            "/recipes/{recipe_id}/",
            get(get_recipe_handler)
                .put(update_recipe_handler)
                .patch(partial_update_recipe_handler)
                .delete(delete_recipe_handler),
        )
}
