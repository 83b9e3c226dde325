use axum::{
    Json, Router,
    extract::{Extension, State},
    http::StatusCode,
    routing::get,
};
use std::sync::Arc;

use crate::db::entities::{ingredient, tag};
use crate::db::services::{Label, LabelService};
use crate::web::extract::{AppJson, AppPath, AppQuery};
use crate::web::models::AuthenticatedUser;
use crate::web::models::recipe_models::{
    LabelListQuery, LabelPayload, LabelResponse, validate_label_name,
};
use crate::web::{AppError, AppState};

/// A label kind exposed as a `/<collection>/` and `/<collection>/{id}/` resource.
pub trait LabelResource: Label {
    const COLLECTION: &'static str;

    fn service(app_state: &AppState) -> &LabelService<Self>;
}

impl LabelResource for tag::Entity {
    const COLLECTION: &'static str = "/tags/";

    fn service(app_state: &AppState) -> &LabelService<Self> {
        &app_state.tag_service
    }
}

impl LabelResource for ingredient::Entity {
    const COLLECTION: &'static str = "/ingredients/";

    fn service(app_state: &AppState) -> &LabelService<Self> {
        &app_state.ingredient_service
    }
}

// --- Route Handlers ---

async fn list_labels_handler<E: LabelResource>(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<LabelListQuery>,
) -> Result<Json<Vec<LabelResponse>>, AppError> {
    let labels = E::service(&app_state)
        .list(authenticated_user.id, query.assigned_only())
        .await?;
    Ok(Json(labels.iter().map(LabelResponse::from_label::<E>).collect()))
}

async fn create_label_handler<E: LabelResource>(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<LabelPayload>,
) -> Result<(StatusCode, Json<LabelResponse>), AppError> {
    let name = validate_label_name(payload)?;
    let label = E::service(&app_state)
        .create(authenticated_user.id, &name)
        .await?;
    Ok((StatusCode::CREATED, Json(LabelResponse::from_label::<E>(&label))))
}

async fn update_label_handler<E: LabelResource>(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath(label_id): AppPath<i32>,
    AppJson(payload): AppJson<LabelPayload>,
) -> Result<Json<LabelResponse>, AppError> {
    let name = validate_label_name(payload)?;
    let label = E::service(&app_state)
        .rename(authenticated_user.id, label_id, &name)
        .await?;
    Ok(Json(LabelResponse::from_label::<E>(&label)))
}

async fn delete_label_handler<E: LabelResource>(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath(label_id): AppPath<i32>,
) -> Result<StatusCode, AppError> {
    E::service(&app_state)
        .delete(authenticated_user.id, label_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Router ---

pub fn create_label_router<E: LabelResource>() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            E::COLLECTION,
            get(list_labels_handler::<E>).post(create_label_handler::<E>),
        )
        .route(
            &format!("{}{{label_id}}/", E::COLLECTION),
            axum::routing::put(update_label_handler::<E>)
                .patch(update_label_handler::<E>)
                .delete(delete_label_handler::<E>),
        )
}
