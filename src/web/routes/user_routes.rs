use axum::{
    Json, Router,
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

use crate::db::services::UserExtra;
use crate::services::auth_service;
use crate::web::error::FieldErrors;
use crate::web::extract::AppJson;
use crate::web::middleware::auth::TOKEN_COOKIE;
use crate::web::models::recipe_models::MAX_CHAR_LEN;
use crate::web::models::{
    AuthenticatedUser, LoginRequest, LoginResponse, MIN_PASSWORD_LEN, RegisterRequest,
    UpdateUserRequest, UserResponse,
};
use crate::web::{AppError, AppState};

/// Routes reachable without a token.
pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create/", post(create_user_handler))
        .route("/token/", post(token_handler))
}

pub fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/me/",
        get(get_me_handler)
            .put(update_me_handler)
            .patch(update_me_handler),
    )
}

fn is_valid_email(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn check_password_length(errors: &mut FieldErrors, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
        );
    }
}

fn validate_registration(payload: &RegisterRequest) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    let email = payload.email.trim();
    if email.is_empty() {
        errors.add("email", "This field may not be blank.");
    } else if !is_valid_email(email) {
        errors.add("email", "Enter a valid email address.");
    }
    if payload.password.is_empty() {
        errors.add("password", "This field may not be blank.");
    } else {
        check_password_length(&mut errors, &payload.password);
    }
    if payload.name.trim().chars().count() > MAX_CHAR_LEN {
        errors.add(
            "name",
            format!("Ensure this field has no more than {MAX_CHAR_LEN} characters."),
        );
    }
    errors.into_result()
}

async fn create_user_handler(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    validate_registration(&payload)?;
    let user_model = app_state
        .user_service
        .create_user(
            payload.email.trim(),
            &payload.password,
            UserExtra {
                name: payload.name.trim().to_string(),
                ..Default::default()
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(user_model.into())))
}

async fn token_handler(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let login_response =
        auth_service::login_user(&app_state.user_service, payload, &app_state.config).await?;

    let auth_cookie = Cookie::build((TOKEN_COOKIE, login_response.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(app_state.config.cookie_secure)
        .build();

    Ok((jar.add(auth_cookie), Json(login_response)))
}

async fn get_me_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<UserResponse>, AppError> {
    let user_model = app_state
        .user_service
        .get_user_by_id(authenticated_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user_model.into()))
}

async fn update_me_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let mut errors = FieldErrors::new();
    let name = payload.name.map(|n| n.trim().to_string());
    if name.as_deref().is_some_and(str::is_empty) {
        errors.add("name", "This field may not be blank.");
    }
    if let Some(password) = &payload.password {
        check_password_length(&mut errors, password);
    }
    errors.into_result()?;

    let updated = app_state
        .user_service
        .update_user(authenticated_user.id, name, payload.password)
        .await?;
    Ok(Json(updated.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str, name: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for email in ["", "plain", "@example.com", "user@", "user@.com", "user@com", "a b@x.com"] {
            assert!(!is_valid_email(email), "{email} should be rejected");
        }
    }

    #[test]
    fn short_password_is_a_field_error() {
        let err = validate_registration(&request("test@example.com", "pw", "Test")).unwrap_err();
        match err {
            AppError::Validation(fields) => {
                assert!(fields.get("password").is_some());
                assert!(fields.get("email").is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(validate_registration(&request("test@example.com", "testpass123", "Test")).is_ok());
    }
}
