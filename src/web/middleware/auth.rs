use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::warn;

use crate::services::auth_service;
use crate::web::models::AuthenticatedUser;
use crate::web::{AppState, error::AppError};

/// Name of the cookie set on login.
pub const TOKEN_COOKIE: &str = "token";

/// Rejects the request with 401 unless it carries a valid token for an
/// existing, active user. On success the caller is available to handlers as
/// `Extension<AuthenticatedUser>`.
pub async fn auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    // Bearer header wins over the cookie
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|s| s.to_string())
        .or_else(|| jar.get(TOKEN_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?;

    let claims = auth_service::decode_jwt(&token, &state.config.jwt_secret)?;

    let user = state
        .user_service
        .get_user_by_id(claims.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| {
            warn!(user_id = claims.user_id, "Token for unknown or inactive user.");
            AppError::InvalidCredentials
        })?;

    let authenticated_user = AuthenticatedUser {
        id: user.id,
        email: user.email,
    };
    req.extensions_mut().insert(authenticated_user);
    Ok(next.run(req).await)
}
