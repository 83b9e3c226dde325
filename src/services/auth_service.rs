use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};

use crate::db::entities::user;
use crate::db::services::UserService;
use crate::server::config::ServerConfig;
use crate::web::error::AppError;
use crate::web::models::{Claims, LoginRequest, LoginResponse};

pub async fn login_user(
    users: &UserService,
    req: LoginRequest,
    config: &ServerConfig,
) -> Result<LoginResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput("Email and password must not be empty.".to_string()));
    }

    let user = users.authenticate(&req.email, &req.password).await.inspect_err(|e| {
        if matches!(e, AppError::InvalidCredentials) {
            warn!("Rejected login attempt.");
        }
    })?;

    let response = create_jwt_for_user(&user, &config.jwt_secret, config.token_ttl_hours)?;
    info!(user_id = user.id, "User logged in.");
    Ok(response)
}

pub fn create_jwt_for_user(
    user: &user::Model,
    jwt_secret: &str,
    ttl_hours: i64,
) -> Result<LoginResponse, AppError> {
    let expiration = Duration::try_hours(ttl_hours)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::TokenCreationError(format!("Token lifetime of {ttl_hours} hours is out of range"))
        })?
        .timestamp()
        .max(0) as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        exp: expiration,
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_ref()))
        .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(LoginResponse {
        token,
        user_id: user.id,
        email: user.email.clone(),
    })
}

/// Verifies signature and expiry of a session token.
pub fn decode_jwt(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = ?e, "JWT decoding error.");
        AppError::InvalidCredentials
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> user::Model {
        let now = Utc::now();
        user::Model {
            id: 7,
            email: "test@example.com".to_string(),
            name: "Test".to_string(),
            password_hash: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn token_round_trip() {
        let login = create_jwt_for_user(&sample_user(), "secret", 1).unwrap();
        assert_eq!(login.user_id, 7);

        let claims = decode_jwt(&login.token, "secret").unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.sub, "test@example.com");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let login = create_jwt_for_user(&sample_user(), "secret", 1).unwrap();
        assert!(matches!(
            decode_jwt(&login.token, "other"),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let login = create_jwt_for_user(&sample_user(), "secret", -2).unwrap();
        assert!(matches!(
            decode_jwt(&login.token, "secret"),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn out_of_range_lifetime_is_an_error() {
        for ttl in [i64::MAX, 10_000_000_000] {
            assert!(matches!(
                create_jwt_for_user(&sample_user(), "secret", ttl),
                Err(AppError::TokenCreationError(_))
            ));
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_jwt("not-a-token", "secret").is_err());
    }
}
