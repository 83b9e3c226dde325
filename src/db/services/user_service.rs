use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::info;

use crate::db::entities::user;
use crate::web::error::{AppError, FieldErrors};

/// Optional attributes of a new account.
#[derive(Debug, Clone)]
pub struct UserExtra {
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Default for UserExtra {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }
}

/// Lower-cases the domain part of an email address. The local part is kept
/// as given, since mailboxes may be case-sensitive.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(db: DatabaseConnection, bcrypt_cost: u32) -> Self {
        Self { db, bcrypt_cost }
    }

    /// Creates an account with a normalized email and a bcrypt-hashed password.
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        extra: UserExtra,
    ) -> Result<user::Model, AppError> {
        let email = normalize_email(email);
        if email.is_empty() {
            let mut errors = FieldErrors::new();
            errors.add("email", "Users must have an email address.");
            return Err(AppError::Validation(errors));
        }

        if self.get_user_by_email(&email).await?.is_some() {
            return Err(AppError::UserAlreadyExists(
                "A user with this email already exists.".to_string(),
            ));
        }

        let password_hash = self.hash_password(password)?;
        let now = Utc::now();
        let new_user = user::ActiveModel {
            email: Set(email),
            name: Set(extra.name),
            password_hash: Set(password_hash),
            is_active: Set(extra.is_active),
            is_staff: Set(extra.is_staff),
            is_superuser: Set(extra.is_superuser),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default() // id is set by the database
        };
        let user_model = new_user.insert(&self.db).await?;
        info!(user_id = user_model.id, is_superuser = user_model.is_superuser, "User created.");
        Ok(user_model)
    }

    /// Creates an account that is both staff and superuser.
    pub async fn create_superuser(&self, email: &str, password: &str) -> Result<user::Model, AppError> {
        self.create_user(
            email,
            password,
            UserExtra {
                is_staff: true,
                is_superuser: true,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn get_user_by_id(&self, user_id: i32) -> Result<Option<user::Model>, AppError> {
        Ok(user::Entity::find_by_id(user_id).one(&self.db).await?)
    }

    /// Looks a user up by email; the address is normalized first.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<user::Model>, AppError> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await?)
    }

    /// Returns the active user owning these credentials.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<user::Model, AppError> {
        let user = self
            .get_user_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active || !user.check_password(password) {
            return Err(AppError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Updates the caller's own profile. `None` leaves a field unchanged.
    pub async fn update_user(
        &self,
        user_id: i32,
        name: Option<String>,
        password: Option<String>,
    ) -> Result<user::Model, AppError> {
        let user_model = self
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if name.is_none() && password.is_none() {
            return Ok(user_model);
        }

        let mut active_model: user::ActiveModel = user_model.into();
        if let Some(name) = name {
            active_model.name = Set(name);
        }
        if let Some(password) = password {
            active_model.password_hash = Set(self.hash_password(&password)?);
        }
        active_model.updated_at = Set(Utc::now());
        Ok(active_model.update(&self.db).await?)
    }

    fn hash_password(&self, password: &str) -> Result<String, AppError> {
        bcrypt::hash(password, self.bcrypt_cost)
            .map_err(|e| AppError::PasswordHashingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_email;

    #[test]
    fn normalizes_domain_only() {
        let samples = [
            ("test1@EXAMPLE.com", "test1@example.com"),
            ("Test2@Example.com", "Test2@example.com"),
            ("TEST3@EXAMPLE.com", "TEST3@example.com"),
            ("test4@example.COM", "test4@example.com"),
        ];
        for (email, expected) in samples {
            assert_eq!(normalize_email(email), expected);
        }
    }

    #[test]
    fn splits_on_last_at_sign() {
        assert_eq!(normalize_email("\"a@b\"@EXAMPLE.org"), "\"a@b\"@example.org");
    }

    #[test]
    fn leaves_values_without_domain_alone() {
        assert_eq!(normalize_email(""), "");
        assert_eq!(normalize_email("NoDomain"), "NoDomain");
    }
}
