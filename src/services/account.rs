use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::Deserialize;
use validator::Validate;

use crate::entities::user::{self, hash_password, Role};
use crate::error::AppError;
use crate::middleware::auth::TokenKeys;

static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").expect("username pattern is valid"));

#[derive(Deserialize, Validate, Clone)]
pub struct Credentials {
    #[validate(regex(
        path = *USERNAME_REGEX,
        message = "must be 3 to 32 latin letters, digits, `_`, `.` or `-`"
    ))]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub password: String,
}

/// Creates a regular (non-admin) account.
pub async fn register(db: &DatabaseConnection, input: Credentials) -> Result<user::Model, AppError> {
    input.validate()?;

    let password = hash_password(&input.password)
        .map_err(|err| AppError::Internal(format!("Failed to hash password: {err}")))?;

    let created = user::ActiveModel {
        username: Set(input.username.clone()),
        password: Set(password),
        role: Set(Role::User),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::invalid("username", "is already taken")
        }
        _ => AppError::Database(err),
    })?;

    tracing::info!(user_id = created.id, username = %created.username, "Registered user");
    Ok(created)
}

/// Checks the credentials and issues an access token.
pub async fn login(
    db: &DatabaseConnection,
    keys: &TokenKeys,
    username: &str,
    password: &str,
) -> Result<String, AppError> {
    let found = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;

    let account = match found {
        Some(account) if account.check_hash(password).is_ok() => account,
        _ => {
            tracing::debug!(username = %username, "Login rejected");
            return Err(AppError::Unauthenticated);
        }
    };

    Ok(keys.issue(account.id, account.role)?)
}
