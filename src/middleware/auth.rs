use crate::entities::user::{Entity as UserEntity, Role};
use crate::error::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};
use thiserror::Error;

/// Resolves the bearer token into a [`CurrentUser`] request extension.
///
/// With `role: Some(..)` the resolved user must hold exactly that role,
/// otherwise the request is rejected with `Forbidden`.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthenticated)?;

    let user = resolve_user(&state.db, &state.keys, token).await?;

    if let Some(required) = state.role {
        if user.role != required {
            tracing::warn!(user_id = user.user_id, role = %user.role, "Role check failed");
            return Err(AppError::Forbidden);
        }
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub role: String,
    pub exp: usize,
}

/// Identity of the caller, passed explicitly into services.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i32,
    pub role: Role,
}

impl CurrentUser {
    pub fn require(user: Option<CurrentUser>) -> Result<CurrentUser, AppError> {
        user.ok_or(AppError::Unauthenticated)
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub keys: TokenKeys,
    pub role: Option<Role>,
}

#[derive(Clone)]
pub struct TokenKeys {
    secret: Arc<str>,
    ttl_hours: i64,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            secret: Arc::from(secret),
            ttl_hours,
        }
    }

    pub fn issue(&self, user_id: i32, role: Role) -> Result<String, AuthError> {
        let exp = Utc::now()
            .checked_add_signed(Duration::hours(self.ttl_hours))
            .ok_or(AuthError::GenerationFail)?
            .timestamp() as usize;

        let claims = Claims {
            user_id,
            role: role.to_string(),
            exp,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|_| AuthError::GenerationFail)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
    }
}

/// The role stored on the user row wins over the one inside the token.
pub async fn resolve_user(
    db: &DatabaseConnection,
    keys: &TokenKeys,
    token: &str,
) -> Result<CurrentUser, AuthError> {
    let claims = keys.verify(token)?;
    Role::from_str(&claims.role).map_err(|_| AuthError::InvalidUserOrRole)?;

    match UserEntity::find_by_id(claims.user_id).one(db).await {
        Ok(Some(user)) => Ok(CurrentUser {
            user_id: user.id,
            role: user.role,
        }),
        Ok(None) => Err(AuthError::InvalidUserOrRole),
        Err(err) => Err(AuthError::Database(err.to_string())),
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid user id or role")]
    InvalidUserOrRole,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Failed to generate token")]
    GenerationFail,
    #[error("Database error: {0}")]
    Database(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidUserOrRole | AuthError::InvalidToken => {
                tracing::debug!(error = %err, "Rejected token");
                AppError::Unauthenticated
            }
            AuthError::GenerationFail => AppError::Internal(err.to_string()),
            AuthError::Database(msg) => AppError::Internal(msg),
        }
    }
}
