//! Users API
//!
//! Registration, login and password change.

use axum::{extract::State, routing::{post, put}, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::password_service::PasswordPolicy;
use crate::shared::api_common::{JsonBody, MessageResponse};
use crate::shared::error::{PlatformError, PrincipalError, Result};
use crate::shared::middleware::{AppState, Authenticated};
use crate::store::{constraints, StoreError};
use crate::user::entity::{NewUser, User};

/// Required phone number length
pub const PHONE_LEN: usize = 10;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

impl CreateUserRequest {
    fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.username.trim().is_empty() {
            errors.push("username is required".to_string());
        }
        if self.name.trim().is_empty() {
            errors.push("name is required".to_string());
        }
        if !is_valid_email(&self.email) {
            errors.push("email is invalid".to_string());
        }
        if self.phone.chars().count() != PHONE_LEN {
            errors.push(format!("phone must be exactly {} characters", PHONE_LEN));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PlatformError::validation(errors.join("; ")))
        }
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginUserResponse {
    #[serde(flatten)]
    pub user: User,
    pub token_id: Uuid,
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Create a user
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<Json<User>> {
    req.validate()?;

    let password_hash = state.password_service.spawn_hash(&req.password).await?;

    let user = state
        .users
        .insert(NewUser {
            username: req.username,
            name: req.name,
            email: req.email,
            phone: req.phone,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation { constraint } if constraint == constraints::USERS_EMAIL => {
                PlatformError::duplicate("User", "email")
            }
            StoreError::UniqueViolation { .. } => PlatformError::duplicate("User", "username"),
            other => other.into(),
        })?;

    info!(username = %user.username, "User created");
    Ok(Json(user))
}

/// Exchange username and password for a session token
pub async fn login_user(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginUserRequest>,
) -> Result<Json<LoginUserResponse>> {
    let user = state
        .users
        .find_by_username(&req.username)
        .await?
        .ok_or(PlatformError::InvalidCredentials)?;

    if !state.password_service.spawn_verify(&req.password, &user.password_hash).await? {
        return Err(PlatformError::InvalidCredentials);
    }

    let (access_token, payload) = state
        .token_maker
        .create_token(&user.username, state.access_token_ttl)?;

    info!(username = %user.username, token_id = %payload.id, "User logged in");

    Ok(Json(LoginUserResponse {
        user,
        token_id: payload.id,
        access_token,
        issued_at: payload.issued_at,
        expired_at: payload.expired_at,
    }))
}

/// Change the caller's password
pub async fn update_password(
    State(state): State<AppState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let user = state
        .users
        .find_by_username(auth.username())
        .await?
        .ok_or(PrincipalError::UnknownPrincipal)?;

    if !state
        .password_service
        .spawn_verify(&req.current_password, &user.password_hash)
        .await?
    {
        return Err(PlatformError::InvalidCredentials);
    }

    if req.new_password == req.current_password {
        return Err(PlatformError::validation("new password must differ from the current one"));
    }
    if req.new_password != req.confirm_password {
        return Err(PlatformError::validation("password confirmation does not match"));
    }

    PasswordPolicy::for_password_change()
        .validate(&req.new_password)
        .map_err(|errors| PlatformError::validation(errors.join("; ")))?;

    let password_hash = state.password_service.spawn_hash(&req.new_password).await?;
    state.users.update_password(auth.username(), &password_hash).await?;

    info!(username = %auth.username(), "Password updated");
    Ok(Json(MessageResponse::new("password updated")))
}

pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/login", post(login_user))
        .route("/users/password", put(update_password))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, phone: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: "alice".into(),
            name: "Alice".into(),
            email: email.into(),
            phone: phone.into(),
            password: "password123".into(),
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("alice.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice@localhost"));
        assert!(!is_valid_email("alice@a@b.com"));
    }

    #[test]
    fn test_phone_must_be_ten_characters() {
        assert!(request("alice@example.com", "0812345678").validate().is_ok());
        assert!(request("alice@example.com", "081234567").validate().is_err());
        assert!(request("alice@example.com", "08123456789").validate().is_err());
    }
}
