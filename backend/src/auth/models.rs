//! Data structures for authentication-related entities.
//!
//! Request and response payloads for registration, login, the password-reset
//! flow, and session-token validation. Shape checks (presence, email syntax)
//! live on the DTOs via the validator crate; policy checks (password
//! strength, username charset, profanity) are applied by the service.

use crate::database::models::User;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request payload
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Invalid email")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration response containing the freshly issued session token
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub token: String,
    pub user: UserInfo,
}

/// Public projection of a user record
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub username: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
        }
    }
}

/// Login request payload
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Invalid email")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response containing the user record and a session token
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

/// Forgot-password request payload
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Invalid email format")
    )]
    pub email: String,
}

/// Forgot-password response; the reset link is also emailed to the user
#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub email: String,
    pub reset_link: String,
    pub message: String,
}

/// Session-token validation request payload
#[derive(Debug, Deserialize, Validate)]
pub struct ValidateTokenRequest {
    #[validate(length(min = 1, message = "No token provided"))]
    pub token: String,
}

/// Session-token validation response
#[derive(Debug, Serialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Reset-password request payload
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub new_password: String,

    #[validate(length(min = 1, message = "Reset token is required"))]
    pub reset_token: String,
}

/// Reset-password response containing the updated user record
#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub user: User,
}
