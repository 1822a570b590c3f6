//! Handler functions for authentication-related API endpoints.
//!
//! These functions process incoming HTTP requests for registration, login,
//! the password-reset flow, and session-token validation, delegating the
//! business logic to `auth::service` and mapping failures through the
//! canonical error table in `api::common`.

use crate::api::common::{ErrorResponse, service_error_to_http};
use crate::auth::models::*;
use crate::auth::service::AuthService;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::Json as ResponseJson,
};
use std::sync::Arc;

/// Handle user registration request
#[axum::debug_handler]
pub async fn register(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, ResponseJson<RegisterResponse>), (StatusCode, ResponseJson<ErrorResponse>)>
{
    match auth_service.register(payload).await {
        Ok(response) => Ok((StatusCode::CREATED, ResponseJson(response))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle user login request
#[axum::debug_handler]
pub async fn login(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<LoginResponse>, (StatusCode, ResponseJson<ErrorResponse>)> {
    match auth_service.login(payload).await {
        Ok(response) => Ok(ResponseJson(response)),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle forgot-password request
#[axum::debug_handler]
pub async fn forgot_password(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<ResponseJson<ForgotPasswordResponse>, (StatusCode, ResponseJson<ErrorResponse>)> {
    match auth_service.forgot_password(payload).await {
        Ok(response) => Ok(ResponseJson(response)),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle session-token validation request
#[axum::debug_handler]
pub async fn validate_token(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(payload): Json<ValidateTokenRequest>,
) -> Result<ResponseJson<ValidateTokenResponse>, (StatusCode, ResponseJson<ValidateTokenResponse>)>
{
    match auth_service.validate_token(&payload) {
        Ok(user_id) => Ok(ResponseJson(ValidateTokenResponse {
            valid: true,
            user_id: Some(user_id),
            message: None,
        })),
        Err(error) => {
            let status = match error.token_kind() {
                Some(_) => StatusCode::UNAUTHORIZED,
                None => StatusCode::BAD_REQUEST,
            };
            Err((
                status,
                ResponseJson(ValidateTokenResponse {
                    valid: false,
                    user_id: None,
                    message: Some(error.to_string()),
                }),
            ))
        }
    }
}

/// Handle reset-password completion request
#[axum::debug_handler]
pub async fn reset_password(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<ResponseJson<ResetPasswordResponse>, (StatusCode, ResponseJson<ErrorResponse>)> {
    match auth_service.reset_password(payload).await {
        Ok(response) => Ok(ResponseJson(response)),
        Err(error) => Err(service_error_to_http(error)),
    }
}
