//! Defines the HTTP routes specifically for authentication.
//!
//! These routes handle user registration, login, session-token validation,
//! and the password-reset flow. They are designed to be integrated into the
//! main Axum router.

use crate::auth::handlers::*;
use axum::{Router, routing::post};

/// Creates the authentication router with all auth-related routes
pub fn auth_router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgotPassword", post(forgot_password))
        .route("/validate", post(validate_token))
        .route("/reset", post(reset_password))
}
