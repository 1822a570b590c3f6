//! Main entry point for the blog authentication backend.
//!
//! This file initializes the Axum web server, sets up the database pool and
//! collaborators (credential store, mailer, token issuer), and registers the
//! authentication routes. Configuration is loaded once at startup; the
//! signing secret and mail credentials are injected into the service rather
//! than read from ambient state.

mod api;
mod auth;
mod config;
mod database;
mod errors;
mod repositories;
mod services;
mod utils;

use crate::auth::service::AuthService;
use crate::repositories::user_repository::SqliteUserStore;
use crate::services::email_service::{EmailService, Mailer};
use axum::{Extension, Router, response::Json, routing::get};
use config::Config;
use database::Database;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::init;

#[tokio::main]
async fn main() {
    init();

    let config = Config::from_env().unwrap();
    let db = Database::new(&config).await.unwrap();

    let store = Arc::new(SqliteUserStore::new(db.pool().clone()));

    let mailer: Option<Arc<dyn Mailer>> = match config.email_config() {
        Some(email_config) => match EmailService::new(email_config) {
            Ok(service) => {
                info!("Email service initialized successfully");
                Some(Arc::new(service))
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize email service: {}. Password reset mail will be disabled.",
                    e
                );
                None
            }
        },
        None => {
            tracing::warn!(
                "Email configuration not found. Password reset mail will be disabled."
            );
            None
        }
    };

    let auth_service = Arc::new(AuthService::new(store, mailer, &config));

    let app = Router::new()
        .route("/", get(root_handler))
        .nest("/api/user", auth::routes::auth_router())
        .layer(Extension(auth_service));

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await.unwrap();

    info!("Starting auth server on port {}", config.server_port);
    axum::serve(listener, app).await.unwrap();
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "Blog Auth Backend",
        "version": "0.1.0"
    }))
}
