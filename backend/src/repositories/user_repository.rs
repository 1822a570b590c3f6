//! Database repository for user credential records.
//!
//! `UserStore` is the contract the auth core consumes; `SqliteUserStore` is
//! the production implementation over sqlx. Email and username uniqueness is
//! enforced by the table's UNIQUE constraints, so a create that loses a race
//! against a concurrent registration still surfaces as `AlreadyExists`.

use crate::database::models::{CreateUser, User};
use crate::errors::{ServiceError, ServiceResult};
use async_trait::async_trait;
use sqlx::SqlitePool;

/// Credential store contract consumed by the auth service.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> ServiceResult<Option<User>>;

    /// Inserts a new record, failing with `AlreadyExists` when the storage
    /// layer's unique constraint on email or username is violated.
    async fn create(&self, user: CreateUser) -> ServiceResult<User>;

    /// Replaces the stored password hash, returning the updated record or
    /// `None` when no user with that id exists.
    async fn update_password_hash(&self, id: &str, hash: &str) -> ServiceResult<Option<User>>;
}

/// sqlx-backed implementation of the credential store.
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_admin, created_at, updated_at
            FROM users WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(anyhow::Error::from)?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_admin, created_at, updated_at
            FROM users WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(anyhow::Error::from)?;

        Ok(user)
    }

    async fn create(&self, user: CreateUser) -> ServiceResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES (?, ?, ?, ?)
            RETURNING id, username, email, password_hash, is_admin, created_at, updated_at
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &user))?;

        Ok(created)
    }

    async fn update_password_hash(&self, id: &str, hash: &str) -> ServiceResult<Option<User>> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            RETURNING id, username, email, password_hash, is_admin, created_at, updated_at
            "#,
        )
        .bind(hash)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(anyhow::Error::from)?;

        Ok(updated)
    }
}

/// Translates a unique-constraint violation into the same conflict error the
/// pre-insert lookups produce; anything else is a database error.
fn map_unique_violation(error: sqlx::Error, user: &CreateUser) -> ServiceError {
    if let Some(db_error) = error.as_database_error() {
        if db_error.is_unique_violation() {
            return conflict_for(db_error.message(), user);
        }
    }

    ServiceError::from(anyhow::Error::from(error))
}

/// Picks which unique column the violation names. SQLite reports
/// "UNIQUE constraint failed: users.email" (or users.username).
fn conflict_for(db_message: &str, user: &CreateUser) -> ServiceError {
    if db_message.contains("users.email") {
        ServiceError::already_exists("Email", &user.email)
    } else {
        ServiceError::already_exists("Username", &user.username)
    }
}
