//! Global application error types and handlers.
//!
//! This module defines the error taxonomy used across the backend and
//! provides mechanisms for consistent error handling and response
//! formatting. The single error-to-status mapping table lives in
//! `api::common`; every handler goes through it.

use thiserror::Error;

/// The way a bearer token failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenErrorKind {
    /// Signature was valid but the token is past its expiry.
    Expired,
    /// Signature did not verify against the process signing secret.
    BadSignature,
    /// Token could not be parsed as a JWT of the expected shape.
    Malformed,
}

impl std::fmt::Display for TokenErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenErrorKind::Expired => write!(f, "expired"),
            TokenErrorKind::BadSignature => write!(f, "bad signature"),
            TokenErrorKind::Malformed => write!(f, "malformed"),
        }
    }
}

/// Generic service error used across the authentication subsystem
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    #[error("{entity} already exists: {identifier}")]
    AlreadyExists { entity: String, identifier: String },

    #[error("Token error: {kind}")]
    Token { kind: TokenErrorKind },

    #[error("Authentication failed: {message}")]
    AuthMismatch { message: String },

    #[error("Timed out waiting for {what}")]
    Timeout { what: String },

    #[error("Database error: {source}")]
    Database {
        #[from]
        source: anyhow::Error,
    },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    // Helper constructors for common patterns

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn already_exists(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn token(kind: TokenErrorKind) -> Self {
        Self::Token { kind }
    }

    pub fn auth_mismatch(message: impl Into<String>) -> Self {
        Self::AuthMismatch {
            message: message.into(),
        }
    }

    pub fn timeout(what: impl Into<String>) -> Self {
        Self::Timeout { what: what.into() }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// The token failure kind, if this is a token error.
    pub fn token_kind(&self) -> Option<TokenErrorKind> {
        match self {
            Self::Token { kind } => Some(*kind),
            _ => None,
        }
    }
}
