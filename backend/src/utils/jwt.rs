//! JWT token utilities for authentication.
//!
//! Provides issuance and verification for the two token kinds the system
//! uses: session tokens (3 days) and password-reset tokens (15 minutes).
//! Both carry the same claim shape and are signed with the same process
//! secret. Verification pins HS256 rather than trusting the algorithm field
//! embedded in the token, and checks signature and expiry together.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::errors::{ServiceError, TokenErrorKind};

/// Session token lifetime in days.
pub const SESSION_TOKEN_TTL_DAYS: i64 = 3;
/// Password-reset token lifetime in minutes.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 15;

/// JWT claims shared by session and reset tokens.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// User ID the token was issued for.
    pub sub: String,
    /// Token expiration timestamp
    pub exp: usize,
    /// Token issued at timestamp
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// JWT token utility for creating and validating tokens
pub struct JwtUtils {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtUtils {
    /// Create a new JwtUtils instance from the injected signing secret.
    pub fn new(secret: &str) -> Self {
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtUtils {
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Issue a session token proving prior successful authentication.
    pub fn issue_session(&self, user_id: &str) -> Result<String, ServiceError> {
        self.issue(user_id, Duration::days(SESSION_TOKEN_TTL_DAYS))
    }

    /// Issue a reset token authorizing a password change for its subject.
    pub fn issue_reset(&self, user_id: &str) -> Result<String, ServiceError> {
        self.issue(user_id, Duration::minutes(RESET_TOKEN_TTL_MINUTES))
    }

    fn issue(&self, user_id: &str, ttl: Duration) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::internal_error(format!("Token generation failed: {e}")))
    }

    /// Validate and decode a token. Side-effect free: repeated calls on the
    /// same unexpired token decode to identical claims.
    pub fn verify(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| ServiceError::token(classify(e)))
    }
}

fn classify(error: jsonwebtoken::errors::Error) -> TokenErrorKind {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::ExpiredSignature => TokenErrorKind::Expired,
        ErrorKind::InvalidSignature => TokenErrorKind::BadSignature,
        _ => TokenErrorKind::Malformed,
    }
}
