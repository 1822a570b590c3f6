//! Core business logic for the authentication system.
//!
//! Orchestrates registration, login, session-token validation, and the
//! password-reset flow across the credential store, the password hasher,
//! the token issuer, and the mailer. Collaborator calls are bounded by a
//! configurable timeout. The reset flow keeps no persisted state:
//! possession of a valid, unexpired reset token is the state.

use crate::auth::models::*;
use crate::auth::policy::{PasswordPolicy, ProfanityFilter, is_valid_username};
use crate::config::Config;
use crate::database::models::CreateUser;
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::user_repository::UserStore;
use crate::services::email_service::Mailer;
use crate::utils::jwt::JwtUtils;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

/// One bcrypt cost for every hashing path (registration and reset).
const HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Authentication service handling registration, login, token validation,
/// and the password-reset flow.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    mailer: Option<Arc<dyn Mailer>>,
    jwt_utils: JwtUtils,
    password_policy: PasswordPolicy,
    profanity_filter: ProfanityFilter,
    reset_base_url: String,
    call_timeout: Duration,
}

impl AuthService {
    /// Create a new AuthService instance from immutable startup configuration.
    pub fn new(
        store: Arc<dyn UserStore>,
        mailer: Option<Arc<dyn Mailer>>,
        config: &Config,
    ) -> Self {
        AuthService {
            store,
            mailer,
            jwt_utils: JwtUtils::new(&config.jwt_secret),
            password_policy: PasswordPolicy::default(),
            profanity_filter: ProfanityFilter::default(),
            reset_base_url: config.reset_base_url.clone(),
            call_timeout: Duration::from_secs(config.collaborator_timeout_seconds),
        }
    }

    /// Register a new user and issue a session token.
    ///
    /// Uniqueness is pre-checked for a friendly message, but the store's
    /// unique constraints are the authoritative enforcement point; a create
    /// that loses a race still comes back as the same conflict error.
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<RegisterResponse> {
        if let Err(validation_errors) = request.validate() {
            return Err(ServiceError::validation(format_validation_errors(
                validation_errors,
            )));
        }

        if !self.password_policy.is_strong(&request.password) {
            return Err(ServiceError::validation(
                "Password must contain at least 8 characters, including uppercase, \
                 lowercase, numbers and special characters",
            ));
        }

        if !is_valid_username(&request.username) {
            return Err(ServiceError::validation(
                "Username must be 3-16 characters long and contain only letters, \
                 numbers, underscores, or dots",
            ));
        }

        if self.profanity_filter.is_profane(&request.username) {
            return Err(ServiceError::validation(
                "Username contains inappropriate language. Try another one",
            ));
        }

        if self
            .with_timeout("credential store", self.store.find_by_email(&request.email))
            .await?
            .is_some()
        {
            return Err(ServiceError::already_exists("Email", &request.email));
        }

        if self
            .with_timeout(
                "credential store",
                self.store.find_by_username(&request.username),
            )
            .await?
            .is_some()
        {
            return Err(ServiceError::already_exists("Username", &request.username));
        }

        let password_hash = hash_password(&request.password)?;

        let user = self
            .with_timeout(
                "credential store",
                self.store.create(CreateUser {
                    id: uuid::Uuid::now_v7().to_string(),
                    username: request.username,
                    email: request.email,
                    password_hash,
                }),
            )
            .await?;

        let token = self.jwt_utils.issue_session(&user.id)?;

        Ok(RegisterResponse {
            message: "User registered successfully".to_string(),
            token,
            user: UserInfo::from(&user),
        })
    }

    /// Authenticate a user and issue a session token.
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<LoginResponse> {
        if let Err(validation_errors) = request.validate() {
            return Err(ServiceError::validation(format_validation_errors(
                validation_errors,
            )));
        }

        let user = self
            .with_timeout("credential store", self.store.find_by_email(&request.email))
            .await?
            .ok_or_else(|| ServiceError::not_found("Email", &request.email))?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(ServiceError::auth_mismatch("Incorrect password"));
        }

        let token = self.jwt_utils.issue_session(&user.id)?;

        Ok(LoginResponse { user, token })
    }

    /// Start the password-reset flow: mint a reset token and email the link.
    ///
    /// A mailer failure is reported as an internal error; the already-minted
    /// token stays valid until it expires, there is no rollback.
    pub async fn forgot_password(
        &self,
        request: ForgotPasswordRequest,
    ) -> ServiceResult<ForgotPasswordResponse> {
        if let Err(validation_errors) = request.validate() {
            return Err(ServiceError::validation(format_validation_errors(
                validation_errors,
            )));
        }

        let user = self
            .with_timeout("credential store", self.store.find_by_email(&request.email))
            .await?
            .ok_or_else(|| ServiceError::not_found("Email", &request.email))?;

        let token = self.jwt_utils.issue_reset(&user.id)?;
        let reset_link = format!(
            "{}/api/reset-password/{}/{}",
            self.reset_base_url, user.id, token
        );

        let mailer = self.mailer.as_ref().ok_or_else(|| {
            tracing::error!("Password reset requested but no mailer is configured");
            ServiceError::internal_error("Email service is not available")
        })?;

        self.with_timeout(
            "mailer",
            mailer.send_password_reset_email(&user, &reset_link),
        )
        .await
        .map_err(|e| match e {
            timeout @ ServiceError::Timeout { .. } => timeout,
            other => {
                tracing::error!("Failed to send password reset email: {other}");
                ServiceError::internal_error("Failed to send password reset email")
            }
        })?;

        Ok(ForgotPasswordResponse {
            email: request.email,
            reset_link,
            message: "Password reset link has been sent to your email address!".to_string(),
        })
    }

    /// Complete the password-reset flow under a valid, unexpired reset token.
    pub async fn reset_password(
        &self,
        request: ResetPasswordRequest,
    ) -> ServiceResult<ResetPasswordResponse> {
        if let Err(validation_errors) = request.validate() {
            return Err(ServiceError::validation(format_validation_errors(
                validation_errors,
            )));
        }

        if !self.password_policy.is_strong(&request.new_password) {
            return Err(ServiceError::validation("Password is not strong enough"));
        }

        // Fail closed: signature and expiry are checked before anything else.
        let claims = self.jwt_utils.verify(&request.reset_token)?;

        // The token authorizes a password change for its subject only.
        if claims.sub != request.user_id {
            return Err(ServiceError::validation(
                "Reset token was not issued for this user",
            ));
        }

        let password_hash = hash_password(&request.new_password)?;

        let user = self
            .with_timeout(
                "credential store",
                self.store.update_password_hash(&claims.sub, &password_hash),
            )
            .await?
            .ok_or_else(|| ServiceError::not_found("User", &claims.sub))?;

        Ok(ResetPasswordResponse { user })
    }

    /// Verify a session token and return its subject.
    pub fn validate_token(&self, request: &ValidateTokenRequest) -> ServiceResult<String> {
        if let Err(validation_errors) = request.validate() {
            return Err(ServiceError::validation(format_validation_errors(
                validation_errors,
            )));
        }

        let claims = self.jwt_utils.verify(&request.token)?;
        Ok(claims.user_id().to_string())
    }

    /// Bounds a collaborator call, surfacing a distinct timeout error.
    async fn with_timeout<T>(
        &self,
        what: &str,
        fut: impl Future<Output = ServiceResult<T>>,
    ) -> ServiceResult<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::timeout(what)),
        }
    }
}

/// Hash a plaintext password with a fresh random salt.
fn hash_password(password: &str) -> ServiceResult<String> {
    bcrypt::hash(password, HASH_COST)
        .map_err(|e| ServiceError::internal_error(format!("Password hashing failed: {e}")))
}

/// Verify a plaintext password against the stored hash. A malformed stored
/// hash surfaces as an internal hash error, never a crash.
fn verify_password(password: &str, hash: &str) -> ServiceResult<bool> {
    bcrypt::verify(password, hash)
        .map_err(|e| ServiceError::internal_error(format!("Password verification failed: {e}")))
}

fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect::<Vec<String>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::User;
    use crate::errors::TokenErrorKind;
    use crate::utils::jwt::Claims;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    const TEST_SECRET: &str = "test-signing-secret";

    /// In-memory credential store mirroring the conflict semantics of the
    /// sqlite implementation.
    #[derive(Default)]
    struct InMemoryUserStore {
        users: Mutex<Vec<User>>,
    }

    impl InMemoryUserStore {
        fn stored_hash(&self, id: &str) -> Option<String> {
            self.users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.id == id)
                .map(|u| u.password_hash.clone())
        }
    }

    #[async_trait]
    impl UserStore for InMemoryUserStore {
        async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn find_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.username == username)
                .cloned())
        }

        async fn create(&self, user: CreateUser) -> ServiceResult<User> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == user.email) {
                return Err(ServiceError::already_exists("Email", &user.email));
            }
            if users.iter().any(|u| u.username == user.username) {
                return Err(ServiceError::already_exists("Username", &user.username));
            }
            let now = Utc::now();
            let created = User {
                id: user.id,
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                is_admin: false,
                created_at: now,
                updated_at: now,
            };
            users.push(created.clone());
            Ok(created)
        }

        async fn update_password_hash(&self, id: &str, hash: &str) -> ServiceResult<Option<User>> {
            let mut users = self.users.lock().unwrap();
            match users.iter_mut().find(|u| u.id == id) {
                Some(user) => {
                    user.password_hash = hash.to_string();
                    user.updated_at = Utc::now();
                    Ok(Some(user.clone()))
                }
                None => Ok(None),
            }
        }
    }

    /// Mailer fixture recording every dispatched reset link.
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_password_reset_email(
            &self,
            user: &User,
            reset_url: &str,
        ) -> ServiceResult<()> {
            self.sent
                .lock()
                .unwrap()
                .push((user.email.clone(), reset_url.to_string()));
            Ok(())
        }
    }

    /// Mailer fixture simulating a transport failure.
    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send_password_reset_email(&self, _: &User, _: &str) -> ServiceResult<()> {
            Err(ServiceError::internal_error("SMTP connection refused"))
        }
    }

    /// Store fixture whose lookups hang well past any reasonable deadline.
    struct SlowUserStore;

    #[async_trait]
    impl UserStore for SlowUserStore {
        async fn find_by_email(&self, _: &str) -> ServiceResult<Option<User>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        async fn find_by_username(&self, _: &str) -> ServiceResult<Option<User>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        async fn create(&self, _: CreateUser) -> ServiceResult<User> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(ServiceError::internal_error("unreachable"))
        }

        async fn update_password_hash(&self, _: &str, _: &str) -> ServiceResult<Option<User>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    /// Store fixture reproducing a lost registration race: the pre-insert
    /// lookups see nothing, then the unique constraint rejects the insert.
    struct RacingUserStore;

    #[async_trait]
    impl UserStore for RacingUserStore {
        async fn find_by_email(&self, _: &str) -> ServiceResult<Option<User>> {
            Ok(None)
        }

        async fn find_by_username(&self, _: &str) -> ServiceResult<Option<User>> {
            Ok(None)
        }

        async fn create(&self, user: CreateUser) -> ServiceResult<User> {
            Err(ServiceError::already_exists("Email", &user.email))
        }

        async fn update_password_hash(&self, _: &str, _: &str) -> ServiceResult<Option<User>> {
            Ok(None)
        }
    }

    fn service(store: Arc<InMemoryUserStore>, mailer: Option<Arc<dyn Mailer>>) -> AuthService {
        AuthService {
            store,
            mailer,
            jwt_utils: JwtUtils::new(TEST_SECRET),
            password_policy: PasswordPolicy::default(),
            profanity_filter: ProfanityFilter::default(),
            reset_base_url: "http://testserver".to_string(),
            call_timeout: Duration::from_secs(5),
        }
    }

    fn register_request(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    async fn register_alice(auth: &AuthService) -> RegisterResponse {
        auth.register(register_request(
            "valid_user.1",
            "alice@example.com",
            "Password123!",
        ))
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_registration_succeeds_exactly_once() {
        let store = Arc::new(InMemoryUserStore::default());
        let auth = service(store, None);

        let response = register_alice(&auth).await;
        assert_eq!(response.user.email, "alice@example.com");
        assert_eq!(response.user.username, "valid_user.1");

        // Session token decodes to the new user's identity.
        let claims = JwtUtils::new(TEST_SECRET).verify(&response.token).unwrap();
        assert_eq!(claims.sub, response.user.id);

        let dup_email = auth
            .register(register_request(
                "other_user",
                "alice@example.com",
                "Password123!",
            ))
            .await
            .unwrap_err();
        assert!(matches!(dup_email, ServiceError::AlreadyExists { .. }));

        let dup_username = auth
            .register(register_request(
                "valid_user.1",
                "other@example.com",
                "Password123!",
            ))
            .await
            .unwrap_err();
        assert!(matches!(dup_username, ServiceError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_registration_rejects_policy_violations() {
        let auth = service(Arc::new(InMemoryUserStore::default()), None);

        let weak = auth
            .register(register_request(
                "valid_user.1",
                "alice@example.com",
                "password123",
            ))
            .await
            .unwrap_err();
        assert!(matches!(weak, ServiceError::Validation { .. }));

        let short = auth
            .register(register_request("ab", "alice@example.com", "Password123!"))
            .await
            .unwrap_err();
        assert!(matches!(short, ServiceError::Validation { .. }));

        let profane = auth
            .register(register_request(
                "shitposter",
                "alice@example.com",
                "Password123!",
            ))
            .await
            .unwrap_err();
        assert!(matches!(profane, ServiceError::Validation { .. }));

        let bad_email = auth
            .register(register_request("valid_user.1", "not-an-email", "Password123!"))
            .await
            .unwrap_err();
        assert!(matches!(bad_email, ServiceError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let store = Arc::new(InMemoryUserStore::default());
        let auth = service(store, None);
        let registered = register_alice(&auth).await;

        let response = auth
            .login(LoginRequest {
                email: "alice@example.com".to_string(),
                password: "Password123!".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.user.id, registered.user.id);
        let claims = JwtUtils::new(TEST_SECRET).verify(&response.token).unwrap();
        assert_eq!(claims.sub, registered.user.id);
    }

    #[tokio::test]
    async fn test_login_failures() {
        let store = Arc::new(InMemoryUserStore::default());
        let auth = service(store, None);
        register_alice(&auth).await;

        let wrong_password = auth
            .login(LoginRequest {
                email: "alice@example.com".to_string(),
                password: "WrongPassword1!".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong_password, ServiceError::AuthMismatch { .. }));

        let unknown_email = auth
            .login(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "Password123!".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown_email, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_forgot_then_reset_updates_password() {
        let store = Arc::new(InMemoryUserStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let auth = service(store.clone(), Some(mailer.clone()));
        let registered = register_alice(&auth).await;

        let forgot = auth
            .forgot_password(ForgotPasswordRequest {
                email: "alice@example.com".to_string(),
            })
            .await
            .unwrap();

        // The link is dispatched to the registered address and embeds the id.
        let sent = mailer.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice@example.com");
        assert_eq!(sent[0].1, forgot.reset_link);
        assert!(forgot.reset_link.contains(&registered.user.id));

        let reset_token = forgot.reset_link.rsplit('/').next().unwrap().to_string();

        auth.reset_password(ResetPasswordRequest {
            user_id: registered.user.id.clone(),
            new_password: "NewPassword456!".to_string(),
            reset_token,
        })
        .await
        .unwrap();

        // New password logs in, old one no longer does.
        auth.login(LoginRequest {
            email: "alice@example.com".to_string(),
            password: "NewPassword456!".to_string(),
        })
        .await
        .unwrap();

        let old = auth
            .login(LoginRequest {
                email: "alice@example.com".to_string(),
                password: "Password123!".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(old, ServiceError::AuthMismatch { .. }));
    }

    #[tokio::test]
    async fn test_slow_store_surfaces_as_timeout() {
        let auth = AuthService {
            store: Arc::new(SlowUserStore),
            mailer: None,
            jwt_utils: JwtUtils::new(TEST_SECRET),
            password_policy: PasswordPolicy::default(),
            profanity_filter: ProfanityFilter::default(),
            reset_base_url: "http://testserver".to_string(),
            call_timeout: Duration::from_millis(50),
        };

        let error = auth
            .login(LoginRequest {
                email: "alice@example.com".to_string(),
                password: "Password123!".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_lost_registration_race_surfaces_as_conflict() {
        let auth = AuthService {
            store: Arc::new(RacingUserStore),
            mailer: None,
            jwt_utils: JwtUtils::new(TEST_SECRET),
            password_policy: PasswordPolicy::default(),
            profanity_filter: ProfanityFilter::default(),
            reset_base_url: "http://testserver".to_string(),
            call_timeout: Duration::from_secs(5),
        };

        // Both pre-insert lookups see nothing; the store's unique constraint
        // is the authoritative conflict point and its rejection must surface
        // as the same "already exists" error the lookups would produce.
        let error = auth
            .register(register_request(
                "valid_user.1",
                "alice@example.com",
                "Password123!",
            ))
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email() {
        let auth = service(
            Arc::new(InMemoryUserStore::default()),
            Some(Arc::new(RecordingMailer::default())),
        );

        let error = auth
            .forgot_password(ForgotPasswordRequest {
                email: "nobody@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_mailer_failure_surfaces_as_internal_error() {
        let store = Arc::new(InMemoryUserStore::default());
        let auth = service(store, Some(Arc::new(FailingMailer)));
        register_alice(&auth).await;

        let error = auth
            .forgot_password(ForgotPasswordRequest {
                email: "alice@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::InternalError { .. }));
    }

    #[tokio::test]
    async fn test_expired_reset_token_leaves_hash_unchanged() {
        let store = Arc::new(InMemoryUserStore::default());
        let auth = service(store.clone(), None);
        let registered = register_alice(&auth).await;
        let hash_before = store.stored_hash(&registered.user.id).unwrap();

        let now = Utc::now().timestamp() as usize;
        let expired_claims = Claims {
            sub: registered.user.id.clone(),
            exp: now - 60,
            iat: now - 960,
        };
        let expired_token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &expired_claims,
            &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        let error = auth
            .reset_password(ResetPasswordRequest {
                user_id: registered.user.id.clone(),
                new_password: "NewPassword456!".to_string(),
                reset_token: expired_token,
            })
            .await
            .unwrap_err();

        assert_eq!(error.token_kind(), Some(TokenErrorKind::Expired));
        assert_eq!(store.stored_hash(&registered.user.id).unwrap(), hash_before);
    }

    #[tokio::test]
    async fn test_reset_token_subject_must_match_user_id() {
        let store = Arc::new(InMemoryUserStore::default());
        let auth = service(store.clone(), None);
        let registered = register_alice(&auth).await;
        let hash_before = store.stored_hash(&registered.user.id).unwrap();

        let foreign_token = JwtUtils::new(TEST_SECRET).issue_reset("someone-else").unwrap();

        let error = auth
            .reset_password(ResetPasswordRequest {
                user_id: registered.user.id.clone(),
                new_password: "NewPassword456!".to_string(),
                reset_token: foreign_token,
            })
            .await
            .unwrap_err();

        assert!(matches!(error, ServiceError::Validation { .. }));
        assert_eq!(store.stored_hash(&registered.user.id).unwrap(), hash_before);
    }

    #[tokio::test]
    async fn test_validate_token_returns_subject() {
        let auth = service(Arc::new(InMemoryUserStore::default()), None);
        let token = JwtUtils::new(TEST_SECRET).issue_session("user-42").unwrap();

        let request = ValidateTokenRequest { token };
        assert_eq!(auth.validate_token(&request).unwrap(), "user-42");
        // Verification is side-effect free.
        assert_eq!(auth.validate_token(&request).unwrap(), "user-42");

        let bad = ValidateTokenRequest {
            token: "garbage".to_string(),
        };
        let error = auth.validate_token(&bad).unwrap_err();
        assert_eq!(error.token_kind(), Some(TokenErrorKind::Malformed));
    }
}
