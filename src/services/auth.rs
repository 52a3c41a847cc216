use crate::services::token::{TokenError, TokenService};
use crate::storage::{StorageError, UserProvider, UserSaver};
use crate::utils::auth::{hash_password, verify_password};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user already exists")]
    DuplicateUser,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("{op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: StorageError,
    },
}

/// Registration and login. Holds no state of its own; everything lives in the
/// injected store and the token service.
pub struct AuthService {
    saver: Arc<dyn UserSaver>,
    provider: Arc<dyn UserProvider>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(
        saver: Arc<dyn UserSaver>,
        provider: Arc<dyn UserProvider>,
        tokens: TokenService,
    ) -> Self {
        Self {
            saver,
            provider,
            tokens,
        }
    }

    /// Hashes the password and writes exactly one user row.
    pub async fn register(&self, email: &str, password: &str) -> Result<i64, AuthError> {
        const OP: &str = "services.auth.register";
        tracing::info!(op = OP, "registering user");

        // argon2 is deliberately slow. Keep it off the async worker threads.
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| {
                tracing::error!(op = OP, error = %e, "failed to hash password");
                AuthError::Hashing(e.to_string())
            })?;

        match self.saver.save_user(email, &password_hash).await {
            Ok(id) => {
                tracing::info!(op = OP, user_id = id, "user registered");
                Ok(id)
            }
            Err(StorageError::UserExists) => {
                tracing::warn!(op = OP, "user already exists");
                Err(AuthError::DuplicateUser)
            }
            Err(e) => {
                tracing::error!(op = OP, error = %e, "failed to save user");
                Err(AuthError::Storage { op: OP, source: e })
            }
        }
    }

    /// Checks the credentials and issues a token. Never writes anything.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        const OP: &str = "services.auth.login";
        tracing::info!(op = OP, "attempting to login user");

        // 1. Fetch user
        let user = match self.provider.user(email).await {
            Ok(u) => u,
            Err(StorageError::UserNotFound) => {
                tracing::warn!(op = OP, "user not found");
                return Err(AuthError::UserNotFound);
            }
            Err(e) => {
                tracing::error!(op = OP, error = %e, "failed to get user");
                return Err(AuthError::Storage { op: OP, source: e });
            }
        };

        // 2. Verify password
        // A stored hash we can't even parse is treated as a mismatch: the caller
        // gets the same answer either way, and we log loudly.
        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .unwrap_or_else(|e| {
                tracing::error!(op = OP, user_id = user.id, error = %e, "stored password hash is malformed");
                false
            });

        if !matches {
            tracing::warn!(op = OP, user_id = user.id, "invalid credentials");
            return Err(AuthError::InvalidCredentials);
        }

        // 3. Issue token
        let token = self.tokens.issue(&user).map_err(|e| {
            tracing::error!(op = OP, error = %e, "failed to generate token");
            AuthError::Token(e)
        })?;

        tracing::info!(op = OP, user_id = user.id, "user logged in successfully");
        Ok(token)
    }
}
