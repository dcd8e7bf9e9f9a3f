//! Account service - signup and login.
//!
//! # Login Flow
//!
//! 1. Look up the user by normalized email
//! 2. Verify the password (against a dummy digest when the user is unknown,
//!    so both failure paths pay the same hashing cost)
//! 3. Issue a session token carrying the login grant
//!
//! Hashing is CPU-bound and runs on the blocking pool.

use std::sync::Arc;

use crate::error::AppError;
use crate::models::permission::{Permission, PermissionSet};
use crate::models::user::{NewUser, User, ValidSignup};
use crate::services::password::PasswordService;
use crate::services::token::{IssuedToken, TokenService};
use crate::store::{CredentialStore, StoreError};

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub token: IssuedToken,
    pub permissions: PermissionSet,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    passwords: PasswordService,
    tokens: TokenService,
    dummy_digest: Arc<str>,
}

impl AccountService {
    /// Build the service. Hashes a throwaway password once to obtain a digest
    /// with the configured cost for unknown-user logins.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        passwords: PasswordService,
        tokens: TokenService,
    ) -> Result<Self, AppError> {
        let dummy_digest = passwords.hash("timing-equalizer")?.into();
        Ok(Self {
            store,
            passwords,
            tokens,
            dummy_digest,
        })
    }

    async fn hash_password(&self, plaintext: String) -> Result<String, AppError> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || passwords.hash(&plaintext))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {e}")))?
    }

    async fn verify_password(&self, plaintext: String, digest: String) -> Result<bool, AppError> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || passwords.verify(&plaintext, &digest))
            .await
            .map_err(|e| AppError::Internal(format!("Verification task failed: {e}")))
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - `EmailTaken`: the normalized email is already registered
    /// - `Persistence`: the store failed
    pub async fn signup(&self, signup: ValidSignup) -> Result<User, AppError> {
        if self.store.find_user_by_email(&signup.email).await?.is_some() {
            return Err(AppError::EmailTaken);
        }

        let password_hash = self.hash_password(signup.password).await?;

        let user = self
            .store
            .create_user(NewUser {
                email: signup.email,
                name: signup.name,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent signup for the same email.
                StoreError::Duplicate => AppError::EmailTaken,
                other => other.into(),
            })?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Authenticate with email and password and issue a session token.
    ///
    /// Unknown email and wrong password both yield `InvalidCredential`.
    pub async fn login(&self, email: &str, password: String) -> Result<LoginOutcome, AppError> {
        let user = self.store.find_user_by_email(email).await?;

        let digest = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_digest.to_string(),
        };
        let matches = self.verify_password(password, digest).await?;

        let user = match user {
            Some(user) if matches => user,
            _ => {
                tracing::warn!("Login rejected");
                return Err(AppError::InvalidCredential);
            }
        };

        let permissions = Permission::session_grant();
        let token = self
            .tokens
            .issue(user.id, permissions.clone(), self.tokens.default_ttl())?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome {
            user,
            token,
            permissions,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::user::SignupRequest;
    use crate::services::password::test_password_service;
    use crate::store::InMemoryCredentialStore;

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(InMemoryCredentialStore::new()),
            test_password_service(),
            TokenService::new("test-secret-key-for-testing-000000", Duration::from_secs(60)),
        )
        .unwrap()
    }

    fn signup(email: &str, password: &str) -> ValidSignup {
        SignupRequest {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn test_signup_stores_hashed_password() {
        let service = service();
        let user = service.signup(signup("a@b.com", "secret1")).await.unwrap();
        assert_eq!(user.email, "a@b.com");
        assert_ne!(user.password_hash, "secret1");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let service = service();
        service.signup(signup("a@b.com", "secret1")).await.unwrap();

        let err = service
            .signup(signup("A@B.com", "secret2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmailTaken));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let service = service();
        service.signup(signup("a@b.com", "secret1")).await.unwrap();

        let err = service
            .login("a@b.com", "wrong-password".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredential));
    }

    #[tokio::test]
    async fn test_login_with_unknown_email() {
        let service = service();
        let err = service
            .login("nobody@b.com", "secret1".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredential));
    }

    #[tokio::test]
    async fn test_login_token_carries_grant() {
        let service = service();
        let user = service.signup(signup("a@b.com", "secret1")).await.unwrap();

        let outcome = service
            .login("a@b.com", "secret1".to_string())
            .await
            .unwrap();

        let claims = service.tokens.verify(&outcome.token.token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.permissions, outcome.permissions);
        assert_eq!(claims.permissions, Permission::session_grant());
    }
}
