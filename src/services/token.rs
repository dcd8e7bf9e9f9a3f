//! Session token issuance and verification.
//!
//! Session tokens are HS256 JWTs signed with the server secret. Claims are
//! `{sub, permissions, iat, exp}` with second-precision timestamps.
//!
//! Tokens are self-contained: verification needs only the secret, never the
//! store. There is no revocation; a token is valid until `exp`.

use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::permission::PermissionSet;

/// JWT claims for session tokens
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    /// Subject (user ID)
    sub: Uuid,
    permissions: PermissionSet,
    /// Issued at (Unix timestamp)
    iat: i64,
    /// Expiration time (Unix timestamp)
    exp: i64,
}

/// Identity carried by a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub permissions: PermissionSet,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued token together with its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies signed session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl AsRef<[u8]>, default_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token for `user_id` carrying `permissions`, valid for `ttl`.
    ///
    /// A zero `ttl` produces a token that is already expired.
    ///
    /// # Errors
    ///
    /// `Internal` if `ttl` pushes the expiry past the representable range.
    pub fn issue(
        &self,
        user_id: Uuid,
        permissions: PermissionSet,
        ttl: Duration,
    ) -> Result<IssuedToken, AppError> {
        let out_of_range = || AppError::Internal("Token TTL out of range".to_string());

        let issued_at = Utc::now().trunc_subsecs(0);
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| out_of_range())?;
        let expires_at = issued_at.checked_add_signed(ttl).ok_or_else(out_of_range)?;

        let claims = TokenClaims {
            sub: user_id,
            permissions,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to encode session token: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token against the current time.
    ///
    /// Returns `None` for every failure (bad shape, bad signature, bad
    /// payload, expired) so callers cannot tell which check failed.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as of `now`. Expiry is strict: a token whose
    /// `exp` is not after `now` is invalid.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<SessionClaims> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).ok()?;
        let claims = data.claims;

        let expires_at = DateTime::from_timestamp(claims.exp, 0)?;
        if expires_at <= now {
            return None;
        }

        Some(SessionClaims {
            user_id: claims.sub,
            permissions: claims.permissions,
            issued_at: DateTime::from_timestamp(claims.iat, 0)?,
            expires_at,
        })
    }
}
