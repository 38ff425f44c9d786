//! Admin authentication helpers
//!
//! Passwords are stored as bcrypt hashes. A successful login yields an HS256
//! JWT that the admin API expects as `Authorization: Bearer <token>`.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{AppError, AppResult};

/// Hashes an admin password with the configured bcrypt cost.
pub fn hash_password(password: &str) -> AppResult<String> {
    Ok(bcrypt::hash(password, config::admin::BCRYPT_COST)?)
}

/// Checks a password against a stored bcrypt hash.
///
/// A malformed hash counts as a mismatch rather than an error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Claims carried by an admin token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminClaims {
    /// Admin username
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Issues and verifies admin bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: SecretString,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            ttl: Duration::hours(config::admin::TOKEN_TTL_HOURS),
        }
    }

    /// Overrides the token lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Signs a token for `username`.
    pub fn issue(&self, username: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = AdminClaims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| AppError::Auth(format!("failed to sign token: {}", e)))
    }

    /// Validates signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> AppResult<AdminClaims> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<AdminClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("invalid token: {}", e)))
    }
}
