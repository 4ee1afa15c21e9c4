// ABOUTME: JWT access and refresh tokens plus bcrypt password hashing
// ABOUTME: Tokens are HS256 signed; refresh tokens are rejected where an access token is needed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! # Authentication
//!
//! Login issues a pair of tokens. The access token carries the user id and
//! roles and authorizes API calls; the refresh token carries only the user
//! id and a `refresh` flag and can be exchanged for a new pair.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use recipe_core::errors::{AppError, AppResult};
use recipe_core::permissions::UserRole;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AuthConfig;

/// `JWT` validation error with detailed information
#[derive(Debug, Clone, thiserror::Error)]
pub enum JwtValidationError {
    /// Token has expired
    #[error("JWT token expired at {}", expired_at.format("%Y-%m-%d %H:%M:%S UTC"))]
    TokenExpired {
        /// When the token expired
        expired_at: DateTime<Utc>,
    },
    /// Token signature is invalid or the token is of the wrong kind
    #[error("JWT token is invalid: {reason}")]
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Token is malformed (not proper `JWT` format)
    #[error("JWT token is malformed: {details}")]
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

impl From<JwtValidationError> for AppError {
    fn from(error: JwtValidationError) -> Self {
        match &error {
            JwtValidationError::TokenExpired { .. } => Self::expired_token(error.to_string()),
            JwtValidationError::TokenInvalid { .. } | JwtValidationError::TokenMalformed { .. } => {
                Self::invalid_token(error.to_string())
            }
        }
    }
}

/// `JWT` claims shared by access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Authenticated user
    pub user_id: i64,
    /// Granted roles, empty in refresh tokens
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<UserRole>,
    /// Set on refresh tokens
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub refresh: bool,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Access and refresh token returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TokenPair {
    /// Bearer token for API calls
    pub token: String,
    /// Token for `POST /auth/refresh`
    pub refresh_token: String,
}

/// Issues and validates tokens
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_validity: Duration,
    refresh_token_validity: Duration,
    bcrypt_cost: u32,
}

impl AuthManager {
    /// Create an authentication manager from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a validity does not fit a signed duration
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let to_signed = |value: std::time::Duration| {
            Duration::from_std(value)
                .map_err(|e| AppError::internal(format!("Token validity out of range: {e}")))
        };

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.token_sign_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.token_sign_key.as_bytes()),
            token_validity: to_signed(config.token_validity)?,
            refresh_token_validity: to_signed(config.refresh_token_validity)?,
            bcrypt_cost: config.bcrypt_cost,
        })
    }

    /// Issue an access and refresh token for a user
    ///
    /// # Errors
    ///
    /// Returns an error if token encoding fails
    pub fn issue_tokens(&self, user_id: i64, roles: &[UserRole]) -> AppResult<TokenPair> {
        self.issue_tokens_at(user_id, roles, Utc::now())
    }

    /// Issue tokens as if the current time were `issued_at`
    ///
    /// # Errors
    ///
    /// Returns an error if token encoding fails
    pub fn issue_tokens_at(
        &self,
        user_id: i64,
        roles: &[UserRole],
        issued_at: DateTime<Utc>,
    ) -> AppResult<TokenPair> {
        let access = Claims {
            user_id,
            roles: roles.to_vec(),
            refresh: false,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.token_validity).timestamp(),
        };
        let refresh = Claims {
            user_id,
            roles: Vec::new(),
            refresh: true,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.refresh_token_validity).timestamp(),
        };

        Ok(TokenPair {
            token: self.encode(&access)?,
            refresh_token: self.encode(&refresh)?,
        })
    }

    fn encode(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    /// Validate an access token
    ///
    /// # Errors
    ///
    /// Returns [`JwtValidationError::TokenExpired`] for an expired token and
    /// [`JwtValidationError::TokenInvalid`] for refresh tokens or bad signatures
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtValidationError> {
        let claims = self.validate(token)?;
        if claims.refresh {
            return Err(JwtValidationError::TokenInvalid {
                reason: "refresh token used as access token".into(),
            });
        }
        Ok(claims)
    }

    /// Validate a refresh token
    ///
    /// # Errors
    ///
    /// Returns an error for expired tokens and for access tokens
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtValidationError> {
        let claims = self.validate(token)?;
        if !claims.refresh {
            return Err(JwtValidationError::TokenInvalid {
                reason: "access token used as refresh token".into(),
            });
        }
        Ok(claims)
    }

    fn validate(&self, token: &str) -> Result<Claims, JwtValidationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below so that it can be reported separately.
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| Self::convert_jwt_error(&e))?;

        let now = Utc::now();
        if now.timestamp() > claims.exp {
            let expired_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(now);
            debug!(user_id = claims.user_id, %expired_at, "Rejected expired token");
            return Err(JwtValidationError::TokenExpired { expired_at });
        }
        Ok(claims)
    }

    /// Convert JWT library errors to detailed validation errors
    fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> JwtValidationError {
        use jsonwebtoken::errors::ErrorKind;
        warn!("JWT token validation failed: {:?}", e);

        match e.kind() {
            ErrorKind::InvalidSignature => JwtValidationError::TokenInvalid {
                reason: "Token signature verification failed".into(),
            },
            ErrorKind::InvalidToken => JwtValidationError::TokenMalformed {
                details: "Token format is invalid".into(),
            },
            ErrorKind::Base64(base64_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid base64: {base64_err}"),
            },
            ErrorKind::Json(json_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid JSON: {json_err}"),
            },
            ErrorKind::Utf8(utf8_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid UTF-8: {utf8_err}"),
            },
            _ => JwtValidationError::TokenInvalid {
                reason: format!("Token validation failed: {e}"),
            },
        }
    }

    /// Hash a password with the configured cost
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails
    pub async fn hash_password(&self, password: &str) -> AppResult<String> {
        hash_password(password, self.bcrypt_cost).await
    }
}

/// Hash a password with bcrypt on the blocking pool
///
/// # Errors
///
/// Returns an error if hashing fails or the blocking task panics
pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
}

/// Check a password against a bcrypt hash on the blocking pool
///
/// A malformed stored hash counts as a mismatch.
///
/// # Errors
///
/// Returns an error if the blocking task panics
pub async fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))
}
