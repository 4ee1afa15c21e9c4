// ABOUTME: Bearer token authentication and role checks for the public API
// ABOUTME: Reads the Authorization header, validates the access token and exposes the caller
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use http::HeaderMap;
use recipe_core::errors::{AppError, AppResult};
use recipe_core::permissions::{has_any_role, UserRole};

use crate::auth::AuthManager;

/// Authenticated caller of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    /// Caller's user id
    pub user_id: i64,
    /// Roles carried by the access token
    pub roles: Vec<UserRole>,
}

impl AuthResult {
    /// Require at least one of `allowed`; an empty list admits every caller
    ///
    /// # Errors
    ///
    /// Returns `FORBIDDEN` when none of the caller's roles is allowed
    pub fn require_any(&self, allowed: &[UserRole]) -> AppResult<()> {
        if has_any_role(&self.roles, allowed) {
            Ok(())
        } else {
            tracing::debug!(user_id = self.user_id, ?allowed, "Role check failed");
            Err(AppError::forbidden())
        }
    }
}

/// Middleware for bearer token authentication
#[derive(Clone)]
pub struct BearerAuthMiddleware {
    auth_manager: AuthManager,
}

impl BearerAuthMiddleware {
    /// Create new bearer auth middleware
    #[must_use]
    pub const fn new(auth_manager: AuthManager) -> Self {
        Self { auth_manager }
    }

    /// Authenticate a request from its headers
    ///
    /// # Errors
    ///
    /// Returns `INVALID_CREDENTIALS` when no bearer token is sent,
    /// `INVALID_TOKEN` for a malformed or refresh token and `EXPIRED_TOKEN`
    /// for an expired one
    #[tracing::instrument(
        skip(self, headers),
        fields(user_id = tracing::field::Empty, success = tracing::field::Empty)
    )]
    pub fn authenticate_request(&self, headers: &HeaderMap) -> AppResult<AuthResult> {
        let Some(token) = bearer_token(headers) else {
            tracing::Span::current().record("success", false);
            return Err(AppError::invalid_credentials());
        };

        match self.auth_manager.validate_access_token(token) {
            Ok(claims) => {
                tracing::Span::current()
                    .record("user_id", claims.user_id)
                    .record("success", true);
                Ok(AuthResult {
                    user_id: claims.user_id,
                    roles: claims.roles,
                })
            }
            Err(e) => {
                tracing::Span::current().record("success", false);
                Err(e.into())
            }
        }
    }

    /// Authenticate a request and require one of `allowed`
    ///
    /// # Errors
    ///
    /// Returns the authentication error, or `FORBIDDEN` on a role mismatch
    pub fn authorize(&self, headers: &HeaderMap, allowed: &[UserRole]) -> AppResult<AuthResult> {
        let auth = self.authenticate_request(headers)?;
        auth.require_any(allowed)?;
        Ok(auth)
    }
}

/// Extract the token from `Authorization: Bearer <token>`
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() && !token.contains(' '))
        .then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use http::HeaderValue;
    use recipe_core::errors::ErrorCode;

    fn middleware() -> (BearerAuthMiddleware, AuthManager) {
        let auth = AuthManager::new(&AuthConfig::default()).unwrap();
        (BearerAuthMiddleware::new(auth.clone()), auth)
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer a b")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_missing_or_malformed_header_is_invalid_credentials() {
        let (middleware, _) = middleware();
        let error = middleware.authenticate_request(&HeaderMap::new()).unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidCredentials);

        let error = middleware.authenticate_request(&headers("Bearer")).unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidCredentials);

        let error = middleware.authenticate_request(&headers("Bearer not.a.jwt")).unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidToken);
    }

    #[test]
    fn test_role_guard() {
        let (middleware, auth) = middleware();
        let pair = auth.issue_tokens(3, &[UserRole::Creator]).unwrap();
        let headers = headers(&format!("Bearer {}", pair.token));

        let caller = middleware.authorize(&headers, UserRole::AUTHORS).unwrap();
        assert_eq!(caller.user_id, 3);
        assert!(middleware.authorize(&headers, &[]).is_ok());

        let error = middleware.authorize(&headers, UserRole::ADMINS).unwrap_err();
        assert_eq!(error.code, ErrorCode::Forbidden);
    }

    #[test]
    fn test_refresh_token_rejected() {
        let (middleware, auth) = middleware();
        let pair = auth.issue_tokens(3, &[UserRole::Admin]).unwrap();
        let error = middleware
            .authenticate_request(&headers(&format!("Bearer {}", pair.refresh_token)))
            .unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidToken);
    }
}
