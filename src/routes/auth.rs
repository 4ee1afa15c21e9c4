// ABOUTME: Authentication route handlers: login, token refresh, confirmation and password reset
// ABOUTME: Only confirmed users can log in, refresh tokens or request a reset key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! Authentication routes
//!
//! Login returns an access and a refresh token. The refresh token is only
//! accepted by `POST /auth/refresh`; protected routes reject it.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use recipe_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::json_body;
use super::users::send_key_mail;
use crate::auth::verify_password;
use crate::email::EmailKind;
use crate::models::{
    ConfirmAccount, PasswordChange, ResetPassword, ResetRequest, User, UserCredentials,
};
use crate::resources::ServerResources;

/// Body of `POST /auth/refresh`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RefreshRequest {
    /// Refresh token issued by login
    #[serde(default)]
    pub refresh_token: String,
}

/// Response of `POST /auth/login` and `POST /auth/refresh`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LoginResponse {
    /// Access token for the Authorization header
    pub token: String,
    /// Token for `POST /auth/refresh`
    pub refresh_token: String,
    /// Logged in user
    pub user: User,
}

/// Authentication routes handler
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/auth/login", post(Self::handle_login))
            .route("/auth/refresh", post(Self::handle_refresh))
            .route("/auth/password", patch(Self::handle_change_password))
            .route("/auth/confirm", patch(Self::handle_confirm))
            .route(
                "/auth/reset",
                post(Self::handle_request_reset).patch(Self::handle_reset_password),
            )
            .route("/auth/user", get(Self::handle_current_user))
            .with_state(resources)
    }

    /// Handle POST /auth/login
    #[tracing::instrument(skip_all, fields(username = tracing::field::Empty))]
    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        body: Result<Json<UserCredentials>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let credentials = json_body(body)?;
        tracing::Span::current().record("username", credentials.username.as_str());

        let Some((user, password_hash)) = resources
            .database
            .users()
            .find_credentials(credentials.username.trim())
            .await?
        else {
            return Err(AppError::invalid_credentials());
        };
        if !verify_password(&credentials.password, &password_hash).await? {
            tracing::info!(user_id = user.id, "Login rejected, wrong password");
            return Err(AppError::invalid_credentials());
        }

        let pair = resources.auth_manager.issue_tokens(user.id, &user.roles)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((
            StatusCode::OK,
            Json(LoginResponse {
                token: pair.token,
                refresh_token: pair.refresh_token,
                user,
            }),
        )
            .into_response())
    }

    /// Handle POST /auth/refresh - New token pair with the user's current roles
    async fn handle_refresh(
        State(resources): State<Arc<ServerResources>>,
        body: Result<Json<RefreshRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let request = json_body(body)?;
        let claims = resources
            .auth_manager
            .validate_refresh_token(&request.refresh_token)?;

        let user = resources
            .database
            .users()
            .find_confirmed(claims.user_id)
            .await?
            .ok_or_else(AppError::invalid_credentials)?;

        let pair = resources.auth_manager.issue_tokens(user.id, &user.roles)?;
        Ok((
            StatusCode::OK,
            Json(LoginResponse {
                token: pair.token,
                refresh_token: pair.refresh_token,
                user,
            }),
        )
            .into_response())
    }

    /// Handle PATCH /auth/password - Change the caller's password
    async fn handle_change_password(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Result<Json<PasswordChange>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let auth = resources.auth_middleware.authorize(&headers, &[])?;
        let change = json_body(body)?.validated()?;

        let users = resources.database.users();
        let current = users.password_hash(auth.user_id).await?;
        if !verify_password(&change.password, &current).await? {
            return Err(AppError::invalid_credentials());
        }

        let hash = resources.auth_manager.hash_password(&change.new_password).await?;
        users.set_password(auth.user_id, &hash).await?;
        tracing::info!(user_id = auth.user_id, "Password changed");
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle PATCH /auth/confirm - Confirm an account with the mailed key
    async fn handle_confirm(
        State(resources): State<Arc<ServerResources>>,
        body: Result<Json<ConfirmAccount>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let request = json_body(body)?;
        resources
            .database
            .users()
            .confirm(request.username.trim(), request.key.trim())
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle POST /auth/reset - Mail a password reset key
    #[tracing::instrument(skip_all)]
    async fn handle_request_reset(
        State(resources): State<Arc<ServerResources>>,
        body: Result<Json<ResetRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let request = json_body(body)?.validated()?;

        let users = resources.database.users();
        let user = users
            .find_confirmed_by_email(&request.email)
            .await?
            .ok_or_else(AppError::account_doesnt_exist)?;

        let key = Uuid::new_v4().to_string();
        users.issue_key(user.id, &key).await?;
        if let Err(e) = send_key_mail(&resources, EmailKind::Reset, &user, &key).await {
            users.clear_key(user.id).await?;
            return Err(e);
        }

        tracing::info!(user_id = user.id, "Password reset key sent");
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle PATCH /auth/reset - Set a new password with a reset key
    async fn handle_reset_password(
        State(resources): State<Arc<ServerResources>>,
        body: Result<Json<ResetPassword>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let request = json_body(body)?.validated()?;

        let users = resources.database.users();
        let (user_id, issued_at) = users
            .find_by_key(&request.username, &request.key)
            .await?
            .ok_or_else(AppError::account_doesnt_exist)?;

        if key_expired(issued_at, resources.config.auth.reset_link_validity)? {
            users.clear_key(user_id).await?;
            tracing::info!(user_id, "Rejected expired reset key");
            return Err(AppError::invalid_credentials());
        }

        let hash = resources.auth_manager.hash_password(&request.new_password).await?;
        users.set_password(user_id, &hash).await?;
        tracing::info!(user_id, "Password reset");
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle GET /auth/user - The caller's own account
    async fn handle_current_user(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = resources.auth_middleware.authorize(&headers, &[])?;
        let user = resources.database.users().get(auth.user_id).await?;
        Ok((StatusCode::OK, Json(user)).into_response())
    }
}

fn key_expired(
    issued_at: chrono::DateTime<Utc>,
    validity: std::time::Duration,
) -> AppResult<bool> {
    let validity = chrono::Duration::from_std(validity)
        .map_err(|e| AppError::internal(format!("Reset link validity out of range: {e}")))?;
    Ok(issued_at + validity < Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_key_expiry() {
        let validity = Duration::from_secs(60 * 60);
        assert!(!key_expired(Utc::now(), validity).unwrap());
        assert!(key_expired(Utc::now() - chrono::Duration::hours(2), validity).unwrap());
        assert!(key_expired(chrono::DateTime::<Utc>::UNIX_EPOCH, validity).unwrap());
    }
}
