// ABOUTME: Route handlers for user administration and the caller's own profile
// ABOUTME: New accounts start unconfirmed and receive a confirmation key by mail
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! User routes
//!
//! Every endpoint requires ADMIN except `PATCH /user/updateProfile`, which
//! any authenticated user calls for their own account.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use recipe_core::errors::{AppError, AppResult};
use recipe_core::permissions::UserRole;
use uuid::Uuid;

use super::{json_body, path_id};
use crate::email::{EmailContext, EmailKind};
use crate::models::{CreatedId, NewUser, ProfileUpdate, User, UserUpdate};
use crate::resources::ServerResources;

/// User routes handler
pub struct UserRoutes;

impl UserRoutes {
    /// Create all user routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/user", get(Self::handle_list).post(Self::handle_create))
            .route("/user/updateProfile", patch(Self::handle_update_profile))
            .route(
                "/user/resendConfirmation/:id",
                patch(Self::handle_resend_confirmation),
            )
            .route(
                "/user/:id",
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .with_state(resources)
    }

    /// Handle GET /user - All users with their roles
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let users = resources.database.users().list().await?;
        Ok((StatusCode::OK, Json(users)).into_response())
    }

    /// Handle GET /user/:id - One user with roles
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let id = path_id(path, "id")?;
        let user = resources.database.users().get(id).await?;
        Ok((StatusCode::OK, Json(user)).into_response())
    }

    /// Handle POST /user - Register an unconfirmed user and mail the key
    ///
    /// When the mail cannot be sent the account is removed again, so the
    /// username and email stay available for another attempt.
    #[tracing::instrument(skip_all)]
    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Result<Json<NewUser>, JsonRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let new_user = json_body(body)?.validated()?;

        let password_hash = resources.auth_manager.hash_password(&new_user.password).await?;
        let key = Uuid::new_v4().to_string();
        let users = resources.database.users();
        let id = users.create(&new_user, &password_hash, &key).await?;

        let user = users.get(id).await?;
        if let Err(e) = send_key_mail(&resources, EmailKind::Confirm, &user, &key).await {
            tracing::warn!(user_id = id, error = %e, "Confirmation mail failed, removing account");
            users.delete(id).await?;
            return Err(e);
        }

        tracing::info!(user_id = id, username = %user.username, "User created");
        Ok((StatusCode::CREATED, Json(CreatedId { id })).into_response())
    }

    /// Handle PATCH /user/resendConfirmation/:id - New key for an unconfirmed user
    async fn handle_resend_confirmation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let id = path_id(path, "id")?;

        let users = resources.database.users();
        let user = users.get(id).await?;
        if user.confirmed {
            return Err(AppError::not_found("Unconfirmed user"));
        }

        let key = Uuid::new_v4().to_string();
        users.issue_key(id, &key).await?;
        send_key_mail(&resources, EmailKind::Confirm, &user, &key).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle PATCH /user/updateProfile - Update the caller's own profile
    async fn handle_update_profile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Result<Json<ProfileUpdate>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let auth = resources.auth_middleware.authorize(&headers, &[])?;
        let profile = json_body(body)?.validated()?;
        resources
            .database
            .users()
            .update_profile(auth.user_id, &profile)
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle PUT /user/:id - Update a user and replace the roles
    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
        body: Result<Json<UserUpdate>, JsonRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let id = path_id(path, "id")?;
        let update = json_body(body)?.validated()?;

        let password_hash = match update.new_password() {
            Some(password) => Some(resources.auth_manager.hash_password(password).await?),
            None => None,
        };
        resources
            .database
            .users()
            .update(id, &update, password_hash.as_deref())
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle DELETE /user/:id - Delete a user without recipes
    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let id = path_id(path, "id")?;
        resources.database.users().delete(id).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}

/// Render and send a confirmation or reset mail carrying `key`
pub(super) async fn send_key_mail(
    resources: &ServerResources,
    kind: EmailKind,
    user: &User,
    key: &str,
) -> AppResult<()> {
    let context = EmailContext::new(
        &resources.config.mail.app_url,
        &user.username,
        user.first_name.as_deref(),
        user.last_name.as_deref(),
    )
    .with_key(key);
    let message = resources.templates.render(kind, &user.email, &context)?;
    resources.mailer.send(message).await
}
