// ABOUTME: Route handlers for recipe search and the recipe aggregate CRUD
// ABOUTME: Create and update submit the whole nested graph, reconciled in one transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! Recipe routes
//!
//! Reading is open to every authenticated user. Authors (ADMIN or CREATOR)
//! create, update and delete recipes; the caller is recorded as creator on
//! create and as modifier on every save.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use recipe_core::errors::AppError;
use recipe_core::permissions::UserRole;

use super::{json_body, path_id};
use crate::models::{CreatedId, RecipeInput, RecipeQuery};
use crate::resources::ServerResources;

/// Recipe routes handler
pub struct RecipeRoutes;

impl RecipeRoutes {
    /// Create all recipe routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/recipe", post(Self::handle_create))
            .route("/recipe/find", post(Self::handle_find))
            .route(
                "/recipe/:id",
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .with_state(resources)
    }

    /// Handle POST /recipe/find - Filtered, ordered and paged search
    async fn handle_find(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Result<Json<RecipeQuery>, JsonRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, &[])?;
        let search = json_body(body)?.validated()?;
        let page = resources.database.recipes().find(&search).await?;
        Ok((StatusCode::OK, Json(page)).into_response())
    }

    /// Handle GET /recipe/:id - The full recipe graph
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, &[])?;
        let id = path_id(path, "id")?;
        let recipe = resources.database.recipes().get(id).await?;
        Ok((StatusCode::OK, Json(recipe)).into_response())
    }

    /// Handle POST /recipe - Create a recipe with all nested collections
    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Result<Json<RecipeInput>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let auth = resources.auth_middleware.authorize(&headers, UserRole::AUTHORS)?;
        let recipe = json_body(body)?.validated()?;
        let id = resources.database.recipes().create(&recipe, auth.user_id).await?;
        Ok((StatusCode::CREATED, Json(CreatedId { id })).into_response())
    }

    /// Handle PUT /recipe/:id - Replace a recipe's state
    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
        body: Result<Json<RecipeInput>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let auth = resources.auth_middleware.authorize(&headers, UserRole::AUTHORS)?;
        let id = path_id(path, "id")?;
        let recipe = json_body(body)?.validated()?;
        resources
            .database
            .recipes()
            .update(id, &recipe, auth.user_id)
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle DELETE /recipe/:id - Delete a recipe and everything it owns
    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, UserRole::AUTHORS)?;
        let id = path_id(path, "id")?;
        resources.database.recipes().delete(id).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
