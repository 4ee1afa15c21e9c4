// ABOUTME: Route handlers for units of measure
// ABOUTME: Units are listed per unit category; changes require ADMIN
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

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
use crate::models::{CreatedId, UnitInput};
use crate::resources::ServerResources;

/// Unit routes handler
pub struct UnitRoutes;

impl UnitRoutes {
    /// Create all unit routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/unit", post(Self::handle_create))
            .route(
                "/unit/byUnitCategory/:unitCategoryId",
                get(Self::handle_list_by_unit_category),
            )
            .route(
                "/unit/:id",
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .with_state(resources)
    }

    /// Handle GET /unit/byUnitCategory/:unitCategoryId - Units of one category
    async fn handle_list_by_unit_category(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, &[])?;
        let unit_category_id = path_id(path, "unitCategoryId")?;
        let units = resources
            .database
            .units()
            .list_by_unit_category(unit_category_id)
            .await?;
        Ok((StatusCode::OK, Json(units)).into_response())
    }

    /// Handle GET /unit/:id - Get one unit
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, &[])?;
        let id = path_id(path, "id")?;
        let unit = resources.database.units().get(id).await?;
        Ok((StatusCode::OK, Json(unit)).into_response())
    }

    /// Handle POST /unit - Create a unit
    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Result<Json<UnitInput>, JsonRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let unit = json_body(body)?.validated()?;
        let id = resources.database.units().create(&unit).await?;
        Ok((StatusCode::CREATED, Json(CreatedId { id })).into_response())
    }

    /// Handle PUT /unit/:id - Update a unit
    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
        body: Result<Json<UnitInput>, JsonRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let id = path_id(path, "id")?;
        let unit = json_body(body)?.validated()?;
        resources.database.units().update(id, &unit).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle DELETE /unit/:id - Delete a unit no ingredient uses
    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let id = path_id(path, "id")?;
        resources.database.units().delete(id).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
