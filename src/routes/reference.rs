// ABOUTME: Route handlers for categories, tags and unit categories
// ABOUTME: One generic route table serves the three named-record resources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! Named record routes
//!
//! Listing is open to every authenticated user; reading a single record and
//! every change require ADMIN.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use recipe_core::errors::AppError;
use recipe_core::permissions::UserRole;

use super::{json_body, path_id};
use crate::database::{NamedRecordsManager, NamedTable};
use crate::models::{CreatedId, NamedRecordInput};
use crate::resources::ServerResources;

#[derive(Clone)]
struct NamedRecordState {
    resources: Arc<ServerResources>,
    table: NamedTable,
}

impl NamedRecordState {
    fn manager(&self) -> NamedRecordsManager {
        NamedRecordsManager::new(self.resources.database.pool().clone(), self.table)
    }
}

/// Named record routes handler
pub struct NamedRecordRoutes;

impl NamedRecordRoutes {
    /// Create the routes of one named-record table
    pub fn routes(resources: Arc<ServerResources>, table: NamedTable) -> Router {
        let base = Self::base_path(table);
        Router::new()
            .route(base, get(Self::handle_list).post(Self::handle_create))
            .route(
                &format!("{base}/:id"),
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .with_state(NamedRecordState { resources, table })
    }

    /// Path prefix of a table's routes
    #[must_use]
    pub const fn base_path(table: NamedTable) -> &'static str {
        match table {
            NamedTable::Categories => "/category",
            NamedTable::Tags => "/tag",
            NamedTable::UnitCategories => "/unitCategory",
        }
    }

    /// Handle GET /{resource} - List records ordered by name
    async fn handle_list(
        State(state): State<NamedRecordState>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        state.resources.auth_middleware.authorize(&headers, &[])?;
        let records = state.manager().list().await?;
        Ok((StatusCode::OK, Json(records)).into_response())
    }

    /// Handle GET /{resource}/:id - Get one record
    async fn handle_get(
        State(state): State<NamedRecordState>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        state.resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let id = path_id(path, "id")?;
        let record = state.manager().get(id).await?;
        Ok((StatusCode::OK, Json(record)).into_response())
    }

    /// Handle POST /{resource} - Create a record
    async fn handle_create(
        State(state): State<NamedRecordState>,
        headers: HeaderMap,
        body: Result<Json<NamedRecordInput>, JsonRejection>,
    ) -> Result<Response, AppError> {
        state.resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let input = json_body(body)?.validated()?;
        let id = state.manager().create(&input.name).await?;
        Ok((StatusCode::CREATED, Json(CreatedId { id })).into_response())
    }

    /// Handle PUT /{resource}/:id - Rename a record
    async fn handle_update(
        State(state): State<NamedRecordState>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
        body: Result<Json<NamedRecordInput>, JsonRejection>,
    ) -> Result<Response, AppError> {
        state.resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let id = path_id(path, "id")?;
        let input = json_body(body)?.validated()?;
        state.manager().update(id, &input.name).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle DELETE /{resource}/:id - Delete an unreferenced record
    async fn handle_delete(
        State(state): State<NamedRecordState>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        state.resources.auth_middleware.authorize(&headers, UserRole::ADMINS)?;
        let id = path_id(path, "id")?;
        state.manager().delete(id).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
