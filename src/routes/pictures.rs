// ABOUTME: Route handlers for picture upload and download
// ABOUTME: Uploads are resized into a JPEG and a square thumbnail before they are stored
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! Picture routes
//!
//! An upload creates an unattached picture. It becomes part of a recipe when
//! the recipe is saved with the picture's id; uploads never attached are
//! removed by the orphan cleanup that runs on recipe saves.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use recipe_core::constants::{messages, pictures};
use recipe_core::errors::AppError;
use recipe_core::permissions::UserRole;
use tower_http::limit::RequestBodyLimitLayer;

use super::path_id;
use crate::images::{picture_name, process_upload};
use crate::models::{CreatedId, NewPicture};
use crate::resources::ServerResources;

/// Multipart field carrying the upload
const FILE_FIELD: &str = "file";

/// Picture routes handler
pub struct PictureRoutes;

impl PictureRoutes {
    /// Create all picture routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        let upload_limit = resources.config.pictures.max_upload_bytes;
        Router::new()
            .route(
                "/picture/upload",
                post(Self::handle_upload)
                    .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                    .layer(RequestBodyLimitLayer::new(upload_limit)),
            )
            .route("/picture/byRecipe/:recipeId", get(Self::handle_list_by_recipe))
            .route("/picture/thumbnail/:id", get(Self::handle_thumbnail))
            .route("/picture/data/:id", get(Self::handle_data))
            .with_state(resources)
    }

    /// Handle GET /picture/byRecipe/:recipeId - Pictures of a recipe
    async fn handle_list_by_recipe(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, &[])?;
        let recipe_id = path_id(path, "recipeId")?;
        let pictures = resources.database.pictures().list_by_recipe(recipe_id).await?;
        Ok((StatusCode::OK, Json(pictures)).into_response())
    }

    /// Handle GET /picture/thumbnail/:id - Thumbnail JPEG
    async fn handle_thumbnail(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, &[])?;
        let id = path_id(path, "id")?;
        let bytes = resources.database.pictures().thumbnail(id).await?;
        Ok(Self::jpeg(bytes))
    }

    /// Handle GET /picture/data/:id - Full-size JPEG
    async fn handle_data(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        path: Result<Path<i64>, PathRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, &[])?;
        let id = path_id(path, "id")?;
        let bytes = resources.database.pictures().data(id).await?;
        Ok(Self::jpeg(bytes))
    }

    /// Handle POST /picture/upload - Store an unattached picture
    #[tracing::instrument(skip_all)]
    async fn handle_upload(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Response, AppError> {
        resources.auth_middleware.authorize(&headers, UserRole::AUTHORS)?;
        let mut multipart = multipart.map_err(|rejection| {
            tracing::debug!(%rejection, "Rejected upload without multipart body");
            AppError::invalid_field(FILE_FIELD, messages::REQUIRED)
        })?;

        let (file_name, bytes) = Self::read_file_field(&mut multipart).await?;
        let config = resources.config.pictures;
        let processed = tokio::task::spawn_blocking(move || process_upload(&bytes, config))
            .await
            .map_err(|e| AppError::internal(format!("Picture processing task failed: {e}")))??;

        let picture = NewPicture {
            name: picture_name(&file_name),
            data: processed.data,
            thumbnail: processed.thumbnail,
        };
        let id = resources.database.pictures().create(&picture).await?;

        tracing::info!(picture_id = id, name = %picture.name, "Picture uploaded");
        Ok((StatusCode::CREATED, Json(CreatedId { id })).into_response())
    }

    async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), AppError> {
        let invalid = |e: axum::extract::multipart::MultipartError| {
            tracing::debug!(error = %e, "Failed to read multipart upload");
            AppError::invalid_field(FILE_FIELD, messages::INVALID_VALUE)
        };

        while let Some(field) = multipart.next_field().await.map_err(invalid)? {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }
            let file_name = field.file_name().unwrap_or("picture").to_owned();
            let bytes = field.bytes().await.map_err(invalid)?;
            if bytes.is_empty() {
                return Err(AppError::invalid_field(FILE_FIELD, messages::REQUIRED));
            }
            return Ok((file_name, bytes.to_vec()));
        }
        Err(AppError::invalid_field(FILE_FIELD, messages::REQUIRED))
    }

    fn jpeg(bytes: Vec<u8>) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, pictures::CONTENT_TYPE)],
            bytes,
        )
            .into_response()
    }
}
