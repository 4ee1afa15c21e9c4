// ABOUTME: Route module organization for the recipe server HTTP endpoints
// ABOUTME: One routes type per resource plus shared extraction helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! Route module for the recipe server
//!
//! Each domain module holds the route table and thin handlers that check
//! roles, validate the body and delegate to a database manager. Extraction
//! failures are reported as `VALIDATION_FAILED` instead of axum's plain
//! text rejections.

/// Login, token refresh, confirmation and password reset
pub mod auth;
/// Health check
pub mod health;
/// Internal endpoints (notification digest)
pub mod internal;
/// `OpenAPI` documentation routes (feature-gated)
#[cfg(feature = "openapi")]
pub mod openapi;
/// Picture upload and download
pub mod pictures;
/// Recipe search and CRUD
pub mod recipes;
/// Categories, tags and unit categories
pub mod reference;
/// Units of measure
pub mod units;
/// User administration and profile
pub mod users;

pub use auth::AuthRoutes;
pub use health::HealthRoutes;
pub use internal::InternalRoutes;
#[cfg(feature = "openapi")]
pub use openapi::OpenApiRoutes;
pub use pictures::PictureRoutes;
pub use recipes::RecipeRoutes;
pub use reference::NamedRecordRoutes;
pub use units::UnitRoutes;
pub use users::UserRoutes;

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::{Json, Router};
use recipe_core::constants::messages;
use recipe_core::errors::{AppError, AppResult, FieldErrors};

use crate::database::NamedTable;
use crate::resources::ServerResources;

/// Every public route, relative to the base path
pub fn api_routes(resources: &Arc<ServerResources>) -> Router {
    Router::new()
        .merge(HealthRoutes::routes())
        .merge(AuthRoutes::routes(resources.clone()))
        .merge(NamedRecordRoutes::routes(resources.clone(), NamedTable::Categories))
        .merge(NamedRecordRoutes::routes(resources.clone(), NamedTable::Tags))
        .merge(NamedRecordRoutes::routes(resources.clone(), NamedTable::UnitCategories))
        .merge(UnitRoutes::routes(resources.clone()))
        .merge(PictureRoutes::routes(resources.clone()))
        .merge(RecipeRoutes::routes(resources.clone()))
        .merge(UserRoutes::routes(resources.clone()))
}

/// Unwrap a JSON body, turning a rejection into `VALIDATION_FAILED`
///
/// # Errors
///
/// Returns `VALIDATION_FAILED` with `{body: invalidValue}` when the body is
/// missing, not JSON, or does not match the expected shape
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        let mut fields = FieldErrors::new();
        fields.insert("body".to_owned(), messages::INVALID_VALUE.to_owned());
        let mut error = AppError::validation(fields);
        error.message = rejection.body_text();
        error
    })
}

/// Unwrap a numeric path parameter
///
/// # Errors
///
/// Returns `VALIDATION_FAILED` with `{<name>: invalidValue}` when the segment
/// is not an integer, or `{<name>: min}` when it is below 1
pub fn path_id(path: Result<Path<i64>, PathRejection>, name: &str) -> AppResult<i64> {
    match path {
        Ok(Path(id)) if id >= 1 => Ok(id),
        Ok(_) => Err(AppError::invalid_field(name, messages::MIN)),
        Err(_) => Err(AppError::invalid_field(name, messages::INVALID_VALUE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_core::errors::ErrorCode;

    #[test]
    fn test_path_id_bounds() {
        assert_eq!(path_id(Ok(Path(3)), "id").unwrap(), 3);

        let error = path_id(Ok(Path(0)), "id").unwrap_err();
        assert_eq!(error.code, ErrorCode::ValidationFailed);
        assert_eq!(error.fields.unwrap().get("id").map(String::as_str), Some(messages::MIN));
    }
}
