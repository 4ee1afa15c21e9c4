// ABOUTME: OpenAPI documentation endpoint with Swagger UI for the recipe API
// ABOUTME: Serves the schema at /api-docs/openapi.json and interactive docs at /swagger-ui
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! `OpenAPI` documentation routes
//!
//! Mounted by the server in development builds compiled with the `openapi`
//! feature.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::TokenPair;
use crate::models::{
    ConfirmAccount, CreatedId, IdRef, IngredientDetail, IngredientInput, NamedRecord,
    NamedRecordInput, NewUser, PasswordChange, PictureInfo, PictureInput, ProfileUpdate,
    RecipeDetail, RecipeInput, RecipeListItem, RecipeQuery, RecipeSummary, ResetPassword,
    ResetRequest, SectionDetail, SectionInput, Unit, UnitInput, UnitSummary, User,
    UserCredentials, UserSummary, UserUpdate,
};
use crate::routes::auth::{LoginResponse, RefreshRequest};

/// `OpenAPI` documentation for the recipe API
///
/// Handlers are associated functions, which path annotations do not
/// support, so only request and response schemas are published.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Recipe Server API",
        version = "0.1.0",
        description = "Recipes with sections, ingredients, pictures and tags",
        license(name = "MIT OR Apache-2.0")
    ),
    tags(
        (name = "auth", description = "Login, tokens and password reset"),
        (name = "recipes", description = "Recipe aggregates and search"),
        (name = "reference", description = "Categories, tags, unit categories and units"),
        (name = "users", description = "User administration")
    ),
    components(
        schemas(
            UserCredentials,
            RefreshRequest,
            LoginResponse,
            TokenPair,
            PasswordChange,
            ConfirmAccount,
            ResetRequest,
            ResetPassword,
            User,
            UserSummary,
            NewUser,
            UserUpdate,
            ProfileUpdate,
            CreatedId,
            NamedRecord,
            NamedRecordInput,
            Unit,
            UnitInput,
            UnitSummary,
            IdRef,
            RecipeInput,
            SectionInput,
            IngredientInput,
            PictureInput,
            RecipeQuery,
            RecipeDetail,
            RecipeSummary,
            RecipeListItem,
            SectionDetail,
            IngredientDetail,
            PictureInfo,
        )
    ),
    servers(
        (url = "http://localhost:8080/api", description = "Local development server")
    )
)]
pub struct ApiDoc;

/// `OpenAPI` routes provider
pub struct OpenApiRoutes;

impl OpenApiRoutes {
    /// Create `OpenAPI` documentation routes
    pub fn routes<S: Clone + Send + Sync + 'static>() -> Router<S> {
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    }
}
