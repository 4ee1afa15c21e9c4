// ABOUTME: Request and response models for recipes, reference data, pictures and users
// ABOUTME: Serde DTOs in camelCase with validation of incoming bodies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! # Data Models
//!
//! Incoming bodies (`*Input`) are trimmed and validated before they reach
//! the database layer. Outgoing models mirror the JSON returned by the API.

/// Picture metadata
pub mod picture;
/// Recipe aggregate inputs, details and search
pub mod recipe;
/// Categories, tags, unit categories and units
pub mod reference;
/// User accounts
pub mod user;

pub use picture::{NewPicture, PictureInfo};
pub use recipe::{
    IdRef, IngredientDetail, IngredientInput, PictureInput, RecipeDetail, RecipeInput,
    RecipeListItem, RecipeOrderBy, RecipeQuery, RecipeSearch, RecipeSummary, SectionDetail,
    SectionInput, SortOrder, UnitSummary,
};
pub use reference::{NamedRecord, NamedRecordInput, Unit, UnitInput};
pub use user::{
    ConfirmAccount, NewUser, PasswordChange, ProfileUpdate, ResetPassword, ResetRequest, User,
    UserCredentials, UserSummary, UserUpdate,
};

use serde::{Deserialize, Serialize};

/// Body returned by create endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreatedId {
    /// Id of the new row
    pub id: i64,
}
