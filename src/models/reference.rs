// ABOUTME: Reference data models shared by recipes and ingredients
// ABOUTME: Categories, tags and unit categories are named records; units add abbreviations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use recipe_core::constants::limits;
use recipe_core::errors::AppResult;
use serde::{Deserialize, Serialize};

use crate::validation::Validator;

/// Category, tag or unit category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NamedRecord {
    /// Row id
    pub id: i64,
    /// Unique name
    pub name: String,
}

/// Body for creating or renaming a named record
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NamedRecordInput {
    /// Unique name
    #[serde(default)]
    pub name: String,
}

impl NamedRecordInput {
    /// Trim and validate
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` when the name is blank or too long
    pub fn validated(mut self) -> AppResult<Self> {
        self.name = self.name.trim().to_owned();
        let mut v = Validator::new();
        v.required_text("name", &self.name, limits::REFERENCE_NAME_MAX);
        v.finish()?;
        Ok(self)
    }
}

/// Unit of measure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Unit {
    /// Row id
    pub id: i64,
    /// Unique name
    pub name: String,
    /// Unique abbreviation
    pub abbreviation: String,
    /// Whether an ingredient in this unit needs a value
    pub required: bool,
    /// Owning unit category
    pub unit_category_id: i64,
}

/// Body for creating or updating a unit
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UnitInput {
    /// Unique name
    #[serde(default)]
    pub name: String,
    /// Unique abbreviation
    #[serde(default)]
    pub abbreviation: String,
    /// Whether an ingredient in this unit needs a value
    #[serde(default)]
    pub required: bool,
    /// Owning unit category
    #[serde(default)]
    pub unit_category_id: i64,
}

impl UnitInput {
    /// Trim and validate
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` listing every invalid field
    pub fn validated(mut self) -> AppResult<Self> {
        self.name = self.name.trim().to_owned();
        self.abbreviation = self.abbreviation.trim().to_owned();

        let mut v = Validator::new();
        v.required_text("name", &self.name, limits::REFERENCE_NAME_MAX)
            .required_text("abbreviation", &self.abbreviation, limits::ABBREVIATION_MAX)
            .id("unitCategoryId", self.unit_category_id);
        v.finish()?;
        Ok(self)
    }
}
