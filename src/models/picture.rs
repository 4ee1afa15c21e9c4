// ABOUTME: Picture metadata exposed by the API and the payload stored on upload
// ABOUTME: Binary data never travels in JSON; it is served from dedicated endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use serde::{Deserialize, Serialize};

/// Picture metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PictureInfo {
    /// Row id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Position within the recipe gallery
    pub sort_number: i64,
}

impl From<(i64, String, i64)> for PictureInfo {
    fn from((id, name, sort_number): (i64, String, i64)) -> Self {
        Self {
            id,
            name,
            sort_number,
        }
    }
}

/// Processed upload ready to be stored
#[derive(Debug, Clone)]
pub struct NewPicture {
    /// Display name (already truncated)
    pub name: String,
    /// JPEG of the resized picture
    pub data: Vec<u8>,
    /// JPEG of the square thumbnail
    pub thumbnail: Vec<u8>,
}
