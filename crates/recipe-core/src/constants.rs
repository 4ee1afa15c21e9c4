// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Field limits, defaults and validation message keys for the recipe server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single
//! flat list.

/// Validation message keys sent back in `fields`
pub mod messages {
    /// Value missing or empty
    pub const REQUIRED: &str = "required";
    /// String longer than allowed
    pub const MAX_LENGTH: &str = "maxLength";
    /// String shorter than allowed
    pub const MIN_LENGTH: &str = "minLength";
    /// Number below the minimum
    pub const MIN: &str = "min";
    /// Number above the maximum
    pub const MAX: &str = "max";
    /// Value outside the allowed set
    pub const ALLOWED: &str = "allowed";
    /// Value has the wrong shape
    pub const INVALID_VALUE: &str = "invalidValue";
    /// Password misses a character class
    pub const SIMPLE_PASSWORD: &str = "simplePassword";
    /// Unique index violation
    pub const NOT_UNIQUE: &str = "notUnique";
}

/// Field length and range limits
pub mod limits {
    /// Recipe, section, ingredient and picture name length
    pub const NAME_MAX: usize = 80;
    /// Recipe description length
    pub const DESCRIPTION_MAX: usize = 160;
    /// Length of a single recipe source entry
    pub const SOURCE_MAX: usize = 1000;
    /// Minimum servings
    pub const SERVES_MIN: i64 = 1;
    /// Maximum servings
    pub const SERVES_MAX: i64 = 100;
    /// Category, tag, unit and unit category name length
    pub const REFERENCE_NAME_MAX: usize = 50;
    /// Unit abbreviation length
    pub const ABBREVIATION_MAX: usize = 20;
    /// Username length bounds
    pub const USERNAME_MIN: usize = 4;
    /// Username length bounds
    pub const USERNAME_MAX: usize = 50;
    /// Password length bounds
    pub const PASSWORD_MIN: usize = 8;
    /// Password length bounds
    pub const PASSWORD_MAX: usize = 255;
    /// First and last name length bounds
    pub const PERSON_NAME_MIN: usize = 3;
    /// First and last name length bounds
    pub const PERSON_NAME_MAX: usize = 50;
    /// Email length
    pub const EMAIL_MAX: usize = 255;
    /// Longest search string accepted by recipe find
    pub const SEARCH_MAX: usize = 160;
}

/// Recipe search paging
pub mod paging {
    /// Largest page size a client may request
    pub const MAX_PAGE_SIZE: i64 = 100;
    /// Largest zero-based page number; keeps `page * pageSize` within `i64`
    pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;
}

/// Picture handling
pub mod pictures {
    /// Age after which an unattached picture is garbage-collected
    pub const ORPHAN_MAX_AGE_HOURS: i64 = 24;
    /// Names of this length or longer are truncated
    pub const NAME_TRUNCATE_AT: usize = 80;
    /// Characters kept from a truncated name
    pub const NAME_KEEP: usize = 75;
    /// Sort number given to fresh uploads
    pub const INITIAL_SORT_NUMBER: i64 = 1;
    /// JPEG quality of the full-size picture
    pub const IMAGE_QUALITY: u8 = 90;
    /// JPEG quality of the thumbnail
    pub const THUMBNAIL_QUALITY: u8 = 85;
    /// Default bounding box of the full-size picture
    pub const DEFAULT_IMAGE_DIMENSION: u32 = 1280;
    /// Default edge of the square thumbnail
    pub const DEFAULT_THUMBNAIL_DIMENSION: u32 = 320;
    /// Content type of stored pictures
    pub const CONTENT_TYPE: &str = "image/jpeg";
}

/// API endpoints
pub mod endpoints {
    /// Health check endpoint
    pub const HEALTH_CHECK: &str = "/health";
    /// Default public API base path
    pub const API_BASE: &str = "/api";
    /// Default internal API base path
    pub const INTERNAL_BASE: &str = "/internal";
}

/// Network ports
pub mod ports {
    /// Default public HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8080;
    /// Default internal HTTP port
    pub const DEFAULT_INTERNAL_PORT: u16 = 8081;
}
