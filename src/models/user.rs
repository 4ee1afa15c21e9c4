// ABOUTME: User account models and authentication request bodies
// ABOUTME: Password hashes never leave the database layer; roles travel as ADMIN/CREATOR
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use std::str::FromStr;

use chrono::{DateTime, Utc};
use recipe_core::constants::messages;
use recipe_core::errors::AppResult;
use recipe_core::permissions::UserRole;
use serde::{Deserialize, Serialize};

use crate::validation::{trim_optional, Validator};

/// User account as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    /// Row id
    pub id: i64,
    /// Unique login name
    pub username: String,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Unique email address
    pub email: String,
    /// Whether the confirmation key was redeemed
    pub confirmed: bool,
    /// Whether the user receives new-recipe digests
    pub notifications: bool,
    /// Granted roles
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub roles: Vec<UserRole>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the user holds `role`
    #[must_use]
    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }
}

/// Name shown as creator or modifier of a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserSummary {
    /// Login name
    pub username: String,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
}

/// Body of `POST /auth/login`
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserCredentials {
    /// Login name
    #[serde(default)]
    pub username: String,
    /// Clear-text password
    #[serde(default)]
    pub password: String,
}

/// Body of `POST /user`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewUser {
    /// Login name
    #[serde(default)]
    pub username: String,
    /// Clear-text password
    #[serde(default)]
    pub password: String,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Receive new-recipe digests
    #[serde(default)]
    pub notifications: bool,
    /// Role names
    #[serde(default)]
    pub roles: Vec<String>,
}

impl NewUser {
    /// Trim and validate
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` listing every invalid field
    pub fn validated(mut self) -> AppResult<Self> {
        self.username = self.username.trim().to_owned();
        self.email = self.email.trim().to_owned();
        self.first_name = trim_optional(self.first_name.take());
        self.last_name = trim_optional(self.last_name.take());

        let mut v = Validator::new();
        v.username("username", &self.username)
            .password("password", &self.password)
            .email("email", &self.email)
            .person_name("firstName", self.first_name.as_deref())
            .person_name("lastName", self.last_name.as_deref());
        validate_roles(&mut v, &self.roles);
        v.finish()?;
        Ok(self)
    }

    /// Parsed roles; call after [`Self::validated`]
    #[must_use]
    pub fn granted_roles(&self) -> Vec<UserRole> {
        parse_roles(&self.roles)
    }
}

/// Body of `PUT /user/:id`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserUpdate {
    /// Login name
    #[serde(default)]
    pub username: String,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Receive new-recipe digests
    #[serde(default)]
    pub notifications: bool,
    /// Role names replacing the current ones
    #[serde(default)]
    pub roles: Vec<String>,
    /// Whether `password` replaces the stored password
    #[serde(default)]
    pub update_password: bool,
    /// New clear-text password
    pub password: Option<String>,
}

impl UserUpdate {
    /// Trim and validate
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` listing every invalid field
    pub fn validated(mut self) -> AppResult<Self> {
        self.username = self.username.trim().to_owned();
        self.email = self.email.trim().to_owned();
        self.first_name = trim_optional(self.first_name.take());
        self.last_name = trim_optional(self.last_name.take());

        let mut v = Validator::new();
        v.username("username", &self.username)
            .email("email", &self.email)
            .person_name("firstName", self.first_name.as_deref())
            .person_name("lastName", self.last_name.as_deref());
        if self.update_password {
            v.password("password", self.password.as_deref().unwrap_or_default());
        }
        validate_roles(&mut v, &self.roles);
        v.finish()?;
        Ok(self)
    }

    /// Parsed roles; call after [`Self::validated`]
    #[must_use]
    pub fn granted_roles(&self) -> Vec<UserRole> {
        parse_roles(&self.roles)
    }

    /// Password to store, present only when a change was requested
    #[must_use]
    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|_| self.update_password)
    }
}

/// Body of `PATCH /user/updateProfile`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProfileUpdate {
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Receive new-recipe digests
    #[serde(default)]
    pub notifications: bool,
}

impl ProfileUpdate {
    /// Trim and validate
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` listing every invalid field
    pub fn validated(mut self) -> AppResult<Self> {
        self.email = self.email.trim().to_owned();
        self.first_name = trim_optional(self.first_name.take());
        self.last_name = trim_optional(self.last_name.take());

        let mut v = Validator::new();
        v.email("email", &self.email)
            .person_name("firstName", self.first_name.as_deref())
            .person_name("lastName", self.last_name.as_deref());
        v.finish()?;
        Ok(self)
    }
}

/// Body of `PATCH /auth/password`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PasswordChange {
    /// Current password
    #[serde(default)]
    pub password: String,
    /// Replacement password
    #[serde(default)]
    pub new_password: String,
}

impl PasswordChange {
    /// Validate the new password
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` when either password is missing or too simple
    pub fn validated(self) -> AppResult<Self> {
        let mut v = Validator::new();
        v.check("password", !self.password.is_empty(), messages::REQUIRED)
            .password("newPassword", &self.new_password);
        v.finish()?;
        Ok(self)
    }
}

/// Body of `PATCH /auth/confirm`
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConfirmAccount {
    /// Login name
    #[serde(default)]
    pub username: String,
    /// Key mailed on registration
    #[serde(default)]
    pub key: String,
}

/// Body of `POST /auth/reset`
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResetRequest {
    /// Account email
    #[serde(default)]
    pub email: String,
}

impl ResetRequest {
    /// Trim and validate
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` for a malformed address
    pub fn validated(mut self) -> AppResult<Self> {
        self.email = self.email.trim().to_owned();
        let mut v = Validator::new();
        v.email("email", &self.email);
        v.finish()?;
        Ok(self)
    }
}

/// Body of `PATCH /auth/reset`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResetPassword {
    /// Login name
    #[serde(default)]
    pub username: String,
    /// Key mailed with the reset link
    #[serde(default)]
    pub key: String,
    /// Replacement password
    #[serde(default)]
    pub new_password: String,
}

impl ResetPassword {
    /// Validate the new password
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` listing every invalid field
    pub fn validated(self) -> AppResult<Self> {
        let mut v = Validator::new();
        v.check("username", !self.username.is_empty(), messages::REQUIRED)
            .check("key", !self.key.is_empty(), messages::REQUIRED)
            .password("newPassword", &self.new_password);
        v.finish()?;
        Ok(self)
    }
}

fn validate_roles(v: &mut Validator, roles: &[String]) {
    let allowed = UserRole::ALL.map(|role| role.as_str());
    for (index, role) in roles.iter().enumerate() {
        v.allowed(&format!("roles.{index}"), role, &allowed);
    }
}

fn parse_roles(roles: &[String]) -> Vec<UserRole> {
    let mut parsed: Vec<UserRole> = roles
        .iter()
        .filter_map(|role| UserRole::from_str(role).ok())
        .collect();
    parsed.sort_unstable();
    parsed.dedup();
    parsed
}
