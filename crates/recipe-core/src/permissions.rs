// ABOUTME: User roles granted to accounts and checked by route guards
// ABOUTME: ADMIN manages everything, CREATOR may author recipes and upload pictures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role stored in `user_roles.role_name`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UserRole {
    /// Full access including user and reference data management
    #[serde(rename = "ADMIN")]
    Admin,
    /// May create and edit recipes and upload pictures
    #[serde(rename = "CREATOR")]
    Creator,
}

impl UserRole {
    /// All roles in storage order
    pub const ALL: [Self; 2] = [Self::Admin, Self::Creator];

    /// Roles allowed to author recipes
    pub const AUTHORS: &'static [Self] = &[Self::Admin, Self::Creator];

    /// Roles allowed to manage reference data and users
    pub const ADMINS: &'static [Self] = &[Self::Admin];

    /// Stored name of the role
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Creator => "CREATOR",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "CREATOR" => Ok(Self::Creator),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

/// Whether `granted` contains at least one of `required`
///
/// An empty `required` list admits any authenticated caller.
#[must_use]
pub fn has_any_role(granted: &[UserRole], required: &[UserRole]) -> bool {
    required.is_empty() || required.iter().any(|role| granted.contains(role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_storage_name() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>(), Ok(role));
        }
        assert!("OWNER".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_has_any_role() {
        assert!(has_any_role(&[UserRole::Creator], UserRole::AUTHORS));
        assert!(!has_any_role(&[UserRole::Creator], UserRole::ADMINS));
        assert!(has_any_role(&[], &[]));
        assert!(!has_any_role(&[], UserRole::ADMINS));
    }
}
