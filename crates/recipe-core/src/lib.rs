// ABOUTME: Core types and constants for the recipe server
// ABOUTME: Foundation crate with error handling, roles, pagination and reconciliation planning
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

#![deny(unsafe_code)]

//! # Recipe Core
//!
//! Foundation crate providing shared types and constants for the recipe
//! server. It holds no I/O, so it changes infrequently and compiles once.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **constants**: Field limits, defaults and message keys
//! - **pagination**: Offset-based page requests and result pages
//! - **permissions**: User roles and role checks
//! - **reconcile**: Diff planner for nested collections
//! - **search**: Diacritic-insensitive search text normalization

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Offset-based pagination for recipe search
pub mod pagination;

/// User roles used by route guards
pub mod permissions;

/// Set-difference planning for nested collections
pub mod reconcile;

/// Search text normalization
pub mod search;
