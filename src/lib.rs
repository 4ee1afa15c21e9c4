// ABOUTME: Main library entry point for the recipe server
// ABOUTME: REST API for recipes with sections, ingredients, pictures, tags and user accounts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

#![recursion_limit = "256"]
#![deny(unsafe_code)]

//! # Recipe Server
//!
//! A REST backend for a shared recipe book. Recipes are aggregates of
//! sections, ingredients, pictures and tags that are saved as a whole:
//! every create or update reconciles the stored aggregate with the
//! submitted one inside a single transaction.
//!
//! ## Architecture
//!
//! - **Routes**: thin axum handlers that check roles and validate bodies
//! - **Database**: `SQLite` managers, one per table family
//! - **Auth**: JWT access and refresh tokens, bcrypt password hashes
//! - **Email**: confirmation, reset and digest mails through SMTP
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recipe_server::config::ServerConfig;
//! use recipe_server::resources::ServerResources;
//! use recipe_server::server::RecipeServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let resources = ServerResources::from_config(config).await?;
//!     RecipeServer::new(Arc::new(resources)).run().await
//! }
//! ```

/// JWT issuing and validation, password hashing
pub mod auth;

/// Environment-driven configuration
pub mod config;

/// `SQLite` pool, schema and table managers
pub mod database;

/// Outgoing mail and templates
pub mod email;

/// Picture resizing and thumbnails
pub mod images;

/// Tracing subscriber setup
pub mod logging;

/// Authentication guard and CORS
pub mod middleware;

/// Request and response models
pub mod models;

/// New-recipe digest mails
pub mod notifications;

/// Shared server resources
pub mod resources;

/// HTTP route handlers
pub mod routes;

/// Public and internal HTTP apps
pub mod server;

/// Field validation helpers
pub mod validation;
