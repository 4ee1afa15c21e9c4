// ABOUTME: Database connection management and schema migrations for the recipe store
// ABOUTME: Opens the SQLite pool with foreign keys enforced and hands out table managers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! # Database Management
//!
//! One `SqlitePool` serves the whole server. Each table family has a manager
//! type holding a clone of the pool; the recipe manager additionally drives
//! the reconciliation of nested collections inside a [`TransactionGuard`].

/// Picture storage and orphan cleanup
pub mod pictures;
/// Recipe aggregate storage, search and reconciliation
pub mod recipes;
/// Categories, tags and unit categories
pub mod reference;
/// Demo data for development databases
pub mod seed;
/// RAII transaction guard
pub mod transactions;
/// Units of measure
pub mod units;
/// User accounts and roles
pub mod users;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use recipe_core::errors::{AppError, AppResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

pub use pictures::PicturesManager;
pub use recipes::RecipesManager;
pub use reference::{NamedRecordsManager, NamedTable};
pub use transactions::TransactionGuard;
pub use units::UnitsManager;
pub use users::UsersManager;

use crate::config::DatabaseUrl;

/// Database handle owning the connection pool
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to the database and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be opened or a migration fails
    pub async fn new(url: &DatabaseUrl) -> AppResult<Self> {
        if let DatabaseUrl::SQLite { path } = url {
            if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::database(format!(
                        "Cannot create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&url.to_connection_string())?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` opens a separate database, so the
        // in-memory pool is pinned to a single long-lived connection.
        let pool_options = if url.is_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        let db = Self { pool };
        db.migrate().await?;

        info!(database = %url, "Database connected and migrated");
        Ok(db)
    }

    /// Open a fresh in-memory database
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migrations fail
    pub async fn in_memory() -> AppResult<Self> {
        Self::new(&DatabaseUrl::Memory).await
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations
    ///
    /// Every statement is idempotent, so migrating an existing database is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if a table or index cannot be created
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_users().await?;
        self.migrate_reference_data().await?;
        self.migrate_units().await?;
        self.migrate_recipes().await?;
        self.migrate_pictures().await?;
        Ok(())
    }

    /// Manager for categories
    #[must_use]
    pub fn categories(&self) -> NamedRecordsManager {
        NamedRecordsManager::categories(self.pool.clone())
    }

    /// Manager for tags
    #[must_use]
    pub fn tags(&self) -> NamedRecordsManager {
        NamedRecordsManager::tags(self.pool.clone())
    }

    /// Manager for unit categories
    #[must_use]
    pub fn unit_categories(&self) -> NamedRecordsManager {
        NamedRecordsManager::unit_categories(self.pool.clone())
    }

    /// Manager for units
    #[must_use]
    pub fn units(&self) -> UnitsManager {
        UnitsManager::new(self.pool.clone())
    }

    /// Manager for pictures
    #[must_use]
    pub fn pictures(&self) -> PicturesManager {
        PicturesManager::new(self.pool.clone())
    }

    /// Manager for recipes
    #[must_use]
    pub fn recipes(&self) -> RecipesManager {
        RecipesManager::new(self.pool.clone())
    }

    /// Manager for users
    #[must_use]
    pub fn users(&self) -> UsersManager {
        UsersManager::new(self.pool.clone())
    }
}

/// Format a timestamp for storage
///
/// Millisecond precision with a `Z` suffix keeps every value the same width,
/// so string comparison in SQL orders timestamps chronologically.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time formatted for storage
#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Parse a stored timestamp
///
/// # Errors
///
/// Returns an error if the stored value is not RFC 3339
pub fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("Invalid stored timestamp {value}: {e}")))
}
