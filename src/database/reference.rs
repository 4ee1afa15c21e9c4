// ABOUTME: Named reference records: categories, tags and unit categories
// ABOUTME: One manager type serves all three tables, which share the same shape
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use recipe_core::errors::{AppError, AppResult};
use sqlx::SqlitePool;

use super::{now_timestamp, Database};
use crate::models::NamedRecord;

/// Table backing a family of named records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedTable {
    /// Recipe categories
    Categories,
    /// Recipe tags
    Tags,
    /// Groups of units (weight, volume, ...)
    UnitCategories,
}

impl NamedTable {
    const ALL: [Self; 3] = [Self::Categories, Self::Tags, Self::UnitCategories];

    /// Table name
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Tags => "tags",
            Self::UnitCategories => "unit_categories",
        }
    }

    /// Resource name used in error messages
    #[must_use]
    pub const fn resource(self) -> &'static str {
        match self {
            Self::Categories => "Category",
            Self::Tags => "Tag",
            Self::UnitCategories => "Unit category",
        }
    }
}

impl Database {
    /// Create the categories, tags and unit categories tables
    ///
    /// # Errors
    ///
    /// Returns an error if table creation fails
    pub(super) async fn migrate_reference_data(&self) -> AppResult<()> {
        for table in NamedTable::ALL {
            sqlx::query(&format!(
                r"
                CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                ",
                table.table()
            ))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

/// CRUD over one named-record table
#[derive(Clone)]
pub struct NamedRecordsManager {
    pool: SqlitePool,
    table: NamedTable,
}

impl NamedRecordsManager {
    /// Create a manager for `table`
    #[must_use]
    pub const fn new(pool: SqlitePool, table: NamedTable) -> Self {
        Self { pool, table }
    }

    /// Manager for categories
    #[must_use]
    pub const fn categories(pool: SqlitePool) -> Self {
        Self::new(pool, NamedTable::Categories)
    }

    /// Manager for tags
    #[must_use]
    pub const fn tags(pool: SqlitePool) -> Self {
        Self::new(pool, NamedTable::Tags)
    }

    /// Manager for unit categories
    #[must_use]
    pub const fn unit_categories(pool: SqlitePool) -> Self {
        Self::new(pool, NamedTable::UnitCategories)
    }

    /// All records ordered by name
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list(&self) -> AppResult<Vec<NamedRecord>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(&format!(
            "SELECT id, name FROM {} ORDER BY name",
            self.table.table()
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| NamedRecord { id, name })
            .collect())
    }

    /// One record by id
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the record does not exist
    pub async fn get(&self, id: i64) -> AppResult<NamedRecord> {
        let row: Option<(i64, String)> = sqlx::query_as(&format!(
            "SELECT id, name FROM {} WHERE id = $1",
            self.table.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, name)| NamedRecord { id, name })
            .ok_or_else(|| AppError::not_found(self.table.resource()))
    }

    /// Insert a record
    ///
    /// # Errors
    ///
    /// Returns `UNIQUE_CONSTRAINT_ERROR` if the name is taken
    #[tracing::instrument(skip(self), fields(table = self.table.table()))]
    pub async fn create(&self, name: &str) -> AppResult<i64> {
        let now = now_timestamp();
        let id = sqlx::query_scalar(&format!(
            "INSERT INTO {} (name, created_at, updated_at) VALUES ($1, $2, $2) RETURNING id",
            self.table.table()
        ))
        .bind(name)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Rename a record
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the record does not exist, or
    /// `UNIQUE_CONSTRAINT_ERROR` if the name is taken
    #[tracing::instrument(skip(self), fields(table = self.table.table()))]
    pub async fn update(&self, id: i64, name: &str) -> AppResult<()> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET name = $2, updated_at = $3 WHERE id = $1",
            self.table.table()
        ))
        .bind(id)
        .bind(name)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(self.table.resource()));
        }
        Ok(())
    }

    /// Delete a record
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the record does not exist, or
    /// `CONSTRAINT_FAILED` while other rows still reference it
    #[tracing::instrument(skip(self), fields(table = self.table.table()))]
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table.table()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(self.table.resource()));
        }
        Ok(())
    }
}
