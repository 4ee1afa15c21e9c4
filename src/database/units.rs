// ABOUTME: Units of measure grouped by unit category
// ABOUTME: Units referenced by ingredients cannot be deleted (foreign key RESTRICT)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use recipe_core::errors::{AppError, AppResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{now_timestamp, Database};
use crate::models::{Unit, UnitInput};

impl Database {
    /// Create the units table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_units(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS units (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                abbreviation TEXT NOT NULL UNIQUE,
                required INTEGER NOT NULL DEFAULT 0,
                unit_category_id INTEGER NOT NULL REFERENCES unit_categories(id) ON DELETE RESTRICT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_units_unit_category ON units(unit_category_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Unit database operations manager
#[derive(Clone)]
pub struct UnitsManager {
    pool: SqlitePool,
}

impl UnitsManager {
    /// Create a new units manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Units of one unit category ordered by name
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_unit_category(&self, unit_category_id: i64) -> AppResult<Vec<Unit>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, abbreviation, required, unit_category_id
            FROM units WHERE unit_category_id = $1 ORDER BY name
            ",
        )
        .bind(unit_category_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_unit).collect()
    }

    /// One unit by id
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the unit does not exist
    pub async fn get(&self, id: i64) -> AppResult<Unit> {
        let row = sqlx::query(
            "SELECT id, name, abbreviation, required, unit_category_id FROM units WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(row_to_unit)
            .transpose()?
            .ok_or_else(|| AppError::not_found("Unit"))
    }

    /// Insert a unit
    ///
    /// # Errors
    ///
    /// Returns `UNIQUE_CONSTRAINT_ERROR` for a taken name or abbreviation,
    /// or `CONSTRAINT_FAILED` for an unknown unit category
    #[tracing::instrument(skip(self, unit), fields(name = %unit.name))]
    pub async fn create(&self, unit: &UnitInput) -> AppResult<i64> {
        let now = now_timestamp();
        let id = sqlx::query_scalar(
            r"
            INSERT INTO units (name, abbreviation, required, unit_category_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            ",
        )
        .bind(&unit.name)
        .bind(&unit.abbreviation)
        .bind(unit.required)
        .bind(unit.unit_category_id)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Update a unit
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the unit does not exist or a constraint error
    #[tracing::instrument(skip(self, unit))]
    pub async fn update(&self, id: i64, unit: &UnitInput) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE units SET name = $2, abbreviation = $3, required = $4, unit_category_id = $5, updated_at = $6
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&unit.name)
        .bind(&unit.abbreviation)
        .bind(unit.required)
        .bind(unit.unit_category_id)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Unit"));
        }
        Ok(())
    }

    /// Delete a unit
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the unit does not exist, or `CONSTRAINT_FAILED`
    /// while ingredients still use it
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM units WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Unit"));
        }
        Ok(())
    }
}

fn row_to_unit(row: &SqliteRow) -> AppResult<Unit> {
    Ok(Unit {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        abbreviation: row.try_get("abbreviation")?,
        required: row.try_get("required")?,
        unit_category_id: row.try_get("unit_category_id")?,
    })
}
