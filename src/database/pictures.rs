// ABOUTME: Picture storage: uploaded JPEG data and thumbnails, attached to recipes later
// ABOUTME: Unattached pictures older than a day are orphans and get garbage-collected
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use chrono::{DateTime, Utc};
use recipe_core::constants::pictures::INITIAL_SORT_NUMBER;
use recipe_core::errors::{AppError, AppResult};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use super::{format_timestamp, now_timestamp, Database};
use crate::models::{NewPicture, PictureInfo};

impl Database {
    /// Create the pictures table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_pictures(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS pictures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipe_id INTEGER REFERENCES recipes(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                sort_number INTEGER NOT NULL,
                data BLOB NOT NULL,
                thumbnail BLOB NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_pictures_recipe ON pictures(recipe_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Picture database operations manager
#[derive(Clone)]
pub struct PicturesManager {
    pool: SqlitePool,
}

impl PicturesManager {
    /// Create a new pictures manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store an uploaded picture, not yet attached to any recipe
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    #[tracing::instrument(skip(self, picture), fields(name = %picture.name, bytes = picture.data.len()))]
    pub async fn create(&self, picture: &NewPicture) -> AppResult<i64> {
        let now = now_timestamp();
        let id = sqlx::query_scalar(
            r"
            INSERT INTO pictures (recipe_id, name, sort_number, data, thumbnail, created_at, updated_at)
            VALUES (NULL, $1, $2, $3, $4, $5, $5)
            RETURNING id
            ",
        )
        .bind(&picture.name)
        .bind(INITIAL_SORT_NUMBER)
        .bind(&picture.data)
        .bind(&picture.thumbnail)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Pictures of a recipe ordered by name
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_recipe(&self, recipe_id: i64) -> AppResult<Vec<PictureInfo>> {
        let rows: Vec<(i64, String, i64)> = sqlx::query_as(
            "SELECT id, name, sort_number FROM pictures WHERE recipe_id = $1 ORDER BY name, id",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PictureInfo::from).collect())
    }

    /// Resized JPEG of a picture
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the picture does not exist
    pub async fn data(&self, id: i64) -> AppResult<Vec<u8>> {
        sqlx::query_scalar("SELECT data FROM pictures WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Picture"))
    }

    /// Thumbnail JPEG of a picture
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the picture does not exist
    pub async fn thumbnail(&self, id: i64) -> AppResult<Vec<u8>> {
        sqlx::query_scalar("SELECT thumbnail FROM pictures WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Picture"))
    }
}

/// Gallery of a recipe ordered by sort number
pub(super) async fn gallery(conn: &mut SqliteConnection, recipe_id: i64) -> AppResult<Vec<PictureInfo>> {
    let rows: Vec<(i64, String, i64)> = sqlx::query_as(
        "SELECT id, name, sort_number FROM pictures WHERE recipe_id = $1 ORDER BY sort_number, id",
    )
    .bind(recipe_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(PictureInfo::from).collect())
}

/// Delete unattached pictures created at or before `cutoff`
pub(super) async fn delete_orphans(
    conn: &mut SqliteConnection,
    cutoff: DateTime<Utc>,
) -> AppResult<u64> {
    let deleted = sqlx::query("DELETE FROM pictures WHERE recipe_id IS NULL AND created_at <= $1")
        .bind(format_timestamp(cutoff))
        .execute(conn)
        .await?
        .rows_affected();

    if deleted > 0 {
        info!(deleted, "Deleted orphaned pictures");
    }
    Ok(deleted)
}
