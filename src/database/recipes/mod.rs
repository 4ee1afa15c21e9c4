// ABOUTME: Recipe aggregate storage: search, full graph loading and transactional writes
// ABOUTME: Create and update apply the submitted nested state through the reconcile routine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! # Recipe Storage
//!
//! A recipe owns sections (which own ingredients), tag links, links to
//! associated recipes and pictures. Writes always go through one
//! [`TransactionGuard`]: the recipe row is written first, then
//! [`reconcile::apply_desired_state`] brings every nested collection in line
//! with the submitted body and garbage-collects orphaned pictures.

/// Nested collection reconciliation
pub mod reconcile;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use recipe_core::errors::{AppError, AppResult};
use recipe_core::pagination::Page;
use recipe_core::search::{like_pattern, normalize_search_text};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use super::{format_timestamp, now_timestamp, parse_timestamp, pictures, Database, TransactionGuard};
use crate::models::{
    IdRef, IngredientDetail, NamedRecord, RecipeDetail, RecipeInput, RecipeListItem, RecipeSearch,
    RecipeSummary, SectionDetail, UnitSummary, UserSummary,
};

impl Database {
    /// Create recipes, sections, ingredients and link tables
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_recipes(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS recipes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                name_search TEXT NOT NULL,
                description TEXT,
                description_search TEXT,
                serves INTEGER,
                method TEXT,
                sources TEXT NOT NULL DEFAULT '[]',
                category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE RESTRICT,
                creator_id INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
                modifier_id INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS recipe_sections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                name TEXT NOT NULL DEFAULT '',
                sort_number INTEGER NOT NULL,
                method TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ingredients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipe_section_id INTEGER NOT NULL REFERENCES recipe_sections(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                sort_number INTEGER NOT NULL,
                value REAL,
                unit_id INTEGER NOT NULL REFERENCES units(id) ON DELETE RESTRICT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS recipe_tags (
                recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (recipe_id, tag_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS recipe_recipes (
                recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                associated_recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                PRIMARY KEY (recipe_id, associated_recipe_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_recipes_category ON recipes(category_id)",
            "CREATE INDEX IF NOT EXISTS idx_recipes_created_at ON recipes(created_at)",
            "CREATE INDEX IF NOT EXISTS idx_recipe_sections_recipe ON recipe_sections(recipe_id)",
            "CREATE INDEX IF NOT EXISTS idx_ingredients_section ON ingredients(recipe_section_id)",
            "CREATE INDEX IF NOT EXISTS idx_ingredients_unit ON ingredients(unit_id)",
            "CREATE INDEX IF NOT EXISTS idx_recipe_tags_tag ON recipe_tags(tag_id)",
        ] {
            sqlx::query(index).execute(&self.pool).await?;
        }

        Ok(())
    }
}

/// Recipe created recently, as listed in notification digests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRecipe {
    /// Row id
    pub id: i64,
    /// Recipe name
    pub name: String,
    /// Author of the recipe
    pub creator_id: i64,
}

/// Recipe database operations manager
#[derive(Clone)]
pub struct RecipesManager {
    pool: SqlitePool,
}

impl RecipesManager {
    /// Create a new recipes manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Search recipes and return one page with the total match count
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails
    #[tracing::instrument(skip(self, search), fields(page = search.page.page))]
    pub async fn find(&self, search: &RecipeSearch) -> AppResult<Page<RecipeListItem>> {
        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM recipes r WHERE 1 = 1");
        push_filters(&mut count_query, search);
        let count: i64 = count_query.build_query_scalar().fetch_one(&self.pool).await?;

        let mut rows_query = QueryBuilder::<Sqlite>::new(
            r"
            SELECT r.id, r.name, r.description,
                   (SELECT p.id FROM pictures p WHERE p.recipe_id = r.id
                    ORDER BY p.sort_number, p.id LIMIT 1) AS picture_id
            FROM recipes r WHERE 1 = 1",
        );
        push_filters(&mut rows_query, search);
        // Column and direction come from closed enums, never from request text.
        rows_query.push(format!(
            " ORDER BY {column} {order}, r.id {order} LIMIT ",
            column = search.order_by.column(),
            order = search.order.sql()
        ));
        rows_query.push_bind(search.page.page_size);
        rows_query.push(" OFFSET ");
        rows_query.push_bind(search.page.offset());

        let rows = rows_query.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(|row| -> AppResult<RecipeListItem> {
                let picture_id: Option<i64> = row.try_get("picture_id")?;
                Ok(RecipeListItem {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    description: row.try_get("description")?,
                    pictures: picture_id.map(|id| IdRef { id }).into_iter().collect(),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Page::new(search.page, items, count))
    }

    /// Load the full recipe graph
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the recipe does not exist
    pub async fn get(&self, id: i64) -> AppResult<RecipeDetail> {
        let mut conn = self.pool.acquire().await?;
        load_detail(&mut conn, id).await
    }

    /// Create a recipe with its nested collections
    ///
    /// # Errors
    ///
    /// Returns `UNIQUE_CONSTRAINT_ERROR` for a taken name, `CONSTRAINT_FAILED`
    /// for unknown category, unit, tag or associated recipe, and `NOT_FOUND`
    /// for an unknown picture
    #[tracing::instrument(skip(self, recipe), fields(name = %recipe.name))]
    pub async fn create(&self, recipe: &RecipeInput, user_id: i64) -> AppResult<i64> {
        let now = now_timestamp();
        let sources = encode_sources(recipe.sources())?;
        let mut guard = TransactionGuard::begin(&self.pool).await?;
        let conn = guard.executor()?;

        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO recipes (
                name, name_search, description, description_search, serves, method, sources,
                category_id, creator_id, modifier_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10, $10)
            RETURNING id
            ",
        )
        .bind(&recipe.name)
        .bind(normalize_search_text(&recipe.name))
        .bind(&recipe.description)
        .bind(recipe.description.as_deref().map(normalize_search_text))
        .bind(recipe.serves)
        .bind(&recipe.method)
        .bind(&sources)
        .bind(recipe.category_id)
        .bind(user_id)
        .bind(&now)
        .fetch_one(&mut *conn)
        .await?;

        reconcile::apply_desired_state(conn, id, recipe).await?;
        guard.commit().await?;

        debug!(recipe_id = id, "Recipe created");
        Ok(id)
    }

    /// Replace a recipe with the submitted state
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the recipe, a submitted section, ingredient or
    /// picture does not exist, and constraint errors as for [`Self::create`]
    #[tracing::instrument(skip(self, recipe), fields(name = %recipe.name))]
    pub async fn update(&self, id: i64, recipe: &RecipeInput, user_id: i64) -> AppResult<()> {
        let sources = encode_sources(recipe.sources())?;
        let mut guard = TransactionGuard::begin(&self.pool).await?;
        let conn = guard.executor()?;

        let result = sqlx::query(
            r"
            UPDATE recipes SET
                name = $2, name_search = $3, description = $4, description_search = $5,
                serves = $6, method = $7, sources = $8, category_id = $9,
                modifier_id = $10, updated_at = $11
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&recipe.name)
        .bind(normalize_search_text(&recipe.name))
        .bind(&recipe.description)
        .bind(recipe.description.as_deref().map(normalize_search_text))
        .bind(recipe.serves)
        .bind(&recipe.method)
        .bind(&sources)
        .bind(recipe.category_id)
        .bind(user_id)
        .bind(now_timestamp())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Recipe"));
        }

        reconcile::apply_desired_state(conn, id, recipe).await?;
        guard.commit().await?;

        debug!(recipe_id = id, "Recipe updated");
        Ok(())
    }

    /// Delete a recipe together with everything it owns
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the recipe does not exist
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Recipe"));
        }
        Ok(())
    }

    /// Recipes created at or after `since`, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn created_since(&self, since: DateTime<Utc>) -> AppResult<Vec<RecentRecipe>> {
        let rows: Vec<(i64, String, i64)> = sqlx::query_as(
            "SELECT id, name, creator_id FROM recipes WHERE created_at >= $1 ORDER BY created_at, id",
        )
        .bind(format_timestamp(since))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, creator_id)| RecentRecipe {
                id,
                name,
                creator_id,
            })
            .collect())
    }

    /// Number of stored recipes
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn count(&self) -> AppResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
            .fetch_one(&self.pool)
            .await?)
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, search: &RecipeSearch) {
    if let Some(term) = &search.search {
        let pattern = like_pattern(term);
        query.push(" AND (r.name_search LIKE ");
        query.push_bind(pattern.clone());
        query.push(r" ESCAPE '\' OR r.description_search LIKE ");
        query.push_bind(pattern);
        query.push(r" ESCAPE '\')");
    }

    if let Some(category_id) = search.category_id {
        query.push(" AND r.category_id = ");
        query.push_bind(category_id);
    }

    if !search.tags.is_empty() {
        // Every requested tag must be linked: count the matching links per recipe.
        query.push(" AND r.id IN (SELECT recipe_id FROM recipe_tags WHERE tag_id IN (");
        let mut separated = query.separated(", ");
        for tag in &search.tags {
            separated.push_bind(*tag);
        }
        separated.push_unseparated(") GROUP BY recipe_id HAVING COUNT(DISTINCT tag_id) = ");
        query.push_bind(i64::try_from(search.tags.len()).unwrap_or(i64::MAX));
        query.push(")");
    }
}

fn encode_sources(sources: &[String]) -> AppResult<String> {
    serde_json::to_string(sources)
        .map_err(|e| AppError::internal(format!("Failed to encode recipe sources: {e}")))
}

fn decode_sources(sources: &str) -> AppResult<Vec<String>> {
    serde_json::from_str(sources)
        .map_err(|e| AppError::database(format!("Invalid stored recipe sources: {e}")))
}

async fn load_detail(conn: &mut SqliteConnection, id: i64) -> AppResult<RecipeDetail> {
    let row = sqlx::query(
        r"
        SELECT r.id, r.name, r.description, r.serves, r.method, r.sources, r.category_id,
               r.created_at, r.updated_at,
               c.username AS creator_username, c.first_name AS creator_first_name,
               c.last_name AS creator_last_name,
               m.username AS modifier_username, m.first_name AS modifier_first_name,
               m.last_name AS modifier_last_name
        FROM recipes r
        LEFT JOIN users c ON c.id = r.creator_id
        LEFT JOIN users m ON m.id = r.modifier_id
        WHERE r.id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Recipe"))?;

    let sections = load_sections(conn, id).await?;

    let associated: Vec<(i64, String, Option<String>)> = sqlx::query_as(
        r"
        SELECT r.id, r.name, r.description
        FROM recipe_recipes rr JOIN recipes r ON r.id = rr.associated_recipe_id
        WHERE rr.recipe_id = $1
        ORDER BY r.name_search, r.id
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let tags: Vec<(i64, String)> = sqlx::query_as(
        r"
        SELECT t.id, t.name
        FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.name, t.id
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let pictures = pictures::gallery(conn, id).await?;

    let sources: String = row.try_get("sources")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(RecipeDetail {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        serves: row.try_get("serves")?,
        method: row.try_get("method")?,
        sources: decode_sources(&sources)?,
        category_id: row.try_get("category_id")?,
        recipe_sections: sections,
        associated_recipes: associated
            .into_iter()
            .map(|(id, name, description)| RecipeSummary {
                id,
                name,
                description,
            })
            .collect(),
        tags: tags
            .into_iter()
            .map(|(id, name)| NamedRecord { id, name })
            .collect(),
        pictures,
        creator: user_summary(&row, "creator")?,
        modifier: user_summary(&row, "modifier")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

async fn load_sections(conn: &mut SqliteConnection, recipe_id: i64) -> AppResult<Vec<SectionDetail>> {
    let section_rows: Vec<(i64, String, i64, Option<String>)> = sqlx::query_as(
        r"
        SELECT id, name, sort_number, method FROM recipe_sections
        WHERE recipe_id = $1 ORDER BY sort_number, id
        ",
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await?;

    let ingredient_rows = sqlx::query(
        r"
        SELECT i.id, i.recipe_section_id, i.name, i.sort_number, i.value, i.unit_id,
               u.name AS unit_name, u.abbreviation AS unit_abbreviation
        FROM ingredients i
        JOIN recipe_sections s ON s.id = i.recipe_section_id
        JOIN units u ON u.id = i.unit_id
        WHERE s.recipe_id = $1
        ORDER BY i.sort_number, i.id
        ",
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut ingredients: HashMap<i64, Vec<IngredientDetail>> = HashMap::new();
    for row in &ingredient_rows {
        let section_id: i64 = row.try_get("recipe_section_id")?;
        ingredients
            .entry(section_id)
            .or_default()
            .push(row_to_ingredient(row)?);
    }

    Ok(section_rows
        .into_iter()
        .map(|(id, name, sort_number, method)| SectionDetail {
            id,
            name,
            sort_number,
            method,
            ingredients: ingredients.remove(&id).unwrap_or_default(),
        })
        .collect())
}

fn row_to_ingredient(row: &SqliteRow) -> AppResult<IngredientDetail> {
    Ok(IngredientDetail {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        sort_number: row.try_get("sort_number")?,
        value: row.try_get("value")?,
        unit_id: row.try_get("unit_id")?,
        unit: UnitSummary {
            name: row.try_get("unit_name")?,
            abbreviation: row.try_get("unit_abbreviation")?,
        },
    })
}

fn user_summary(row: &SqliteRow, prefix: &str) -> AppResult<Option<UserSummary>> {
    let username: Option<String> = row.try_get(format!("{prefix}_username").as_str())?;
    let Some(username) = username else {
        return Ok(None);
    };
    Ok(Some(UserSummary {
        username,
        first_name: row.try_get(format!("{prefix}_first_name").as_str())?,
        last_name: row.try_get(format!("{prefix}_last_name").as_str())?,
    }))
}
