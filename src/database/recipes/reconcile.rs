// ABOUTME: Applies a submitted recipe graph to the stored nested rows inside one transaction
// ABOUTME: Tags, associated recipes, pictures, sections and ingredients are reconciled in turn
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! Nested collection reconciliation
//!
//! Every function here runs on the connection of the caller's transaction.
//! A failure returns early and the dropped guard rolls back everything
//! written so far, including the recipe row itself.

use chrono::{Duration, Utc};
use recipe_core::constants::pictures::ORPHAN_MAX_AGE_HOURS;
use recipe_core::errors::{AppError, AppResult};
use recipe_core::reconcile::{reconcile, Submitted};
use sqlx::SqliteConnection;
use tracing::debug;

use super::super::{now_timestamp, pictures};
use crate::models::{IngredientInput, PictureInput, RecipeInput, SectionInput};

/// Bring every nested collection of `recipe_id` in line with `recipe`
///
/// Collections are replaced wholesale by the submitted state. Afterwards
/// unattached pictures older than the orphan age are deleted.
///
/// # Errors
///
/// Returns `NOT_FOUND` for submitted ids matching no row of this recipe, or
/// a constraint error for unknown tags, associated recipes or units
#[tracing::instrument(skip(conn, recipe))]
pub async fn apply_desired_state(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    recipe: &RecipeInput,
) -> AppResult<()> {
    sync_tags(conn, recipe_id, recipe.tags()).await?;
    sync_associated_recipes(conn, recipe_id, recipe.associated_recipes()).await?;
    sync_sections(conn, recipe_id, recipe.sections()).await?;
    sync_pictures(conn, recipe_id, recipe.pictures()).await?;

    let cutoff = Utc::now() - Duration::hours(ORPHAN_MAX_AGE_HOURS);
    pictures::delete_orphans(conn, cutoff).await?;
    Ok(())
}

/// Link exactly the submitted tags
///
/// # Errors
///
/// Returns `CONSTRAINT_FAILED` for a tag that does not exist
pub async fn sync_tags(conn: &mut SqliteConnection, recipe_id: i64, tags: &[i64]) -> AppResult<()> {
    let linked: Vec<i64> = sqlx::query_scalar("SELECT tag_id FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .fetch_all(&mut *conn)
        .await?;

    let plan = reconcile(&linked, tags, |tag| *tag, |tag| Submitted::Existing(*tag));

    for tag_id in &plan.removed {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1 AND tag_id = $2")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    for (tag_id, _) in &plan.unknown {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }

    debug!(
        removed = plan.removed.len(),
        added = plan.unknown.len(),
        "Reconciled recipe tags"
    );
    Ok(())
}

/// Replace the links to associated recipes
///
/// # Errors
///
/// Returns `CONSTRAINT_FAILED` for a recipe that does not exist
pub async fn sync_associated_recipes(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    associated: &[i64],
) -> AppResult<()> {
    sqlx::query("DELETE FROM recipe_recipes WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    for associated_id in associated {
        sqlx::query("INSERT INTO recipe_recipes (recipe_id, associated_recipe_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(associated_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Attach exactly the submitted pictures
///
/// Pictures attached to the recipe but not submitted are deleted. A
/// submitted picture must be attached to this recipe already or not be
/// attached at all.
///
/// # Errors
///
/// Returns `NOT_FOUND` for a picture that does not exist or belongs to
/// another recipe
pub async fn sync_pictures(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    submitted: &[PictureInput],
) -> AppResult<()> {
    let attached: Vec<i64> = sqlx::query_scalar("SELECT id FROM pictures WHERE recipe_id = $1")
        .bind(recipe_id)
        .fetch_all(&mut *conn)
        .await?;

    let plan = reconcile(&attached, submitted, |id| *id, |picture| {
        Submitted::Existing(picture.id)
    });
    let now = now_timestamp();

    for id in &plan.removed {
        sqlx::query("DELETE FROM pictures WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    for (id, picture) in plan.retained.iter().chain(&plan.unknown) {
        let updated = sqlx::query(
            r"
            UPDATE pictures SET recipe_id = $2, name = $3, sort_number = $4, updated_at = $5
            WHERE id = $1 AND (recipe_id IS NULL OR recipe_id = $2)
            ",
        )
        .bind(id)
        .bind(recipe_id)
        .bind(&picture.name)
        .bind(picture.sort_number)
        .bind(&now)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::not_found(format!("Picture {id}")));
        }
    }
    Ok(())
}

/// Reconcile sections and, one level deeper, their ingredients
///
/// # Errors
///
/// Returns `NOT_FOUND` for a submitted section or ingredient id that does
/// not belong to this recipe, or `CONSTRAINT_FAILED` for an unknown unit
pub async fn sync_sections(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    submitted: &[SectionInput],
) -> AppResult<()> {
    let stored: Vec<i64> = sqlx::query_scalar("SELECT id FROM recipe_sections WHERE recipe_id = $1")
        .bind(recipe_id)
        .fetch_all(&mut *conn)
        .await?;

    let plan = reconcile(&stored, submitted, |id| *id, SectionInput::key);
    if let Some((id, _)) = plan.unknown.first() {
        return Err(AppError::not_found(format!("Recipe section {id}")));
    }
    let now = now_timestamp();

    for id in &plan.removed {
        sqlx::query("DELETE FROM recipe_sections WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    for (id, section) in &plan.retained {
        sqlx::query(
            "UPDATE recipe_sections SET name = $2, sort_number = $3, method = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(id)
        .bind(&section.name)
        .bind(section.sort_number)
        .bind(&section.method)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        sync_ingredients(conn, *id, section.ingredients()).await?;
    }

    for section in &plan.added {
        let section_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO recipe_sections (recipe_id, name, sort_number, method, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            ",
        )
        .bind(recipe_id)
        .bind(&section.name)
        .bind(section.sort_number)
        .bind(&section.method)
        .bind(&now)
        .fetch_one(&mut *conn)
        .await?;

        // A fresh section owns no rows yet, so every ingredient is inserted.
        for ingredient in section.ingredients() {
            insert_ingredient(conn, section_id, ingredient, &now).await?;
        }
    }

    debug!(
        removed = plan.removed.len(),
        updated = plan.retained.len(),
        added = plan.added.len(),
        "Reconciled recipe sections"
    );
    Ok(())
}

/// Reconcile the ingredients of one persisted section
///
/// # Errors
///
/// Returns `NOT_FOUND` for an ingredient id not belonging to the section
pub async fn sync_ingredients(
    conn: &mut SqliteConnection,
    section_id: i64,
    submitted: &[IngredientInput],
) -> AppResult<()> {
    let stored: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM ingredients WHERE recipe_section_id = $1")
            .bind(section_id)
            .fetch_all(&mut *conn)
            .await?;

    let plan = reconcile(&stored, submitted, |id| *id, IngredientInput::key);
    if let Some((id, _)) = plan.unknown.first() {
        return Err(AppError::not_found(format!("Ingredient {id}")));
    }
    let now = now_timestamp();

    for id in &plan.removed {
        sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    for (id, ingredient) in &plan.retained {
        sqlx::query(
            r"
            UPDATE ingredients SET name = $2, sort_number = $3, value = $4, unit_id = $5, updated_at = $6
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&ingredient.name)
        .bind(ingredient.sort_number)
        .bind(ingredient.value)
        .bind(ingredient.unit_id)
        .bind(&now)
        .execute(&mut *conn)
        .await?;
    }

    for ingredient in &plan.added {
        insert_ingredient(conn, section_id, ingredient, &now).await?;
    }
    Ok(())
}

async fn insert_ingredient(
    conn: &mut SqliteConnection,
    section_id: i64,
    ingredient: &IngredientInput,
    now: &str,
) -> AppResult<()> {
    sqlx::query(
        r"
        INSERT INTO ingredients (recipe_section_id, name, sort_number, value, unit_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        ",
    )
    .bind(section_id)
    .bind(&ingredient.name)
    .bind(ingredient.sort_number)
    .bind(ingredient.value)
    .bind(ingredient.unit_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}
