// ABOUTME: Development seed: an admin account, reference data and a couple of recipes
// ABOUTME: Runs on startup in development only while the user table is still empty
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! Demo data for development databases
//!
//! Log in as `test` / `Test1234` (role ADMIN) after the first start.

use recipe_core::errors::{AppError, AppResult};
use recipe_core::permissions::UserRole;
use serde_json::json;
use tracing::info;

use super::{now_timestamp, Database};
use crate::models::RecipeInput;

/// Username of the seeded administrator
pub const DEMO_USERNAME: &str = "test";

/// Password of the seeded administrator
pub const DEMO_PASSWORD: &str = "Test1234";

const UNIT_CATEGORIES: [(&str, &[(&str, &str, bool)]); 3] = [
    ("Weight", &[("gram", "g", true), ("kilogram", "kg", true)]),
    (
        "Volume",
        &[
            ("millilitre", "ml", true),
            ("litre", "l", true),
            ("teaspoon", "tsp", true),
            ("tablespoon", "tbsp", true),
        ],
    ),
    ("Other", &[("piece", "pcs", true), ("to taste", "tt", false)]),
];

const CATEGORIES: [&str; 4] = ["Soups", "Main dishes", "Desserts", "Salads"];

const TAGS: [&str; 3] = ["Quick", "Vegetarian", "Spicy"];

/// Seed an empty database
///
/// Returns `false` without touching anything when users already exist.
///
/// # Errors
///
/// Returns an error if any insert fails
pub async fn seed_demo_data(db: &Database, password_hash: &str) -> AppResult<bool> {
    if db.users().count().await? > 0 {
        return Ok(false);
    }

    let now = now_timestamp();
    let admin_id: i64 = sqlx::query_scalar(
        r"
        INSERT INTO users (username, password_hash, first_name, last_name, email, confirmed, notifications, created_at, updated_at)
        VALUES ($1, $2, 'Test', 'User', 'test@example.com', 1, 0, $3, $3)
        RETURNING id
        ",
    )
    .bind(DEMO_USERNAME)
    .bind(password_hash)
    .bind(&now)
    .fetch_one(db.pool())
    .await?;

    sqlx::query("INSERT INTO user_roles (user_id, role_name) VALUES ($1, $2)")
        .bind(admin_id)
        .bind(UserRole::Admin.as_str())
        .execute(db.pool())
        .await?;

    let mut unit_ids = Vec::new();
    for (category, units) in UNIT_CATEGORIES {
        let unit_category_id = db.unit_categories().create(category).await?;
        for (name, abbreviation, required) in units {
            let unit_id: i64 = sqlx::query_scalar(
                r"
                INSERT INTO units (name, abbreviation, required, unit_category_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $5)
                RETURNING id
                ",
            )
            .bind(*name)
            .bind(*abbreviation)
            .bind(*required)
            .bind(unit_category_id)
            .bind(&now)
            .fetch_one(db.pool())
            .await?;
            unit_ids.push(unit_id);
        }
    }

    let mut category_ids = Vec::new();
    for category in CATEGORIES {
        category_ids.push(db.categories().create(category).await?);
    }
    let mut tag_ids = Vec::new();
    for tag in TAGS {
        tag_ids.push(db.tags().create(tag).await?);
    }

    let (gram, litre, piece) = (unit_ids[0], unit_ids[3], unit_ids[6]);
    let soup = sample_recipe(json!({
        "name": "Tomato soup",
        "description": "Smooth soup from roasted tomatoes",
        "serves": 4,
        "method": "Roast the tomatoes, blend with the stock and season.",
        "categoryId": category_ids[0],
        "sources": [],
        "tags": [tag_ids[0], tag_ids[1]],
        "associatedRecipes": [],
        "pictures": [],
        "recipeSections": [{
            "name": "",
            "sortNumber": 1,
            "ingredients": [
                {"name": "Tomatoes", "sortNumber": 1, "value": 800, "unitId": gram},
                {"name": "Vegetable stock", "sortNumber": 2, "value": 0.5, "unitId": litre},
                {"name": "Onion", "sortNumber": 3, "value": 1, "unitId": piece}
            ]
        }]
    }))?;
    let soup_id = db.recipes().create(&soup, admin_id).await?;

    let salad = sample_recipe(json!({
        "name": "Crème fraîche salad",
        "description": "Cucumber salad with crème fraîche",
        "serves": 2,
        "categoryId": category_ids[3],
        "sources": [],
        "tags": [tag_ids[0]],
        "associatedRecipes": [soup_id],
        "pictures": [],
        "recipeSections": [{
            "name": "Salad",
            "sortNumber": 1,
            "ingredients": [
                {"name": "Cucumber", "sortNumber": 1, "value": 1, "unitId": piece},
                {"name": "Crème fraîche", "sortNumber": 2, "value": 150, "unitId": gram}
            ]
        }]
    }))?;
    db.recipes().create(&salad, admin_id).await?;

    info!(username = DEMO_USERNAME, "Seeded demo data");
    Ok(true)
}

fn sample_recipe(body: serde_json::Value) -> AppResult<RecipeInput> {
    serde_json::from_value::<RecipeInput>(body)
        .map_err(|e| AppError::internal(format!("Invalid sample recipe: {e}")))?
        .validated()
}
