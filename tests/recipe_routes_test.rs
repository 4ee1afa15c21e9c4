// ABOUTME: Integration tests for the recipe route handlers
// ABOUTME: Covers aggregate reconciliation on update, search, uniqueness and picture cleanup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{find_body, recipe_body, test_config, ReferenceData, TestServer};
use helpers::axum_test::AxumTestRequest;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use recipe_core::permissions::UserRole;
use recipe_server::database::format_timestamp;
use serde_json::{json, Value};
use std::io::Cursor;

// ============================================================================
// Test Helpers
// ============================================================================

struct Setup {
    server: TestServer,
    token: String,
    reference: ReferenceData,
}

async fn setup() -> Setup {
    let server = TestServer::new().await;
    let (_, token) = server.user("chef", &[UserRole::Creator]).await;
    let reference = server.reference_data().await;
    Setup {
        server,
        token,
        reference,
    }
}

async fn create_recipe(setup: &Setup, body: &Value) -> i64 {
    let response = AxumTestRequest::post("/api/recipe")
        .token(&setup.token)
        .json(body)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_i64().unwrap()
}

async fn get_recipe(setup: &Setup, id: i64) -> Value {
    AxumTestRequest::get(&format!("/api/recipe/{id}"))
        .token(&setup.token)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::OK)
        .json()
}

async fn upload_picture(setup: &Setup, file_name: &str) -> i64 {
    let image = RgbImage::from_pixel(40, 30, Rgb([10, 120, 60]));
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut png, ImageFormat::Png)
        .unwrap();

    let response = AxumTestRequest::post("/api/picture/upload")
        .token(&setup.token)
        .multipart_file("file", file_name, &png.into_inner())
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_i64().unwrap()
}

async fn picture_status(setup: &Setup, id: i64) -> u16 {
    AxumTestRequest::get(&format!("/api/picture/thumbnail/{id}"))
        .token(&setup.token)
        .send(setup.server.router())
        .await
        .status()
}

// ============================================================================
// Create and read
// ============================================================================

#[tokio::test]
async fn test_create_and_get_recipe() {
    let setup = setup().await;
    let id = create_recipe(&setup, &recipe_body("Tomato soup", setup.reference)).await;

    let recipe = get_recipe(&setup, id).await;
    assert_eq!(recipe["name"], "Tomato soup");
    assert_eq!(recipe["serves"], 4);
    assert_eq!(recipe["sources"], json!(["grandma"]));
    assert_eq!(recipe["creator"]["username"], "chef");

    let sections = recipe["recipeSections"].as_array().unwrap();
    assert_eq!(sections.len(), 1);
    let ingredient = &sections[0]["ingredients"][0];
    assert_eq!(ingredient["name"], "Salt");
    assert_eq!(ingredient["unit"]["abbreviation"], "g");
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let setup = setup().await;
    let response = AxumTestRequest::post("/api/recipe")
        .json(&recipe_body("Anonymous", setup.reference))
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_invalid_body_lists_fields() {
    let setup = setup().await;
    let response = AxumTestRequest::post("/api/recipe")
        .token(&setup.token)
        .json(&json!({
            "name": "   ",
            "serves": 0,
            "recipeSections": [{ "name": "Main", "sortNumber": 0, "ingredients": [] }]
        }))
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["fields"]["name"], "required");
    assert_eq!(body["fields"]["categoryId"], "required");
    assert!(body["fields"]["serves"].is_string());
    assert!(body["fields"]["recipeSections.0.sortNumber"].is_string());
    assert_eq!(body["fields"]["tags"], "required");
}

#[tokio::test]
async fn test_duplicate_name_conflicts_and_rolls_back() {
    let setup = setup().await;
    create_recipe(&setup, &recipe_body("Borscht", setup.reference)).await;

    let response = AxumTestRequest::post("/api/recipe")
        .token(&setup.token)
        .json(&recipe_body("Borscht", setup.reference))
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNIQUE_CONSTRAINT_ERROR");

    assert_eq!(setup.server.database().recipes().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_unit_leaves_nothing_behind() {
    let setup = setup().await;
    let mut body = recipe_body("Ghost stew", setup.reference);
    body["recipeSections"][0]["ingredients"][0]["unitId"] = json!(9999);

    AxumTestRequest::post("/api/recipe")
        .token(&setup.token)
        .json(&body)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::CONFLICT);

    assert_eq!(setup.server.database().recipes().count().await.unwrap(), 0);
}

// ============================================================================
// Reconciliation on update
// ============================================================================

#[tokio::test]
async fn test_update_reconciles_sections_and_ingredients() {
    let setup = setup().await;
    let reference = setup.reference;
    let mut body = recipe_body("Minestrone", reference);
    body["recipeSections"] = json!([
        {
            "name": "Soup",
            "sortNumber": 1,
            "ingredients": [
                { "name": "Beans", "sortNumber": 1, "value": 200, "unitId": reference.unit_id },
                { "name": "Pasta", "sortNumber": 2, "value": 100, "unitId": reference.unit_id }
            ]
        },
        { "name": "Topping", "sortNumber": 2, "ingredients": [] }
    ]);
    let id = create_recipe(&setup, &body).await;

    let stored = get_recipe(&setup, id).await;
    let soup = &stored["recipeSections"][0];
    let soup_id = soup["id"].as_i64().unwrap();
    let beans_id = soup["ingredients"][0]["id"].as_i64().unwrap();

    // Keep the soup section and the beans, drop the pasta and the topping
    // section, and add an ingredient without id.
    body["recipeSections"] = json!([{
        "id": soup_id,
        "name": "Soup base",
        "sortNumber": 1,
        "ingredients": [
            { "id": beans_id, "name": "White beans", "sortNumber": 1, "value": 250, "unitId": reference.unit_id },
            { "name": "Basil", "sortNumber": 2, "unitId": reference.unit_id }
        ]
    }]);
    AxumTestRequest::put(&format!("/api/recipe/{id}"))
        .token(&setup.token)
        .json(&body)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let updated = get_recipe(&setup, id).await;
    let sections = updated["recipeSections"].as_array().unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0]["id"], soup_id);
    assert_eq!(sections[0]["name"], "Soup base");

    let ingredients = sections[0]["ingredients"].as_array().unwrap();
    assert_eq!(ingredients.len(), 2);
    assert_eq!(ingredients[0]["id"], beans_id);
    assert_eq!(ingredients[0]["name"], "White beans");
    assert_eq!(ingredients[0]["value"], 250.0);
    assert_eq!(ingredients[1]["name"], "Basil");
    assert_ne!(ingredients[1]["id"], beans_id);
    assert!(ingredients[1]["value"].is_null());
}

#[tokio::test]
async fn test_update_with_foreign_section_id_is_not_found() {
    let setup = setup().await;
    let first = create_recipe(&setup, &recipe_body("First", setup.reference)).await;
    let second = create_recipe(&setup, &recipe_body("Second", setup.reference)).await;

    let foreign_section = get_recipe(&setup, first).await["recipeSections"][0]["id"].clone();
    let mut body = recipe_body("Second", setup.reference);
    body["recipeSections"][0]["id"] = foreign_section;

    AxumTestRequest::put(&format!("/api/recipe/{second}"))
        .token(&setup.token)
        .json(&body)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // The failed update left the second recipe untouched
    let unchanged = get_recipe(&setup, second).await;
    assert_eq!(unchanged["recipeSections"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_with_ingredient_of_another_section_is_not_found() {
    let setup = setup().await;
    let reference = setup.reference;
    let mut body = recipe_body("Ramen", reference);
    body["recipeSections"] = json!([
        {
            "name": "Broth",
            "sortNumber": 1,
            "ingredients": [{ "name": "Miso", "sortNumber": 1, "value": 30, "unitId": reference.unit_id }]
        },
        {
            "name": "Toppings",
            "sortNumber": 2,
            "ingredients": [{ "name": "Egg", "sortNumber": 1, "value": 1, "unitId": reference.unit_id }]
        }
    ]);
    let id = create_recipe(&setup, &body).await;

    let stored = get_recipe(&setup, id).await;
    let broth_id = stored["recipeSections"][0]["id"].clone();
    let toppings_id = stored["recipeSections"][1]["id"].clone();
    let egg_id = stored["recipeSections"][1]["ingredients"][0]["id"].clone();

    // Move the egg into the broth by id; ids never cross sections.
    body["recipeSections"] = json!([
        {
            "id": broth_id,
            "name": "Rich broth",
            "sortNumber": 1,
            "ingredients": [{ "id": egg_id, "name": "Egg", "sortNumber": 1, "value": 1, "unitId": reference.unit_id }]
        },
        { "id": toppings_id, "name": "Toppings", "sortNumber": 2, "ingredients": [] }
    ]);
    let response = AxumTestRequest::put(&format!("/api/recipe/{id}"))
        .token(&setup.token)
        .json(&body)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");

    let unchanged = get_recipe(&setup, id).await;
    assert_eq!(unchanged["recipeSections"][0]["name"], "Broth");
    assert_eq!(unchanged["recipeSections"][0]["ingredients"][0]["name"], "Miso");
    assert_eq!(unchanged["recipeSections"][1]["ingredients"][0]["id"], egg_id);
}

#[tokio::test]
async fn test_update_without_sections_is_rejected() {
    let setup = setup().await;
    let mut body = recipe_body("Paella", setup.reference);
    let id = create_recipe(&setup, &body).await;

    body.as_object_mut().unwrap().remove("recipeSections");
    let response = AxumTestRequest::put(&format!("/api/recipe/{id}"))
        .token(&setup.token)
        .json(&body)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let error: Value = response.json();
    assert_eq!(error["code"], "VALIDATION_FAILED");
    assert_eq!(error["fields"]["recipeSections"], "required");

    let unchanged = get_recipe(&setup, id).await;
    let sections = unchanged["recipeSections"].as_array().unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0]["ingredients"][0]["name"], "Salt");
}

#[tokio::test]
async fn test_update_replaces_tags_and_associations() {
    let setup = setup().await;
    let tags = setup.server.database().tags();
    let quick = tags.create("Quick").await.unwrap();
    let cheap = tags.create("Cheap").await.unwrap();

    let side = create_recipe(&setup, &recipe_body("Bread", setup.reference)).await;
    let mut body = recipe_body("Goulash", setup.reference);
    body["tags"] = json!([quick]);
    body["associatedRecipes"] = json!([side]);
    let id = create_recipe(&setup, &body).await;

    let stored = get_recipe(&setup, id).await;
    assert_eq!(stored["tags"][0]["name"], "Quick");
    assert_eq!(stored["associatedRecipes"][0]["name"], "Bread");

    body["tags"] = json!([cheap, cheap]);
    body["associatedRecipes"] = json!([]);
    AxumTestRequest::put(&format!("/api/recipe/{id}"))
        .token(&setup.token)
        .json(&body)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let updated = get_recipe(&setup, id).await;
    let tag_names: Vec<&str> = updated["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tag| tag["name"].as_str().unwrap())
        .collect();
    assert_eq!(tag_names, vec!["Cheap"]);
    assert!(updated["associatedRecipes"].as_array().unwrap().is_empty());
}

// ============================================================================
// Pictures
// ============================================================================

#[tokio::test]
async fn test_pictures_attach_and_detach() {
    let setup = setup().await;
    let first = upload_picture(&setup, "front.png").await;
    let second = upload_picture(&setup, "side.png").await;

    let mut body = recipe_body("Lasagne", setup.reference);
    body["pictures"] = json!([
        { "id": second, "name": "Assembled", "sortNumber": 2 },
        { "id": first, "name": "Front", "sortNumber": 1 }
    ]);
    let id = create_recipe(&setup, &body).await;

    // The recipe gallery follows the sort number, the picture list the name.
    let gallery = get_recipe(&setup, id).await["pictures"].clone();
    assert_eq!(gallery[0]["id"], first);
    assert_eq!(gallery[1]["id"], second);

    let pictures: Value = AxumTestRequest::get(&format!("/api/picture/byRecipe/{id}"))
        .token(&setup.token)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(pictures[0]["id"], second);
    assert_eq!(pictures[1]["id"], first);

    body["pictures"] = json!([{ "id": first, "name": "Front", "sortNumber": 1 }]);
    AxumTestRequest::put(&format!("/api/recipe/{id}"))
        .token(&setup.token)
        .json(&body)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert_eq!(picture_status(&setup, first).await, 200);
    assert_eq!(picture_status(&setup, second).await, 404);
}

#[tokio::test]
async fn test_picture_of_another_recipe_is_not_found() {
    let setup = setup().await;
    let picture = upload_picture(&setup, "shared.png").await;

    let mut body = recipe_body("Risotto", setup.reference);
    body["pictures"] = json!([{ "id": picture, "name": "Risotto", "sortNumber": 1 }]);
    let owner = create_recipe(&setup, &body).await;

    let mut other = recipe_body("Gnocchi", setup.reference);
    other["pictures"] = json!([{ "id": picture, "name": "Gnocchi", "sortNumber": 1 }]);
    AxumTestRequest::post("/api/recipe")
        .token(&setup.token)
        .json(&other)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::NOT_FOUND);

    assert_eq!(setup.server.database().recipes().count().await.unwrap(), 1);
    let pictures: Value = AxumTestRequest::get(&format!("/api/picture/byRecipe/{owner}"))
        .token(&setup.token)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(pictures[0]["id"], picture);
    assert_eq!(pictures[0]["name"], "Risotto");
}

async fn age_picture(setup: &Setup, id: i64, hours: i64) {
    let created_at = format_timestamp(Utc::now() - Duration::hours(hours));
    sqlx::query("UPDATE pictures SET created_at = $1 WHERE id = $2")
        .bind(&created_at)
        .bind(id)
        .execute(setup.server.database().pool())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_updating_a_recipe_collects_old_orphans() {
    let setup = setup().await;
    let body = recipe_body("Waffles", setup.reference);
    let id = create_recipe(&setup, &body).await;

    let stale = upload_picture(&setup, "forgotten.png").await;
    let fresh = upload_picture(&setup, "just-uploaded.png").await;
    age_picture(&setup, stale, 25).await;
    age_picture(&setup, fresh, 23).await;

    AxumTestRequest::put(&format!("/api/recipe/{id}"))
        .token(&setup.token)
        .json(&body)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert_eq!(picture_status(&setup, stale).await, 404);
    assert_eq!(picture_status(&setup, fresh).await, 200);
}

#[tokio::test]
async fn test_saving_a_recipe_collects_old_orphans() {
    let setup = setup().await;
    let stale = upload_picture(&setup, "abandoned.png").await;
    let fresh = upload_picture(&setup, "in-progress.png").await;

    age_picture(&setup, stale, 48).await;

    create_recipe(&setup, &recipe_body("Pancakes", setup.reference)).await;

    assert_eq!(picture_status(&setup, stale).await, 404);
    assert_eq!(picture_status(&setup, fresh).await, 200);
}

// ============================================================================
// Search and delete
// ============================================================================

#[tokio::test]
async fn test_find_requires_every_tag() {
    let setup = setup().await;
    let tags = setup.server.database().tags();
    let quick = tags.create("Quick").await.unwrap();
    let vegan = tags.create("Vegan").await.unwrap();

    let mut both = recipe_body("Chickpea curry", setup.reference);
    both["tags"] = json!([quick, vegan]);
    create_recipe(&setup, &both).await;

    let mut one = recipe_body("Fried egg", setup.reference);
    one["tags"] = json!([quick]);
    create_recipe(&setup, &one).await;

    let page: Value = AxumTestRequest::post("/api/recipe/find")
        .token(&setup.token)
        .json(&find_body(json!({ "tags": [quick, vegan] })))
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(page["count"], 1);
    assert_eq!(page["rows"][0]["name"], "Chickpea curry");

    let page: Value = AxumTestRequest::post("/api/recipe/find")
        .token(&setup.token)
        .json(&find_body(json!({ "search": "EGG" })))
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(page["count"], 1);
    assert_eq!(page["rows"][0]["name"], "Fried egg");
}

#[tokio::test]
async fn test_find_rejects_unknown_order() {
    let setup = setup().await;
    let response = AxumTestRequest::post("/api/recipe/find")
        .token(&setup.token)
        .json(&find_body(json!({ "orderBy": "calories" })))
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(body["fields"]["orderBy"].is_string());
}

#[tokio::test]
async fn test_find_pages_are_zero_based_and_bounded() {
    let setup = setup().await;
    create_recipe(&setup, &recipe_body("Only one", setup.reference)).await;

    let first: Value = AxumTestRequest::post("/api/recipe/find")
        .token(&setup.token)
        .json(&find_body(json!({ "page": 0, "pageSize": 1 })))
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(first["page"], 0);
    assert_eq!(first["rows"].as_array().unwrap().len(), 1);

    let second: Value = AxumTestRequest::post("/api/recipe/find")
        .token(&setup.token)
        .json(&find_body(json!({ "page": 1, "pageSize": 1 })))
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(second["count"], 1);
    assert!(second["rows"].as_array().unwrap().is_empty());

    let response = AxumTestRequest::post("/api/recipe/find")
        .token(&setup.token)
        .json(&find_body(json!({ "page": i64::MAX, "pageSize": 30 })))
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["fields"]["page"], "max");
}

#[tokio::test]
async fn test_delete_recipe() {
    let setup = setup().await;
    let id = create_recipe(&setup, &recipe_body("Short lived", setup.reference)).await;

    AxumTestRequest::delete(&format!("/api/recipe/{id}"))
        .token(&setup.token)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    AxumTestRequest::get(&format!("/api/recipe/{id}"))
        .token(&setup.token)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_id_is_a_validation_error() {
    let setup = setup().await;
    let response = AxumTestRequest::get("/api/recipe/abc")
        .token(&setup.token)
        .send(setup.server.router())
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["fields"]["id"], "invalidValue");
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let mut config = test_config();
    config.pictures.max_upload_bytes = 512;
    let server = TestServer::with_config(config).await;
    let (_, token) = server.user("chef", &[UserRole::Creator]).await;

    AxumTestRequest::post("/api/picture/upload")
        .token(&token)
        .multipart_file("file", "huge.png", &[0_u8; 4096])
        .send(server.router())
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}
