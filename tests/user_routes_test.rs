// ABOUTME: Integration tests for the user administration route handlers
// ABOUTME: Tests registration mails, role replacement, profile updates and deletion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use common::{recipe_body, TestServer};
use helpers::axum_test::AxumTestRequest;
use recipe_core::permissions::UserRole;
use serde_json::{json, Value};

fn new_user(username: &str) -> Value {
    json!({
        "username": username,
        "password": "Welcome1",
        "firstName": "Julia",
        "lastName": "Child",
        "email": format!("{username}@example.com"),
        "notifications": true,
        "roles": ["CREATOR"]
    })
}

#[tokio::test]
async fn test_create_user_sends_confirmation() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;

    let created: Value = AxumTestRequest::post("/api/user")
        .token(&admin)
        .json(&new_user("julia"))
        .send(server.router())
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    let id = created["id"].as_i64().unwrap();

    let user: Value = AxumTestRequest::get(&format!("/api/user/{id}"))
        .token(&admin)
        .send(server.router())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(user["username"], "julia");
    assert_eq!(user["confirmed"], false);
    assert_eq!(user["roles"], json!(["CREATOR"]));

    let mails = server.mailer.sent();
    assert_eq!(mails.len(), 1);
    assert!(mails[0].text.contains("Julia Child"));
    assert!(mails[0].text.contains("username=julia"));
}

#[tokio::test]
async fn test_create_user_validation() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;

    let response = AxumTestRequest::post("/api/user")
        .token(&admin)
        .json(&json!({
            "username": "Bad Name",
            "password": "alllowercase",
            "email": "nope",
            "roles": ["CHEF"]
        }))
        .send(server.router())
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let fields = response.json::<Value>()["fields"].clone();
    assert_eq!(fields["username"], "invalidValue");
    assert_eq!(fields["password"], "simplePassword");
    assert_eq!(fields["email"], "invalidValue");
    assert_eq!(fields["roles.0"], "allowed");
    assert!(server.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;

    AxumTestRequest::post("/api/user")
        .token(&admin)
        .json(&new_user("julia"))
        .send(server.router())
        .await
        .assert_status(StatusCode::CREATED);

    let response = AxumTestRequest::post("/api/user")
        .token(&admin)
        .json(&new_user("julia"))
        .send(server.router())
        .await
        .assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["fields"]["username"], "notUnique");
}

#[tokio::test]
async fn test_failed_confirmation_mail_removes_user() {
    let server = TestServer::with_failing_mailer().await;
    let admin = server.admin_token().await;
    let before = server.database().users().count().await.unwrap();

    AxumTestRequest::post("/api/user")
        .token(&admin)
        .json(&new_user("julia"))
        .send(server.router())
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(server.database().users().count().await.unwrap(), before);
}

#[tokio::test]
async fn test_resend_confirmation() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;

    let created: Value = AxumTestRequest::post("/api/user")
        .token(&admin)
        .json(&new_user("julia"))
        .send(server.router())
        .await
        .json();
    let id = created["id"].as_i64().unwrap();

    AxumTestRequest::patch(&format!("/api/user/resendConfirmation/{id}"))
        .token(&admin)
        .send(server.router())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let mails = server.mailer.sent();
    assert_eq!(mails.len(), 2);
    assert_ne!(mails[0].text, mails[1].text);

    let (confirmed_id, _) = server.user("ready", &[UserRole::Creator]).await;
    AxumTestRequest::patch(&format!("/api/user/resendConfirmation/{confirmed_id}"))
        .token(&admin)
        .send(server.router())
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_replaces_roles() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (id, _) = server.user("cook", &[UserRole::Creator]).await;

    AxumTestRequest::put(&format!("/api/user/{id}"))
        .token(&admin)
        .json(&json!({
            "username": "cook",
            "email": "cook@example.com",
            "roles": ["ADMIN"]
        }))
        .send(server.router())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let user = server.database().users().get(id).await.unwrap();
    assert_eq!(user.roles, vec![UserRole::Admin]);

    AxumTestRequest::put("/api/user/9999")
        .token(&admin)
        .json(&json!({ "username": "ghost", "email": "ghost@example.com", "roles": [] }))
        .send(server.router())
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_admin_requires_admin() {
    let server = TestServer::new().await;
    let (_, creator) = server.user("cook", &[UserRole::Creator]).await;

    AxumTestRequest::get("/api/user")
        .token(&creator)
        .send(server.router())
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_own_profile() {
    let server = TestServer::new().await;
    let (id, creator) = server.user("cook", &[UserRole::Creator]).await;

    AxumTestRequest::patch("/api/user/updateProfile")
        .token(&creator)
        .json(&json!({
            "firstName": "Anthony",
            "lastName": "Bourdain",
            "email": "chef@example.com",
            "notifications": true
        }))
        .send(server.router())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let user = server.database().users().get(id).await.unwrap();
    assert_eq!(user.first_name.as_deref(), Some("Anthony"));
    assert_eq!(user.email, "chef@example.com");
    assert!(user.notifications);
    assert_eq!(user.roles, vec![UserRole::Creator]);
}

#[tokio::test]
async fn test_delete_user_with_recipes_conflicts() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (author_id, author) = server.user("cook", &[UserRole::Creator]).await;
    let (idle_id, _) = server.user("idle", &[UserRole::Creator]).await;
    let reference = server.reference_data().await;

    AxumTestRequest::post("/api/recipe")
        .token(&author)
        .json(&recipe_body("Cook's soup", reference))
        .send(server.router())
        .await
        .assert_status(StatusCode::CREATED);

    AxumTestRequest::delete(&format!("/api/user/{author_id}"))
        .token(&admin)
        .send(server.router())
        .await
        .assert_status(StatusCode::CONFLICT);

    AxumTestRequest::delete(&format!("/api/user/{idle_id}"))
        .token(&admin)
        .send(server.router())
        .await
        .assert_status(StatusCode::NO_CONTENT);
}
