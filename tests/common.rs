// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides an in-memory server, recording mailers and user/token helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `recipe_server`

use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use axum::Router;
use recipe_core::errors::{AppError, AppResult};
use recipe_core::permissions::UserRole;
use recipe_server::auth::{hash_password, AuthManager};
use recipe_server::config::{AuthConfig, DatabaseConfig, Environment, ServerConfig};
use recipe_server::database::Database;
use recipe_server::email::{EmailMessage, EmailTemplates, Mailer};
use recipe_server::models::NewUser;
use recipe_server::resources::ServerResources;
use recipe_server::server::RecipeServer;
use serde_json::{json, Value};

/// Password given to every user created by [`create_user`]
pub const TEST_PASSWORD: &str = "Secret123";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Mailer that keeps every message in memory
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    /// Messages sent so far
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Mailer whose relay is always down
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: EmailMessage) -> AppResult<()> {
        Err(AppError::unable_to_send_email("relay unavailable"))
    }
}

/// Configuration used by every integration test
pub fn test_config() -> ServerConfig {
    let defaults = ServerConfig::default();
    ServerConfig {
        environment: Environment::Testing,
        auth: AuthConfig {
            bcrypt_cost: 4,
            ..defaults.auth.clone()
        },
        database: DatabaseConfig {
            seed_demo_data: false,
            ..defaults.database.clone()
        },
        ..defaults
    }
}

/// Server over a fresh in-memory database
pub struct TestServer {
    pub resources: Arc<ServerResources>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestServer {
    /// Start with a recording mailer
    pub async fn new() -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let resources = build_resources(test_config(), mailer.clone()).await;
        Self { resources, mailer }
    }

    /// Start with a recording mailer and a custom configuration
    pub async fn with_config(config: ServerConfig) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let resources = build_resources(config, mailer.clone()).await;
        Self { resources, mailer }
    }

    /// Start with a mailer that always fails
    pub async fn with_failing_mailer() -> Self {
        let resources = build_resources(test_config(), Arc::new(FailingMailer)).await;
        Self {
            resources,
            mailer: Arc::new(RecordingMailer::default()),
        }
    }

    /// The public app, mounted below `/api`
    pub fn router(&self) -> Router {
        RecipeServer::new(self.resources.clone()).public_router()
    }

    /// The internal app, mounted below `/internal`
    pub fn internal_router(&self) -> Router {
        RecipeServer::new(self.resources.clone()).internal_router()
    }

    pub fn database(&self) -> &Database {
        &self.resources.database
    }

    /// Create a confirmed user and return the id with an access token
    pub async fn user(&self, username: &str, roles: &[UserRole]) -> (i64, String) {
        create_user(&self.resources, username, roles).await
    }

    /// Access token for a confirmed admin
    pub async fn admin_token(&self) -> String {
        self.user("admin", &[UserRole::Admin]).await.1
    }

    /// Category, unit category and unit for recipe bodies
    pub async fn reference_data(&self) -> ReferenceData {
        let db = self.database();
        let category_id = db.categories().create("Soups").await.unwrap();
        let unit_category_id = db.unit_categories().create("Weight").await.unwrap();
        let unit = recipe_server::models::UnitInput {
            name: "gram".into(),
            abbreviation: "g".into(),
            required: true,
            unit_category_id,
        };
        let unit_id = db.units().create(&unit).await.unwrap();
        ReferenceData {
            category_id,
            unit_category_id,
            unit_id,
        }
    }
}

/// Ids created by [`TestServer::reference_data`]
#[derive(Debug, Clone, Copy)]
pub struct ReferenceData {
    pub category_id: i64,
    pub unit_category_id: i64,
    pub unit_id: i64,
}

/// Assemble resources over an in-memory database
pub async fn build_resources(config: ServerConfig, mailer: Arc<dyn Mailer>) -> Arc<ServerResources> {
    init_test_logging();
    let database = Database::in_memory().await.expect("in-memory database");
    let auth_manager = AuthManager::new(&config.auth).expect("auth manager");
    let templates = EmailTemplates::builtin().expect("builtin templates");
    Arc::new(ServerResources::new(database, auth_manager, mailer, templates, config))
}

/// Create a confirmed user with [`TEST_PASSWORD`]
pub async fn create_user(
    resources: &ServerResources,
    username: &str,
    roles: &[UserRole],
) -> (i64, String) {
    let new_user = NewUser {
        username: username.to_owned(),
        password: TEST_PASSWORD.to_owned(),
        first_name: None,
        last_name: None,
        email: format!("{username}@example.com"),
        notifications: false,
        roles: roles.iter().map(|role| role.as_str().to_owned()).collect(),
    }
    .validated()
    .expect("valid test user");

    let hash = hash_password(TEST_PASSWORD, 4).await.unwrap();
    let users = resources.database.users();
    let id = users.create(&new_user, &hash, "setup-key").await.unwrap();
    users.confirm(username, "setup-key").await.unwrap();

    let token = resources.auth_manager.issue_tokens(id, roles).unwrap().token;
    (id, token)
}

/// `Authorization` header value for a token
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Search body for the first page, ordered by name
pub fn find_body(extra: Value) -> Value {
    let mut body = json!({
        "search": null,
        "categoryId": null,
        "tags": [],
        "page": 0,
        "pageSize": 30,
        "orderBy": "name",
        "order": "ASC"
    });
    if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
    body
}

/// Complete recipe body with one section holding one ingredient
pub fn recipe_body(name: &str, reference: ReferenceData) -> Value {
    json!({
        "name": name,
        "description": "A test recipe",
        "serves": 4,
        "categoryId": reference.category_id,
        "method": null,
        "sources": ["grandma"],
        "recipeSections": [{
            "name": "Main",
            "sortNumber": 1,
            "method": null,
            "ingredients": [{
                "name": "Salt",
                "sortNumber": 1,
                "value": 5,
                "unitId": reference.unit_id
            }]
        }],
        "associatedRecipes": [],
        "tags": [],
        "pictures": []
    })
}
