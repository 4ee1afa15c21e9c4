// ABOUTME: Centralized resource container shared by every route handler
// ABOUTME: Holds the database, token manager, bearer guard, mailer, templates and configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! # Server Resources
//!
//! Built once at startup and shared as `Arc<ServerResources>`. Handlers
//! never construct managers or mailers of their own.

use std::sync::Arc;

use recipe_core::errors::AppResult;

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::email::{mailer_from_config, EmailTemplates, Mailer};
use crate::middleware::BearerAuthMiddleware;

/// Centralized resource container for dependency injection
#[derive(Clone)]
pub struct ServerResources {
    /// Connection pool and table managers
    pub database: Database,
    /// Token issuing and password hashing
    pub auth_manager: Arc<AuthManager>,
    /// Bearer token guard used by protected routes
    pub auth_middleware: Arc<BearerAuthMiddleware>,
    /// Outgoing mail
    pub mailer: Arc<dyn Mailer>,
    /// Compiled mail templates
    pub templates: Arc<EmailTemplates>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl ServerResources {
    /// Assemble resources from already constructed parts
    #[must_use]
    pub fn new(
        database: Database,
        auth_manager: AuthManager,
        mailer: Arc<dyn Mailer>,
        templates: EmailTemplates,
        config: ServerConfig,
    ) -> Self {
        let auth_middleware = BearerAuthMiddleware::new(auth_manager.clone());
        Self {
            database,
            auth_manager: Arc::new(auth_manager),
            auth_middleware: Arc::new(auth_middleware),
            mailer,
            templates: Arc::new(templates),
            config: Arc::new(config),
        }
    }

    /// Connect the database and build every resource from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the database, the mail relay or a mail template
    /// cannot be set up
    pub async fn from_config(config: ServerConfig) -> AppResult<Self> {
        let database = Database::new(&config.database.url).await?;
        let auth_manager = AuthManager::new(&config.auth)?;
        let mailer = mailer_from_config(&config.mail)?;
        let templates = EmailTemplates::from_env()?;
        Ok(Self::new(database, auth_manager, mailer, templates, config))
    }
}
