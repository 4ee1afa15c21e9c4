// ABOUTME: Health check route handler for service monitoring
// ABOUTME: Answers a plain "ok" on both the public and the internal app
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use recipe_core::constants::endpoints;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health check route
    pub fn routes() -> axum::Router {
        use axum::{routing::get, Router};

        async fn health_handler() -> &'static str {
            "ok"
        }

        Router::new().route(endpoints::HEALTH_CHECK, get(health_handler))
    }
}
