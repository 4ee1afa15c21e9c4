// ABOUTME: Routes of the internal app, which listens on its own port
// ABOUTME: Triggers the new-recipe notification digest; meant for schedulers, not browsers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use recipe_core::errors::AppError;

use super::HealthRoutes;
use crate::notifications::send_digest;
use crate::resources::ServerResources;

/// Internal routes handler
pub struct InternalRoutes;

impl InternalRoutes {
    /// Create the internal routes, health check included
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/sendNotifications", post(Self::handle_send_notifications))
            .with_state(resources)
            .merge(HealthRoutes::routes())
    }

    /// Handle POST /sendNotifications
    async fn handle_send_notifications(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let summary = send_digest(
            &resources.database,
            resources.mailer.as_ref(),
            &resources.templates,
            &resources.config.mail.app_url,
            resources.config.notifications.range_days,
        )
        .await?;
        tracing::info!(
            recipes = summary.recipes,
            notified = summary.notified,
            "Notification digest finished"
        );
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
