// ABOUTME: HTTP server assembly: the public API app and the internal app on separate ports
// ABOUTME: Applies tracing, request id, CORS and security header layers and shuts both down on SIGINT/SIGTERM
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! # Server
//!
//! The public app serves the REST API below `BASE_PATH`. The internal app
//! serves `/sendNotifications` below `INTERNAL_PATH` and should not be
//! exposed beyond the deployment network.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{HeaderName, StatusCode};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::{setup_cors, with_security_headers};
use crate::resources::ServerResources;
use crate::routes::{api_routes, InternalRoutes};

const REQUEST_ID_HEADER: &str = "x-request-id";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Public and internal HTTP apps sharing one set of resources
pub struct RecipeServer {
    resources: Arc<ServerResources>,
}

impl RecipeServer {
    /// Create a server over `resources`
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// The public app: API routes below the configured base path
    #[must_use]
    pub fn public_router(&self) -> Router {
        let config = &self.resources.config;
        let api = api_routes(&self.resources);

        #[cfg(feature = "openapi")]
        let api = if config.environment.is_development() {
            api.merge(crate::routes::OpenApiRoutes::routes())
        } else {
            api
        };

        let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
        with_security_headers(mount(&config.base_path, api))
            .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT))
            .layer(setup_cors(config))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// The internal app: notification trigger and health check
    #[must_use]
    pub fn internal_router(&self) -> Router {
        with_security_headers(mount(
            &self.resources.config.internal_path,
            InternalRoutes::routes(self.resources.clone()),
        ))
        .layer(TraceLayer::new_for_http())
    }

    /// Bind both ports and serve until a shutdown signal arrives
    ///
    /// # Errors
    ///
    /// Returns an error if a port cannot be bound or a server fails
    pub async fn run(self) -> Result<()> {
        let config = self.resources.config.clone();
        let public_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
        let internal_addr = SocketAddr::from(([0, 0, 0, 0], config.internal_port));

        let public_listener = TcpListener::bind(public_addr)
            .await
            .with_context(|| format!("Failed to bind public port {}", config.http_port))?;
        let internal_listener = TcpListener::bind(internal_addr)
            .await
            .with_context(|| format!("Failed to bind internal port {}", config.internal_port))?;

        info!(address = %public_addr, base_path = %display_path(&config.base_path), "Public API listening");
        info!(address = %internal_addr, base_path = %display_path(&config.internal_path), "Internal API listening");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        });

        let public = axum::serve(public_listener, self.public_router())
            .with_graceful_shutdown(wait_for(shutdown_rx.clone()));
        let internal = axum::serve(internal_listener, self.internal_router())
            .with_graceful_shutdown(wait_for(shutdown_rx));

        tokio::try_join!(
            async { public.await.context("Public API server failed") },
            async { internal.await.context("Internal API server failed") },
        )?;

        info!("Server stopped");
        Ok(())
    }
}

/// Nest `routes` below `base_path`; an empty base path mounts at the root
fn mount(base_path: &str, routes: Router) -> Router {
    if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(base_path, routes)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    // A dropped sender also ends the wait.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
