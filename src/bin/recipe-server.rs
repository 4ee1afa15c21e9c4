// ABOUTME: Server binary: loads configuration, seeds demo data and serves both HTTP apps
// ABOUTME: Command line flags override the port and database settings from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

#![recursion_limit = "256"]

//! # Recipe Server Binary
//!
//! Starts the public REST API and the internal notification endpoint.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use recipe_server::auth::hash_password;
use recipe_server::config::{DatabaseUrl, ServerConfig};
use recipe_server::database::seed::{seed_demo_data, DEMO_PASSWORD, DEMO_USERNAME};
use recipe_server::logging;
use recipe_server::resources::ServerResources;
use recipe_server::server::RecipeServer;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "recipe-server")]
#[command(about = "Recipe Server - recipes, pictures and user accounts over REST")]
pub struct Args {
    /// Override the public HTTP port
    #[arg(long)]
    port: Option<u16>,

    /// Override the internal HTTP port
    #[arg(long)]
    internal_port: Option<u16>,

    /// Override the database URL (`sqlite:recipes.db` or `sqlite::memory:`)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(port) = args.internal_port {
        config.internal_port = port;
    }
    if let Some(url) = args.database_url {
        config.database.url = DatabaseUrl::parse_url(&url);
    }
    config.validate()?;

    logging::init_from_env()?;
    info!("Starting Recipe Server");
    info!("{}", config.summary());

    let seed = config.database.seed_demo_data;
    let bcrypt_cost = config.auth.bcrypt_cost;
    let resources = ServerResources::from_config(config).await?;
    info!("Database initialized");

    if seed {
        let password_hash = hash_password(DEMO_PASSWORD, bcrypt_cost).await?;
        if seed_demo_data(&resources.database, &password_hash).await? {
            info!(username = DEMO_USERNAME, "Demo data seeded");
        }
    }

    if let Err(e) = RecipeServer::new(Arc::new(resources)).run().await {
        error!("Server error: {e:#}");
        return Err(e);
    }
    Ok(())
}
