//! # Diary Insta Bot Main Entry Point
//!
//! Initializes logging, loads configuration and bot settings, sets up the
//! database, authenticates against Instagram (resuming a persisted session
//! when possible), and runs the inbox polling loop until interrupted.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod bot;
mod config;
mod database;
mod platform;
mod services;
mod utils;

use crate::auth::{authenticate, AuthSessionManager, ConsolePrompt, SessionStore};
use crate::bot::dispatcher::PollingDispatcher;
use crate::bot::BotContext;
use crate::config::{BotSettings, Config};
use crate::database::connection::DatabaseManager;
use crate::platform::InstagramClient;
use crate::services::diary::DiaryClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diary_insta_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let settings = BotSettings::load(&config.settings_file)?;

    info!("Starting Diary Insta Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, session file: {}",
        config.database_url, config.session_file
    );

    // Initialize database
    info!("Initializing database connection...");
    let db = DatabaseManager::new(&config.database_url)
        .await
        .context("Failed to connect to the database")?;
    info!("Running database migrations...");
    db.run_migrations().await?;
    info!("Database initialized successfully");

    // Initialize platform client and authenticate
    info!("Initializing Instagram client...");
    let instagram = Arc::new(
        InstagramClient::new(&config.instagram_username, &config.instagram_password)
            .context("Failed to build Instagram client")?,
    );

    let session_store = SessionStore::new(&config.session_file);
    let mut auth_manager = AuthSessionManager::new(Arc::clone(&instagram), session_store);
    let account_id = authenticate(&mut auth_manager, &ConsolePrompt)
        .await
        .context("Authentication failed")?;
    info!("Authenticated as account {}", account_id);

    // Run the polling dispatcher until ctrl-c
    let ctx = Arc::new(BotContext {
        platform: instagram,
        diary: DiaryClient::default(),
        db,
        settings,
        account_id,
    });

    let dispatcher = PollingDispatcher::new(ctx)
        .with_poll_interval(std::time::Duration::from_secs(config.poll_interval_secs));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher_task = tokio::spawn(async move {
        dispatcher.run(shutdown_rx).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, draining current iteration...");

    // Cooperative cancellation: the loop finishes its iteration first
    let _ = shutdown_tx.send(true);
    if let Err(e) = dispatcher_task.await {
        tracing::error!("Dispatcher task error: {}", e);
    }

    info!("Application stopped");
    Ok(())
}
