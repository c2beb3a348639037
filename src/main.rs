mod api;
mod config;
mod content_generator;
mod database;
mod errors;
mod llm_providers;
mod logging;
mod models;
mod study_service;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    api::{create_router, AppState},
    config::Config,
    content_generator::ContentGenerator,
    database::Database,
    study_service::StudyService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // Initialize comprehensive logging with file output
    let _guard = setup_logging(&config)?;

    config.validate()?;

    crate::log_system_event!(startup, component = "server", "Starting Study Buddy server");

    // Initialize database
    let db = Database::new(&config.database.url).await?;
    crate::log_system_event!(
        startup,
        component = "database",
        "Database initialized successfully"
    );

    // Initialize content generation
    let generator = ContentGenerator::new_with_provider(
        config.llm.api_key.clone(),
        config.llm.base_url.clone(),
        config.llm.provider,
        config.llm.model.clone(),
    );
    info!(provider = ?config.llm.provider, "Initialized content generator");

    let study_service = StudyService::new(db, generator);

    // Create application state
    let state = AppState { study_service };

    // Build the application router with CORS middleware
    let app = create_router(state).layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn setup_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    use std::fs;
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    // Configure console output
    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(true);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if config.logging.file_enabled {
        // Create logs directory if it doesn't exist
        fs::create_dir_all(&config.logging.log_directory).unwrap_or_else(|e| {
            eprintln!("Warning: Could not create logs directory: {}", e);
        });

        // Set up file appender with daily rotation
        let file_appender =
            tracing_appender::rolling::daily(&config.logging.log_directory, "study-buddy.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

        // File output without ANSI colors
        let file_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking_file);

        registry.with(file_layer).init();

        info!(
            "Logging initialized - writing to {}/study-buddy.log with daily rotation",
            config.logging.log_directory
        );
        Ok(Some(guard))
    } else {
        registry.init();
        info!("Logging initialized - console only");
        Ok(None)
    }
}
