use clap::Parser;
use r2d2::Pool;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod db;
mod display;
mod llm;
mod query;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::db::engine::{AnalyticsEngine, DuckDBConnectionManager, DuckDbEngine};
use crate::llm::client::NlSqlClient;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Initializing DuckDB connection pool on {}",
        config.database.connection_string
    );
    let db_manager = DuckDBConnectionManager::new(config.database.connection_string.clone());
    let pool = Pool::builder()
        .max_size(config.database.pool_size as u32)
        .build(db_manager)?;

    let engine: Arc<dyn AnalyticsEngine> = Arc::new(DuckDbEngine::new(pool));

    if config.llm.mock_mode {
        info!("Mock mode enabled, questions will be answered from local templates");
    } else {
        info!("Using conversion service at {}", config.llm.api_url);
    }
    let client = Arc::new(NlSqlClient::new(&config.llm, Arc::clone(&engine))?);

    // Create application state
    let app_state = Arc::new(AppState::new(config.clone(), engine, client));

    // Start the web server
    info!(
        "Starting talk-to-data server on {}:{}",
        config.web.host, config.web.port
    );
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(std::io::Error::other(e.to_string()).into());
        }
    }

    Ok(())
}
