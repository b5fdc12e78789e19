use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hard ceiling on a single conversion-service call. Changing this changes
/// how long a user can be left waiting before the mock fallback kicks in.
pub const CONVERSION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub pool_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Base URL of the conversion service, e.g. "http://localhost:8001"
    pub api_url: String,
    /// When true the pipeline never calls the conversion service and
    /// answers from the local query templates only.
    pub mock_mode: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to the DuckDB database file
    #[arg(long)]
    pub database: Option<String>,

    /// Force mock mode regardless of configuration
    #[arg(long)]
    pub mock: bool,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        // Start from built-in defaults so a missing config file still boots
        let mut config_builder = Config::builder()
            .set_default("database.connection_string", "talk-to-data.duckdb")?
            .set_default("database.pool_size", 4)?
            .set_default("web.host", "127.0.0.1")?
            .set_default("web.port", 3000)?
            .set_default("llm.api_url", "http://localhost:8001")?
            .set_default("llm.mock_mode", true)?;

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/talk-to-data/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // Environment overrides, e.g. TALK_TO_DATA__LLM__API_URL
        config_builder =
            config_builder.add_source(Environment::with_prefix("TALK_TO_DATA").separator("__"));

        // Build the config
        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(database) = &args.database {
            config.database.connection_string = database.clone();
        }
        if args.mock {
            config.llm.mock_mode = true;
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                connection_string: "talk-to-data.duckdb".to_string(),
                pool_size: 4,
            },
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            llm: LlmConfig {
                api_url: "http://localhost:8001".to_string(),
                mock_mode: true,
            },
        }
    }
}
