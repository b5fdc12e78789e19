use crate::config::AppConfig;
use crate::db::engine::AnalyticsEngine;
use crate::llm::client::NlSqlClient;
use crate::query::pipeline::QueryPipeline;
use std::sync::Arc;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub engine: Arc<dyn AnalyticsEngine>,
    pub client: Arc<NlSqlClient>,
    pub pipeline: QueryPipeline,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        engine: Arc<dyn AnalyticsEngine>,
        client: Arc<NlSqlClient>,
    ) -> Self {
        let pipeline = QueryPipeline::new(Arc::clone(&engine), Arc::clone(&client));
        Self {
            config,
            engine,
            client,
            pipeline,
            startup_time: chrono::Utc::now(),
        }
    }
}
