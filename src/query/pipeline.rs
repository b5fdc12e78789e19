//! The full question-to-result pipeline.

use crate::db::engine::AnalyticsEngine;
use crate::llm::client::NlSqlClient;
use crate::llm::models::Conversion;
use crate::query::error::QueryError;
use crate::query::executor::{self, QueryResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Everything a caller needs to render one answered question.
#[derive(Debug, Serialize)]
pub struct ProcessedQuery {
    pub result: QueryResult,
    pub conversion: Conversion,
    /// Always 0: the pipeline makes no automatic retries. The caller owns
    /// the decision to re-prompt or attempt a correction pass.
    pub retry_count: u32,
}

pub struct QueryPipeline {
    engine: Arc<dyn AnalyticsEngine>,
    client: Arc<NlSqlClient>,
}

impl QueryPipeline {
    pub fn new(engine: Arc<dyn AnalyticsEngine>, client: Arc<NlSqlClient>) -> Self {
        Self { engine, client }
    }

    /// Converts the question, executes the resulting SQL, and returns both.
    ///
    /// Conversion itself cannot fail (it degrades to the mock templater);
    /// execution failures surface as a terminal [`QueryError`].
    pub async fn process_natural_language_query(
        &self,
        question: &str,
        context_info: &str,
    ) -> Result<ProcessedQuery, QueryError> {
        let conversion = self.client.convert(question, context_info).await;
        info!(
            source = ?conversion.source,
            confidence = conversion.nl.confidence,
            "question converted to SQL"
        );

        let result = executor::execute(self.engine.as_ref(), &conversion.nl.sql).await?;

        Ok(ProcessedQuery { result, conversion, retry_count: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::db::engine::{EngineError, Row};
    use crate::llm::models::ConversionSource;
    use async_trait::async_trait;
    use serde_json::json;

    struct CountingEngine;

    #[async_trait]
    impl AnalyticsEngine for CountingEngine {
        async fn list_tables(&self) -> Result<Vec<String>, EngineError> {
            Ok(vec!["dc_order_lines".to_string()])
        }

        async fn table_schema(&self, _table: &str) -> Result<Vec<(String, String)>, EngineError> {
            Ok(vec![("orders_on_hold".to_string(), "BIGINT".to_string())])
        }

        async fn run_query(&self, _sql: &str) -> Result<Vec<Row>, EngineError> {
            let row = json!({"orders_on_hold": 17});
            Ok(vec![row.as_object().unwrap().clone()])
        }
    }

    fn mock_pipeline() -> QueryPipeline {
        let engine: Arc<dyn AnalyticsEngine> = Arc::new(CountingEngine);
        let config = LlmConfig {
            api_url: "http://localhost:8001".to_string(),
            mock_mode: true,
        };
        let client = Arc::new(NlSqlClient::new(&config, Arc::clone(&engine)).unwrap());
        QueryPipeline::new(engine, client)
    }

    #[tokio::test]
    async fn test_hold_question_end_to_end() {
        let pipeline = mock_pipeline();
        let processed = pipeline
            .process_natural_language_query("How many orders are on hold?", "")
            .await
            .unwrap();

        assert_eq!(processed.retry_count, 0);
        assert!(processed.conversion.nl.sql.contains("COUNT(*)"));
        assert!(processed.conversion.nl.sql.contains("hold_applied_flag = 1"));
        assert_eq!(processed.conversion.source, ConversionSource::MockTemplate);
        assert_eq!(processed.result.row_count, 1);
        assert_eq!(processed.result.columns, vec!["orders_on_hold"]);
    }

    #[tokio::test]
    async fn test_sql_carried_through_to_result() {
        let pipeline = mock_pipeline();
        let processed = pipeline
            .process_natural_language_query("show me recent orders", "")
            .await
            .unwrap();
        assert_eq!(processed.result.sql, processed.conversion.nl.sql);
    }
}
