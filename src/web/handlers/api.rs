use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::schema_context::{self, SchemaDescription};
use crate::display::detector::{self, DetectionResult};
use crate::llm::models::{Conversion, SqlCorrection};
use crate::query::error::{ErrorKind, QueryError};
use crate::query::executor::{self, QueryResult};
use crate::web::state::AppState;

// Request/response types

#[derive(Debug, Deserialize)]
pub struct NlQueryRequest {
    pub question: String,
    #[serde(default)]
    pub context_info: String,
}

#[derive(Debug, Serialize)]
pub struct NlQueryResponse {
    pub conversion: Conversion,
    pub result: QueryResult,
    pub detection: DetectionResult,
    pub dual_view: bool,
    pub retry_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteQueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ExecuteQueryResponse {
    pub result: QueryResult,
    pub detection: DetectionResult,
    pub dual_view: bool,
}

#[derive(Debug, Deserialize)]
pub struct CorrectSqlRequest {
    pub original_query: String,
    pub error_message: String,
    pub error_type: String,
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub schema: SchemaDescription,
    pub prompt_text: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub table_count: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mock_mode: bool,
    pub version: String,
}

/// JSON-mapped query failure. The body carries the stable user-facing text
/// alongside the raw detail and remediation suggestions.
pub struct ApiError(pub QueryError);

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::SqlSyntax | ErrorKind::Execution => StatusCode::BAD_REQUEST,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::NoResults | ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.0.kind,
            "message": self.0.user_message(),
            "detail": self.0.message,
            "sql": self.0.sql,
            "suggestions": self.0.suggestions(),
        });
        (status_for(self.0.kind), Json(body)).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError(err)
    }
}

// API implementations

pub async fn nl_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NlQueryRequest>,
) -> Result<Json<NlQueryResponse>, ApiError> {
    info!("NL query: {}", payload.question);

    let processed = state
        .pipeline
        .process_natural_language_query(&payload.question, &payload.context_info)
        .await
        .map_err(|e| {
            error!("pipeline failed: {}", e);
            e
        })?;

    let detection = detector::detect(
        &processed.result,
        processed.conversion.nl.display_type,
        processed.conversion.nl.chart_type,
    );
    let dual_view = detector::should_show_dual_view(&processed.result);

    Ok(Json(NlQueryResponse {
        detection,
        dual_view,
        result: processed.result,
        conversion: processed.conversion,
        retry_count: processed.retry_count,
    }))
}

pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteQueryRequest>,
) -> Result<Json<ExecuteQueryResponse>, ApiError> {
    info!("Direct SQL query: {}", payload.query);

    let result = executor::execute(state.engine.as_ref(), &payload.query)
        .await
        .map_err(|e| {
            error!("query failed: {}", e);
            e
        })?;

    let detection = detector::detect(&result, None, None);
    let dual_view = detector::should_show_dual_view(&result);

    Ok(Json(ExecuteQueryResponse { detection, dual_view, result }))
}

pub async fn correct_sql(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CorrectSqlRequest>,
) -> Json<SqlCorrection> {
    let kind = ErrorKind::parse(&payload.error_type);
    let correction = state
        .client
        .correct_sql(&payload.original_query, &payload.error_message, kind)
        .await;
    Json(correction)
}

pub async fn get_schema(State(state): State<Arc<AppState>>) -> Json<SchemaResponse> {
    let schema = schema_context::build(state.engine.as_ref()).await;
    let prompt_text = schema.to_prompt_text();
    Json(SchemaResponse { schema, prompt_text })
}

pub async fn system_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SystemStatus>, (StatusCode, String)> {
    let now = chrono::Utc::now();
    let uptime = now.signed_duration_since(state.startup_time).num_seconds();

    let table_count = state.engine.list_tables().await.map_err(|e| {
        error!("failed to count tables: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
    })?;

    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        table_count: table_count.len(),
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mock_mode: state.client.mock_mode(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_map_to_expected_statuses() {
        assert_eq!(status_for(ErrorKind::SqlSyntax), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Execution), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(ErrorKind::Unknown), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
