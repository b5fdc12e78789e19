//! Client for the external NL-to-SQL conversion service.
//!
//! Every failure mode of the remote call degrades to the local templater,
//! so conversion itself never fails; the `Conversion` tag records which
//! stage actually produced the SQL.

use crate::config::{LlmConfig, CONVERSION_TIMEOUT};
use crate::db::engine::AnalyticsEngine;
use crate::db::schema_context;
use crate::llm::models::{
    ChartType, Conversion, ConversionSource, DisplayType, NlToSqlResult, SqlCorrection,
    TokenUsage,
};
use crate::llm::templater;
use crate::query::error::ErrorKind;
use crate::query::validator;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

static LIMIT_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blimit\s+(\d+)\s*;?\s*$").unwrap());

#[derive(Serialize)]
struct ConvertRequest<'a> {
    query: &'a str,
    schema_context: &'a str,
    context_info: &'a str,
}

#[derive(Deserialize)]
struct ConvertResponse {
    sql: String,
    confidence: f64,
    explanation: Option<String>,
    display_type: Option<DisplayType>,
    chart_type: Option<ChartType>,
    usage: Option<TokenUsage>,
}

#[derive(Serialize)]
struct CorrectRequest<'a> {
    original_query: &'a str,
    error_message: &'a str,
    error_type: &'a str,
    schema_context: &'a str,
}

#[derive(Deserialize)]
struct CorrectResponse {
    corrected_sql: String,
    confidence: f64,
}

pub struct NlSqlClient {
    http: reqwest::Client,
    api_url: String,
    mock_mode: bool,
    engine: Arc<dyn AnalyticsEngine>,
}

impl NlSqlClient {
    pub fn new(config: &LlmConfig, engine: Arc<dyn AnalyticsEngine>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(CONVERSION_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            mock_mode: config.mock_mode,
            engine,
        })
    }

    pub fn mock_mode(&self) -> bool {
        self.mock_mode
    }

    /// Converts a question into SQL. Total: the worst case is a canned
    /// template, never an error.
    pub async fn convert(&self, question: &str, context_info: &str) -> Conversion {
        if self.mock_mode {
            return Conversion {
                nl: templater::template(question),
                source: ConversionSource::MockTemplate,
            };
        }

        match self.convert_remote(question, context_info).await {
            Ok(nl) => Conversion { nl, source: ConversionSource::Service },
            Err(reason) => {
                warn!("conversion service unavailable, using mock template: {}", reason);
                Conversion {
                    nl: templater::template(question),
                    source: ConversionSource::MockTemplate,
                }
            }
        }
    }

    async fn convert_remote(
        &self,
        question: &str,
        context_info: &str,
    ) -> Result<NlToSqlResult, String> {
        let schema = schema_context::build(self.engine.as_ref()).await;
        let schema_text = schema.to_prompt_text();

        let request = ConvertRequest {
            query: question,
            schema_context: &schema_text,
            context_info,
        };

        let response = self
            .http
            .post(format!("{}/api/nl-to-sql", self.api_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("service responded with status {}", response.status()));
        }

        let body: ConvertResponse = response.json().await.map_err(|e| e.to_string())?;

        // Service SQL gets the same safety gate as anything else; a rejection
        // is a hard failure for this call, not a silent downgrade.
        let verdict = validator::validate(&body.sql);
        if !verdict.valid {
            return Err(format!(
                "service returned unsafe SQL ({})",
                verdict.error.unwrap_or_default()
            ));
        }

        debug!(confidence = body.confidence, "conversion service answered");
        Ok(NlToSqlResult {
            sql: body.sql,
            confidence: body.confidence.clamp(0.0, 1.0),
            explanation: body.explanation,
            display_type: body.display_type,
            chart_type: body.chart_type,
            usage: body.usage,
        })
    }

    /// One repair attempt for SQL that failed to execute. Never fails: the
    /// worst case returns the original SQL with confidence 0.
    pub async fn correct_sql(
        &self,
        original_sql: &str,
        error_message: &str,
        error_kind: ErrorKind,
    ) -> SqlCorrection {
        if self.mock_mode {
            return mock_correction(original_sql);
        }

        match self
            .correct_remote(original_sql, error_message, error_kind)
            .await
        {
            Ok(correction) => correction,
            Err(reason) => {
                warn!("SQL correction failed, keeping original: {}", reason);
                SqlCorrection {
                    corrected_sql: original_sql.to_string(),
                    confidence: 0.0,
                }
            }
        }
    }

    async fn correct_remote(
        &self,
        original_sql: &str,
        error_message: &str,
        error_kind: ErrorKind,
    ) -> Result<SqlCorrection, String> {
        let schema = schema_context::build(self.engine.as_ref()).await;
        let schema_text = schema.to_prompt_text();

        let request = CorrectRequest {
            original_query: original_sql,
            error_message,
            error_type: error_kind.as_str(),
            schema_context: &schema_text,
        };

        let response = self
            .http
            .post(format!("{}/api/correct-sql", self.api_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("service responded with status {}", response.status()));
        }

        let body: CorrectResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(SqlCorrection {
            corrected_sql: body.corrected_sql,
            confidence: body.confidence.clamp(0.0, 1.0),
        })
    }
}

/// Local repair used in mock mode: cap or add a LIMIT clause. Anything
/// smarter needs the service, so confidence stays low.
fn mock_correction(original_sql: &str) -> SqlCorrection {
    let trimmed = original_sql.trim().trim_end_matches(';').trim_end();

    let corrected = if let Some(caps) = LIMIT_CLAUSE.captures(trimmed) {
        let n: u64 = caps[1].parse().unwrap_or(100);
        let capped = n.min(100);
        LIMIT_CLAUSE
            .replace(trimmed, format!("LIMIT {capped}"))
            .into_owned()
    } else {
        format!("{trimmed} LIMIT 100")
    };

    SqlCorrection { corrected_sql: corrected, confidence: 0.3 }
}
