use serde::{Deserialize, Serialize};

/// How a query result should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayType {
    #[serde(alias = "TABLE")]
    Table,
    #[serde(alias = "CHART")]
    Chart,
    #[serde(alias = "TEXT")]
    Text,
    #[serde(alias = "ERROR")]
    Error,
}

/// Chart subtype when [`DisplayType::Chart`] is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[serde(alias = "BAR")]
    Bar,
    #[serde(alias = "LINE")]
    Line,
    #[serde(alias = "PIE")]
    Pie,
    #[serde(alias = "AREA")]
    Area,
}

/// Token accounting reported by the conversion service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

/// Outcome of translating one natural-language question into SQL.
/// Built once per question and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NlToSqlResult {
    pub sql: String,
    pub confidence: f64,
    pub explanation: Option<String>,
    pub display_type: Option<DisplayType>,
    pub chart_type: Option<ChartType>,
    pub usage: Option<TokenUsage>,
}

/// Where a conversion actually came from. The public contract hides the
/// fallback from end users, but callers and tests need to tell a real
/// service conversion apart from a canned template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSource {
    Service,
    MockTemplate,
}

/// A tagged conversion: the result plus which stage produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub nl: NlToSqlResult,
    pub source: ConversionSource,
}

/// Result of a single SQL repair pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlCorrection {
    pub corrected_sql: String,
    pub confidence: f64,
}
