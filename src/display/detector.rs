//! Chooses how a query result should be rendered.
//!
//! A fixed rule engine over the result's shape and content: no learning, no
//! persisted state, recomputed on every render. Column classification uses
//! fractions of non-null values rather than absolute counts so a few dirty
//! cells do not flip a column's class.

use crate::llm::models::{ChartType, DisplayType};
use crate::query::executor::QueryResult;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());

const AGGREGATION_KEYWORDS: &[&str] = &["count", "sum", "avg", "average", "total", "min", "max"];

/// The classifier's verdict plus its rationale.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    pub display_type: DisplayType,
    pub chart_type: Option<ChartType>,
    pub confidence: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnClass {
    Numeric,
    Date,
    Label,
}

fn non_null_values<'a>(result: &'a QueryResult, column: &str) -> Vec<&'a Value> {
    result
        .rows
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|v| !v.is_null())
        .collect()
}

fn is_numeric_value(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

fn is_date_value(value: &Value) -> bool {
    matches!(value, Value::String(s) if ISO_DATE.is_match(s))
}

/// A column is numeric if at least 80% of its non-null values parse as
/// numbers, else a date if at least 80% look ISO-date-like, else a label.
fn classify_column(values: &[&Value]) -> ColumnClass {
    if values.is_empty() {
        return ColumnClass::Label;
    }
    let total = values.len() as f64;
    let numeric = values.iter().filter(|v| is_numeric_value(v)).count() as f64;
    if numeric / total >= 0.8 {
        return ColumnClass::Numeric;
    }
    let dates = values.iter().filter(|v| is_date_value(v)).count() as f64;
    if dates / total >= 0.8 {
        return ColumnClass::Date;
    }
    ColumnClass::Label
}

fn column_classes(result: &QueryResult) -> Vec<(String, ColumnClass)> {
    result
        .columns
        .iter()
        .map(|name| {
            let values = non_null_values(result, name);
            (name.clone(), classify_column(&values))
        })
        .collect()
}

/// Heuristic 0-1 score of how much the result looks like grouped/aggregated
/// data. Rewards one-dimension-plus-measures shapes, penalizes wide detail
/// sets.
pub fn aggregation_score(result: &QueryResult) -> f64 {
    let classes = column_classes(result);
    let label_count = classes.iter().filter(|(_, c)| *c == ColumnClass::Label).count();
    let numeric_count = classes.iter().filter(|(_, c)| *c == ColumnClass::Numeric).count();

    let mut score: f64 = 0.0;

    if label_count == 1 && numeric_count >= 1 {
        score += 0.4;
    }

    let has_agg_name = result.columns.iter().any(|name| {
        let lower = name.to_lowercase();
        AGGREGATION_KEYWORDS.iter().any(|kw| lower.contains(kw))
    });
    if has_agg_name {
        score += 0.3;
    }

    if (2..=15).contains(&result.row_count) {
        score += 0.2;
    } else if (16..=30).contains(&result.row_count) {
        score += 0.1;
    }

    if result.columns.len() > 4 {
        score -= 0.2;
    }

    score.clamp(0.0, 1.0)
}

/// Picks a chart subtype from the result's column classes: time series get a
/// line, small all-positive single-measure sets a pie, multiple measures an
/// area, everything else a bar.
pub fn choose_chart_type(result: &QueryResult) -> ChartType {
    let classes = column_classes(result);

    if classes.iter().any(|(_, c)| *c == ColumnClass::Date) {
        return ChartType::Line;
    }

    let numeric_columns: Vec<&String> = classes
        .iter()
        .filter(|(_, c)| *c == ColumnClass::Numeric)
        .map(|(name, _)| name)
        .collect();

    if numeric_columns.len() == 1 && result.row_count <= 8 {
        let values: Vec<f64> = non_null_values(result, numeric_columns[0])
            .iter()
            .filter_map(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .collect();
        let sum: f64 = values.iter().sum();
        if values.iter().all(|v| *v >= 0.0) && sum > 0.0 {
            return ChartType::Pie;
        }
    }

    if numeric_columns.len() > 1 {
        return ChartType::Area;
    }

    ChartType::Bar
}

/// Decides the display mode for a result, honoring an upstream suggestion
/// when one exists. First applicable rule wins.
pub fn detect(
    result: &QueryResult,
    suggested_type: Option<DisplayType>,
    suggested_chart_type: Option<ChartType>,
) -> DetectionResult {
    if let Some(suggested) = suggested_type {
        if suggested != DisplayType::Error {
            let chart_type = match suggested {
                DisplayType::Chart => {
                    Some(suggested_chart_type.unwrap_or_else(|| choose_chart_type(result)))
                }
                _ => None,
            };
            return DetectionResult {
                display_type: suggested,
                chart_type,
                confidence: 0.9,
                reason: "Upstream display suggestion".to_string(),
            };
        }
    }

    if result.row_count == 0 {
        return DetectionResult {
            display_type: DisplayType::Text,
            chart_type: None,
            confidence: 1.0,
            reason: "No results".to_string(),
        };
    }

    if result.row_count == 1 && result.columns.len() == 1 {
        return DetectionResult {
            display_type: DisplayType::Text,
            chart_type: None,
            confidence: 0.9,
            reason: "Single scalar value".to_string(),
        };
    }

    if result.row_count == 1 && result.columns.len() <= 5 {
        return DetectionResult {
            display_type: DisplayType::Text,
            chart_type: None,
            confidence: 0.8,
            reason: "Single-entity detail".to_string(),
        };
    }

    let score = aggregation_score(result);
    if score > 0.7 && (2..=20).contains(&result.row_count) {
        return DetectionResult {
            display_type: DisplayType::Chart,
            chart_type: Some(choose_chart_type(result)),
            confidence: score,
            reason: format!("Aggregated shape (score {:.2})", score),
        };
    }

    if result.row_count > 1 {
        return DetectionResult {
            display_type: DisplayType::Table,
            chart_type: None,
            confidence: 0.85,
            reason: "Multi-row result".to_string(),
        };
    }

    DetectionResult {
        display_type: DisplayType::Table,
        chart_type: None,
        confidence: 0.7,
        reason: "Default".to_string(),
    }
}

/// True when the result suits both a table and a chart at once. Presentation
/// hint only.
pub fn should_show_dual_view(result: &QueryResult) -> bool {
    aggregation_score(result) > 0.5 && (3..=30).contains(&result.row_count)
}
