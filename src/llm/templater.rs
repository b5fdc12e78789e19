//! Deterministic fallback for NL-to-SQL conversion.
//!
//! Maps a question to a canned SQL template by keyword matching against the
//! DC order dataset. Always answers; the worst case is the generic
//! recent-rows template. Used whenever the conversion service is unavailable
//! or mock mode is on.

use crate::llm::models::{ChartType, DisplayType, NlToSqlResult};
use regex::Regex;
use std::sync::LazyLock;

static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\b").unwrap());
static OVER_UNITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"over\s+(\d+)\s+units?").unwrap());

/// One routing rule: a predicate over the normalized question and a builder
/// for the matching template.
struct TemplateRule {
    name: &'static str,
    matches: fn(&str) -> bool,
    build: fn(&str) -> NlToSqlResult,
}

// Evaluated top to bottom, first match wins. Narrow rules must stay above
// broader ones: "orders over N units" has to beat the recent-orders rule,
// which would otherwise swallow every question containing "order".
static RULES: &[TemplateRule] = &[
    TemplateRule {
        name: "hold-count",
        matches: |q| (q.contains("how many") || q.contains("count")) && q.contains("hold"),
        build: hold_count,
    },
    TemplateRule {
        name: "top-customers",
        matches: |q| q.contains("top") && q.contains("customer"),
        build: top_customers,
    },
    TemplateRule {
        name: "routed-percentage",
        matches: |q| (q.contains("percentage") || q.contains('%')) && q.contains("rout"),
        build: routed_percentage,
    },
    TemplateRule {
        name: "big-lines",
        matches: |q| OVER_UNITS.is_match(q),
        build: big_lines,
    },
    TemplateRule {
        name: "backordered",
        matches: |q| q.contains("backorder"),
        build: backordered,
    },
    TemplateRule {
        name: "status-breakdown",
        matches: |q| q.contains("status"),
        build: status_breakdown,
    },
    TemplateRule {
        name: "units-by-dc",
        matches: |q| q.contains("by dc") || q.contains("per dc") || q.contains("each dc"),
        build: units_by_dc,
    },
    TemplateRule {
        name: "recent-trips",
        matches: |q| q.contains("trip") || q.contains("route"),
        build: recent_trips,
    },
    TemplateRule {
        name: "recent-orders",
        matches: |q| q.contains("order"),
        build: recent_orders,
    },
];

/// Translate a question into a canned SQL template. Pure and total: the same
/// question always yields the same result, and there is no failure path.
pub fn template(question: &str) -> NlToSqlResult {
    let q = question.to_lowercase();

    for rule in RULES {
        if (rule.matches)(&q) {
            tracing::debug!(rule = rule.name, "mock template matched");
            return (rule.build)(&q);
        }
    }

    default_template()
}

/// First integer embedded in the question, or `default` when there is none.
fn extract_number(question: &str, default: u32) -> u32 {
    FIRST_NUMBER
        .captures(question)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(default)
}

fn hold_count(_q: &str) -> NlToSqlResult {
    NlToSqlResult {
        sql: "SELECT COUNT(*) AS orders_on_hold FROM dc_order_lines WHERE hold_applied_flag = 1"
            .to_string(),
        confidence: 0.9,
        explanation: Some("Counts open order lines with an active hold applied.".to_string()),
        display_type: Some(DisplayType::Text),
        chart_type: None,
        usage: None,
    }
}

fn top_customers(q: &str) -> NlToSqlResult {
    let n = extract_number(q, 10);
    NlToSqlResult {
        sql: format!(
            "SELECT sold_to, SUM(ordered_quantity) AS total_units \
             FROM dc_order_lines GROUP BY sold_to ORDER BY total_units DESC LIMIT {n}"
        ),
        confidence: 0.85,
        explanation: Some(format!("Top {n} customers by total ordered units.")),
        display_type: Some(DisplayType::Chart),
        chart_type: Some(ChartType::Bar),
        usage: None,
    }
}

fn routed_percentage(_q: &str) -> NlToSqlResult {
    NlToSqlResult {
        sql: "SELECT ROUND(100.0 * SUM(CASE WHEN routed_flag = 1 THEN 1 ELSE 0 END) / COUNT(*), 1) \
              AS routed_pct FROM dc_order_lines"
            .to_string(),
        confidence: 0.85,
        explanation: Some("Share of order lines already sent to the routing system.".to_string()),
        display_type: Some(DisplayType::Text),
        chart_type: None,
        usage: None,
    }
}

fn big_lines(q: &str) -> NlToSqlResult {
    let n = OVER_UNITS
        .captures(q)
        .and_then(|c| c[1].parse::<u32>().ok())
        .unwrap_or(100);
    NlToSqlResult {
        sql: format!(
            "SELECT order_number, line_id, ordered_item, ordered_quantity, sold_to, dc \
             FROM dc_order_lines WHERE ordered_quantity > {n} ORDER BY ordered_quantity DESC"
        ),
        confidence: 0.8,
        explanation: Some(format!("Order lines with more than {n} units.")),
        display_type: Some(DisplayType::Table),
        chart_type: None,
        usage: None,
    }
}

fn backordered(_q: &str) -> NlToSqlResult {
    NlToSqlResult {
        sql: "SELECT order_number, line_id, ordered_item, ordered_quantity, sold_to, dc, \
              schedule_ship_date FROM dc_order_lines WHERE original_line_status = 'Backordered' \
              ORDER BY schedule_ship_date LIMIT 100"
            .to_string(),
        confidence: 0.85,
        explanation: Some("Backordered lines, earliest scheduled ship date first.".to_string()),
        display_type: Some(DisplayType::Table),
        chart_type: None,
        usage: None,
    }
}

fn status_breakdown(_q: &str) -> NlToSqlResult {
    NlToSqlResult {
        sql: "SELECT original_line_status AS status, COUNT(*) AS line_count \
              FROM dc_order_lines GROUP BY original_line_status ORDER BY line_count DESC"
            .to_string(),
        confidence: 0.8,
        explanation: Some("Order lines grouped by line status.".to_string()),
        display_type: Some(DisplayType::Chart),
        chart_type: Some(ChartType::Pie),
        usage: None,
    }
}

fn units_by_dc(_q: &str) -> NlToSqlResult {
    NlToSqlResult {
        sql: "SELECT dc, SUM(ordered_quantity) AS total_units \
              FROM dc_order_lines GROUP BY dc ORDER BY total_units DESC"
            .to_string(),
        confidence: 0.75,
        explanation: Some("Total ordered units per distribution center.".to_string()),
        display_type: Some(DisplayType::Chart),
        chart_type: Some(ChartType::Bar),
        usage: None,
    }
}

fn recent_trips(_q: &str) -> NlToSqlResult {
    NlToSqlResult {
        sql: "SELECT trip_id, route_date, origin_dc, stop_count, total_miles, status \
              FROM route_plans ORDER BY route_date DESC LIMIT 50"
            .to_string(),
        confidence: 0.7,
        explanation: Some("Most recent route plans.".to_string()),
        display_type: Some(DisplayType::Table),
        chart_type: None,
        usage: None,
    }
}

fn recent_orders(_q: &str) -> NlToSqlResult {
    NlToSqlResult {
        sql: "SELECT * FROM dc_order_lines ORDER BY ordered_date DESC LIMIT 50".to_string(),
        confidence: 0.7,
        explanation: Some("Most recently placed order lines.".to_string()),
        display_type: Some(DisplayType::Table),
        chart_type: None,
        usage: None,
    }
}

fn default_template() -> NlToSqlResult {
    NlToSqlResult {
        sql: "SELECT * FROM dc_order_lines ORDER BY ordered_date DESC LIMIT 20".to_string(),
        confidence: 0.6,
        explanation: Some(
            "Showing the most recent order lines. Try asking about holds, routing, \
             top customers, or a specific status."
                .to_string(),
        ),
        display_type: Some(DisplayType::Table),
        chart_type: None,
        usage: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_count_template() {
        let result = template("How many orders are on hold?");
        assert!(result.sql.contains("COUNT(*)"));
        assert!(result.sql.contains("hold_applied_flag = 1"));
        assert_eq!(result.display_type, Some(DisplayType::Text));
        assert!(result.confidence >= 0.9);
    }

    #[test]
    fn test_top_customers_extracts_limit() {
        let result = template("Show the top 5 customers");
        assert!(result.sql.ends_with("LIMIT 5"));
        assert_eq!(result.chart_type, Some(ChartType::Bar));
    }

    #[test]
    fn test_top_customers_default_limit() {
        let result = template("Who are our top customers?");
        assert!(result.sql.ends_with("LIMIT 10"));
    }

    #[test]
    fn test_routed_percentage() {
        let result = template("What percentage of orders are routed?");
        assert!(result.sql.contains("routed_flag = 1"));
        assert_eq!(result.display_type, Some(DisplayType::Text));
    }

    #[test]
    fn test_big_lines_beats_recent_orders() {
        // Contains "orders" but the narrower threshold rule must win
        let result = template("orders over 250 units");
        assert!(result.sql.contains("ordered_quantity > 250"));
        assert!(!result.sql.contains("ORDER BY ordered_date"));
    }

    #[test]
    fn test_status_breakdown_suggests_pie() {
        let result = template("break down lines by status");
        assert!(result.sql.contains("original_line_status"));
        assert_eq!(result.chart_type, Some(ChartType::Pie));
    }

    #[test]
    fn test_orders_catch_all() {
        let result = template("show me recent orders");
        assert!(result.sql.contains("ORDER BY ordered_date DESC"));
        assert_eq!(result.display_type, Some(DisplayType::Table));
    }

    #[test]
    fn test_default_template_invites_specificity() {
        let result = template("tell me something interesting");
        assert!((result.confidence - 0.6).abs() < f64::EPSILON);
        assert!(result.explanation.as_deref().unwrap().contains("specific")
            || result.explanation.as_deref().unwrap().contains("Try asking"));
    }

    #[test]
    fn test_templater_is_pure() {
        let a = template("Top 3 customers by units");
        let b = template("Top 3 customers by units");
        assert_eq!(a, b);
    }
}
