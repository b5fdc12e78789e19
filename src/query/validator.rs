//! Pattern-based SQL safety gate.
//!
//! This is a conservative shape check, not a parser. It is one layer of
//! defense; the engine connection itself must stay read-only for anything
//! this misses.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Verdict of [`validate`]. Pure and stateless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self { valid: true, error: None }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self { valid: false, error: Some(reason.into()) }
    }
}

// Security-relevant configuration: reviewed as such, do not extend casually.
const DENYLIST: &[(&str, &str)] = &[
    (r"(?i)\bDROP\b", "DROP statement"),
    (r"(?i)\bDELETE\b", "DELETE statement"),
    (r"(?i)\bTRUNCATE\b", "TRUNCATE statement"),
    (r"(?i)\bINSERT\b", "INSERT statement"),
    (r"(?i)\bUPDATE\b", "UPDATE statement"),
    (r"(?i)\bALTER\b", "ALTER statement"),
    (r"(?i)\bCREATE\b", "CREATE statement"),
    (r"(?i)\bGRANT\b", "GRANT statement"),
    (r"(?i)\bREVOKE\b", "REVOKE statement"),
    (r";\s*--", "comment injection"),
    (r"(?i)\bUNION\s+SELECT\b", "UNION-based injection"),
];

static DENYLIST_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    DENYLIST
        .iter()
        .map(|(pattern, label)| (Regex::new(pattern).unwrap(), *label))
        .collect()
});

/// Check a SQL candidate against the denylist, then require the statement to
/// read as a query (`SELECT` or a `WITH` common-table-expression entry).
pub fn validate(sql: &str) -> ValidationResult {
    for (pattern, label) in DENYLIST_PATTERNS.iter() {
        if pattern.is_match(sql) {
            return ValidationResult::rejected(format!("Query contains disallowed {label}"));
        }
    }

    let normalized = sql.trim().to_uppercase();
    if !normalized.starts_with("SELECT") && !normalized.starts_with("WITH") {
        return ValidationResult::rejected("Only SELECT queries are allowed");
    }

    ValidationResult::ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_select_is_valid() {
        assert!(validate("SELECT 1").valid);
    }

    #[test]
    fn test_cte_is_valid() {
        let sql = "WITH held AS (SELECT * FROM dc_order_lines WHERE hold_applied_flag = 1) \
                   SELECT COUNT(*) FROM held";
        assert!(validate(sql).valid);
    }

    #[test]
    fn test_denylisted_keywords_rejected_case_insensitive() {
        let statements = [
            "DROP TABLE x",
            "drop table x",
            "delete from dc_order_lines",
            "TRUNCATE dc_order_lines",
            "insert into t values (1)",
            "UPDATE t SET a = 1",
            "alter table t add column c int",
            "CREATE TABLE t (a int)",
            "GRANT ALL ON t TO public",
            "revoke all on t from public",
        ];
        for sql in statements {
            let verdict = validate(sql);
            assert!(!verdict.valid, "expected rejection for: {sql}");
            assert!(verdict.error.is_some());
        }
    }

    #[test]
    fn test_denylist_inside_select_rejected() {
        assert!(!validate("SELECT 1; DROP TABLE dc_order_lines").valid);
    }

    #[test]
    fn test_comment_injection_rejected() {
        assert!(!validate("select * from t; -- comment").valid);
    }

    #[test]
    fn test_union_injection_rejected() {
        assert!(!validate("SELECT a FROM t UNION SELECT password FROM users").valid);
    }

    #[test]
    fn test_word_boundary_does_not_overmatch() {
        // "created_at"/"updated_at" contain denylisted keywords as substrings
        assert!(validate("SELECT created_at, updated_at FROM dc_order_lines").valid);
    }

    #[test]
    fn test_non_select_rejected_without_denylist_hit() {
        let verdict = validate("EXPLAIN SELECT 1");
        assert!(!verdict.valid);
        assert_eq!(verdict.error.as_deref(), Some("Only SELECT queries are allowed"));
    }

    #[test]
    fn test_leading_whitespace_is_trimmed() {
        assert!(validate("   \n  select * from route_plans").valid);
    }
}
