//! Query failure taxonomy with stable user-facing text.
//!
//! The user message and remediation suggestions are fixed per kind and never
//! derived from the raw engine message, so UI copy stays stable even when
//! backend error strings change.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    SqlSyntax,
    Execution,
    /// Defined in the contract and consumed by presentation, but never
    /// raised by the executor: zero rows is a valid result.
    NoResults,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::SqlSyntax,
        ErrorKind::Execution,
        ErrorKind::NoResults,
        ErrorKind::Timeout,
        ErrorKind::Unknown,
    ];

    /// Inverse of [`ErrorKind::as_str`]; anything unrecognized is `Unknown`.
    pub fn parse(s: &str) -> ErrorKind {
        match s {
            "sql-syntax" => ErrorKind::SqlSyntax,
            "execution" => ErrorKind::Execution,
            "no-results" => ErrorKind::NoResults,
            "timeout" => ErrorKind::Timeout,
            _ => ErrorKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SqlSyntax => "sql-syntax",
            ErrorKind::Execution => "execution",
            ErrorKind::NoResults => "no-results",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::SqlSyntax => "The generated query was not valid SQL.",
            ErrorKind::Execution => "The query could not be executed against the dataset.",
            ErrorKind::NoResults => "The query ran but returned no matching data.",
            ErrorKind::Timeout => "The request took too long and was cancelled.",
            ErrorKind::Unknown => "Something went wrong while answering the question.",
        }
    }

    pub fn suggestions(&self) -> &'static [&'static str] {
        match self {
            ErrorKind::SqlSyntax => &[
                "Rephrase the question in simpler terms",
                "Name the table or column you are interested in",
                "Ask for one thing at a time",
            ],
            ErrorKind::Execution => &[
                "Check that the mentioned columns exist in the schema",
                "Narrow the date range or add a filter",
                "Try the question again in a moment",
            ],
            ErrorKind::NoResults => &[
                "Widen the date range",
                "Remove or relax a filter",
                "Check spelling of names and codes",
            ],
            ErrorKind::Timeout => &[
                "Ask for a smaller slice of the data",
                "Add a date range to limit the scan",
                "Retry the question",
            ],
            ErrorKind::Unknown => &[
                "Retry the question",
                "Rephrase the question",
            ],
        }
    }
}

/// Terminal failure of a single execute call.
#[derive(Debug, Clone, Serialize)]
pub struct QueryError {
    pub kind: ErrorKind,
    /// Raw underlying message, kept for logs and diagnostics only.
    pub message: String,
    /// The SQL that failed.
    pub sql: String,
}

impl QueryError {
    pub fn sql_syntax(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self { kind: ErrorKind::SqlSyntax, message: message.into(), sql: sql.into() }
    }

    pub fn execution(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Execution, message: message.into(), sql: sql.into() }
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }

    pub fn suggestions(&self) -> &'static [&'static str] {
        self.kind.suggestions()
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for QueryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestions_non_empty_for_every_kind() {
        for kind in ErrorKind::ALL {
            assert!(!kind.suggestions().is_empty(), "no suggestions for {}", kind.as_str());
            // Deterministic: same kind, same list
            assert_eq!(kind.suggestions(), kind.suggestions());
        }
    }

    #[test]
    fn test_user_message_independent_of_raw_message() {
        let a = QueryError::execution("Binder Error: column foo not found", "SELECT foo FROM t");
        let b = QueryError::execution("IO Error: disk full", "SELECT 1");
        assert_eq!(a.user_message(), b.user_message());
    }

    #[test]
    fn test_parse_round_trips_every_kind() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::parse(kind.as_str()), kind);
        }
        assert_eq!(ErrorKind::parse("something else"), ErrorKind::Unknown);
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ErrorKind::SqlSyntax).unwrap();
        assert_eq!(json, "\"sql-syntax\"");
    }

    #[test]
    fn test_display_carries_kind_and_raw_message() {
        let err = QueryError::sql_syntax("Only SELECT queries are allowed", "DROP TABLE x");
        let text = err.to_string();
        assert!(text.contains("sql-syntax"));
        assert!(text.contains("Only SELECT"));
    }
}
