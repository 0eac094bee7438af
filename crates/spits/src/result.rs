//! Uniform execution results.

use std::fmt;

use serde::Serialize;
use spits_common::SpitsError;
use spits_sql::{QueryKind, ResultSet};
use spits_storage::QueryOutput;

/// Tables touched by a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    /// Staged creates made permanent.
    pub promoted: Vec<String>,
    /// Permanent tables dropped.
    pub dropped: Vec<String>,
}

/// Data carried by an [`ExecutionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// Nothing to report.
    None,
    /// A status message.
    Message(String),
    /// Result rows.
    Rows(ResultSet),
    /// Affected or counted rows.
    Count(u64),
    /// Table names.
    Tables(Vec<String>),
    /// Outcome of a commit.
    Commit(CommitReport),
    /// Per-query results of a batch.
    Batch(Vec<ExecutionResult>),
    /// Description of a recoverable failure.
    Error(String),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::None => write!(f, "none"),
            Payload::Message(m) => write!(f, "{:?}", m),
            Payload::Rows(rs) => write!(f, "{} rows", rs.len()),
            Payload::Count(n) => write!(f, "{}", n),
            Payload::Tables(t) => write!(f, "{:?}", t),
            Payload::Commit(r) => write!(f, "promoted={:?} dropped={:?}", r.promoted, r.dropped),
            Payload::Batch(results) => write!(f, "{} results", results.len()),
            Payload::Error(e) => write!(f, "{:?}", e),
        }
    }
}

/// Outcome of one coordinator operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Result data, or the failure description.
    pub data: Payload,
}

impl ExecutionResult {
    /// A successful result.
    pub fn ok(data: Payload) -> Self {
        Self {
            success: true,
            data,
        }
    }

    /// A successful result carrying a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(Payload::Message(message.into()))
    }

    /// A failed result describing `err`.
    pub fn failure(err: &SpitsError) -> Self {
        Self {
            success: false,
            data: Payload::Error(err.to_string()),
        }
    }

    /// Returns true if the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the failure description.
    pub fn error(&self) -> Option<&str> {
        match &self.data {
            Payload::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the status message.
    pub fn message_text(&self) -> Option<&str> {
        match &self.data {
            Payload::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the table names of a listing.
    pub fn tables(&self) -> Option<&[String]> {
        match &self.data {
            Payload::Tables(t) => Some(t),
            _ => None,
        }
    }

    /// Returns result rows.
    pub fn rows(&self) -> Option<&ResultSet> {
        match &self.data {
            Payload::Rows(rs) => Some(rs),
            _ => None,
        }
    }

    /// Returns a count.
    pub fn count(&self) -> Option<u64> {
        match &self.data {
            Payload::Count(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns a commit report.
    pub fn commit_report(&self) -> Option<&CommitReport> {
        match &self.data {
            Payload::Commit(r) => Some(r),
            _ => None,
        }
    }

    /// Serializes the result to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "success={} data={}", self.success, self.data)
    }
}

/// Normalizes a raw backend outcome for a query of `kind`.
///
/// Count queries answered with a one-cell row set are reduced to the count,
/// and catalog listings answered with rows are reduced to the first column.
pub fn format_result(kind: QueryKind, output: QueryOutput) -> ExecutionResult {
    let data = match (kind, output) {
        (QueryKind::CountRows | QueryKind::CountUniqueRows, QueryOutput::Rows(rs)) => {
            match rs.scalar().and_then(|v| v.to_i64()) {
                Some(n) => Payload::Count(u64::try_from(n).unwrap_or_default()),
                None => Payload::Rows(rs),
            }
        }
        (QueryKind::ListTables, QueryOutput::Rows(rs)) => Payload::Tables(
            rs.rows
                .iter()
                .filter_map(|r| r.get(0).map(|v| v.to_string()))
                .collect(),
        ),
        (_, QueryOutput::Rows(rs)) => Payload::Rows(rs),
        (_, QueryOutput::Affected(n)) | (_, QueryOutput::Count(n)) => Payload::Count(n),
        (_, QueryOutput::Tables(t)) => Payload::Tables(t),
        (_, QueryOutput::Ddl(m)) => Payload::Message(m),
    };
    ExecutionResult::ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spits_sql::{Row, Value};

    #[test]
    fn test_format_counts() {
        let rs = ResultSet::new(vec!["COUNT(*)".into()], vec![Row::new(vec![Value::Int(3)])]);
        assert_eq!(
            format_result(QueryKind::CountRows, QueryOutput::Rows(rs)).count(),
            Some(3)
        );
        assert_eq!(
            format_result(QueryKind::Insert, QueryOutput::Affected(2)).count(),
            Some(2)
        );
    }

    #[test]
    fn test_format_listing_rows() {
        let rs = ResultSet::new(
            vec!["Tables_in_db".into()],
            vec![
                Row::new(vec![Value::string("a")]),
                Row::new(vec![Value::string("b")]),
            ],
        );
        let result = format_result(QueryKind::ListTables, QueryOutput::Rows(rs));
        assert_eq!(result.tables().unwrap(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_failure() {
        let err = SpitsError::NotLogicallyPresent {
            table: "t".into(),
        };
        let result = ExecutionResult::failure(&err);
        assert!(!result.is_success());
        assert_eq!(
            result.error(),
            Some("attempting to delete table 't' that doesn't logically exist")
        );
    }

    #[test]
    fn test_display_and_json() {
        let result = ExecutionResult::ok(Payload::Tables(vec!["users".into()]));
        assert_eq!(result.to_string(), "success=true data=[\"users\"]");

        let json = result.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"success":true,"data":{"type":"tables","value":["users"]}}"#
        );
        let none = ExecutionResult::ok(Payload::None).to_json().unwrap();
        assert_eq!(none, r#"{"success":true,"data":{"type":"none"}}"#);
    }
}
