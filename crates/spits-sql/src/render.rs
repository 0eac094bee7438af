//! Dialect-aware statement text.
//!
//! Identifiers are always quoted and literals always escaped, so nothing a
//! caller supplies is spliced into statement text verbatim.

use std::fmt::Write;

use spits_common::{DialectName, TableName};
use thiserror::Error;

use crate::Value;

/// Statement-text dialect.
pub type Dialect = DialectName;

/// Result type for rendering.
pub type RenderResult<T> = Result<T, RenderError>;

/// A statement the target dialect cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The dialect has no syntax for this statement.
    #[error("{dialect:?} has no syntax for {statement}")]
    Unsupported {
        /// Target dialect.
        dialect: Dialect,
        /// Statement form that could not be rendered.
        statement: &'static str,
    },
}

/// Quotes an identifier for the given dialect.
///
/// ```
/// use spits_sql::{quote_ident, Dialect};
///
/// assert_eq!(quote_ident(Dialect::MySql, "users"), "`users`");
/// assert_eq!(quote_ident(Dialect::Sqlite, "we\"ird"), "\"we\"\"ird\"");
/// ```
pub fn quote_ident(dialect: Dialect, ident: &str) -> String {
    let quote = match dialect {
        Dialect::MySql => '`',
        Dialect::Sqlite => '"',
    };
    let mut out = String::with_capacity(ident.len() + 2);
    out.push(quote);
    for c in ident.chars() {
        if c == quote {
            out.push(quote);
        }
        out.push(c);
    }
    out.push(quote);
    out
}

/// Quotes a table reference. SQLite addresses temporary tables through the
/// `temp` schema.
pub(crate) fn quote_table(dialect: Dialect, table: &TableName, temporary: bool) -> String {
    match (dialect, temporary) {
        (Dialect::Sqlite, true) => format!("temp.{}", quote_ident(dialect, table.as_str())),
        _ => quote_ident(dialect, table.as_str()),
    }
}

/// Renders a literal value.
pub(crate) fn render_value(dialect: Dialect, value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Boolean(b) => match (dialect, b) {
            (Dialect::MySql, true) => "TRUE".to_string(),
            (Dialect::MySql, false) => "FALSE".to_string(),
            (Dialect::Sqlite, true) => "1".to_string(),
            (Dialect::Sqlite, false) => "0".to_string(),
        },
        Value::Int(i) => i.to_string(),
        // Non-finite doubles have no literal form in either dialect.
        Value::Double(f) if !f.is_finite() => "NULL".to_string(),
        Value::Double(f) => format!("{:?}", f),
        Value::String(s) => quote_string(dialect, s),
        Value::Bytes(bytes) => {
            let mut out = String::with_capacity(bytes.len() * 2 + 3);
            out.push_str("X'");
            for byte in bytes {
                let _ = write!(out, "{:02X}", byte);
            }
            out.push('\'');
            out
        }
    }
}

fn quote_string(dialect: Dialect, s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' if dialect == Dialect::MySql => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Joins rendered items with `", "`.
pub(crate) fn comma_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(item.as_ref());
    }
    out
}
