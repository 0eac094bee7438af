//! Row predicates (WHERE clauses).

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::render::{quote_ident, render_value, Dialect};
use crate::Value;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl CompareOp {
    /// Returns the negation of this operator.
    pub fn negate(&self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::NotEq,
            CompareOp::NotEq => CompareOp::Eq,
            CompareOp::Lt => CompareOp::GtEq,
            CompareOp::LtEq => CompareOp::Gt,
            CompareOp::Gt => CompareOp::LtEq,
            CompareOp::GtEq => CompareOp::Lt,
        }
    }

    fn matches(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "="),
            CompareOp::NotEq => write!(f, "<>"),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::LtEq => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::GtEq => write!(f, ">="),
        }
    }
}

/// A boolean condition over the columns of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    /// `column op value`
    Compare {
        /// Column name.
        column: String,
        /// Comparison operator.
        op: CompareOp,
        /// Literal operand.
        value: Value,
    },
    /// `column IS NULL`
    IsNull(String),
    /// `column IS NOT NULL`
    IsNotNull(String),
    /// Conjunction.
    And(Box<Predicate>, Box<Predicate>),
    /// Disjunction.
    Or(Box<Predicate>, Box<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Creates a comparison.
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    /// `column <> value`
    pub fn not_eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::NotEq, value)
    }

    /// `column < value`
    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    /// `column > value`
    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    /// `column IS NULL`
    pub fn is_null(column: impl Into<String>) -> Self {
        Predicate::IsNull(column.into())
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Predicate::IsNotNull(column.into())
    }

    /// Combines with another predicate using AND.
    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// Combines with another predicate using OR.
    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// Negates this predicate.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Returns every column the predicate references.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Compare { column, .. }
            | Predicate::IsNull(column)
            | Predicate::IsNotNull(column) => {
                if !out.contains(&column.as_str()) {
                    out.push(column);
                }
            }
            Predicate::And(l, r) | Predicate::Or(l, r) => {
                l.collect_columns(out);
                r.collect_columns(out);
            }
            Predicate::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Evaluates the predicate with SQL three-valued logic; rows for which
    /// the result is unknown do not match.
    ///
    /// `value_of` resolves a column name to its value in the current row.
    /// Unresolvable columns are treated as NULL.
    pub fn matches<'v, F>(&self, value_of: &F) -> bool
    where
        F: Fn(&str) -> Option<&'v Value>,
    {
        self.evaluate(value_of) == Some(true)
    }

    fn evaluate<'v, F>(&self, value_of: &F) -> Option<bool>
    where
        F: Fn(&str) -> Option<&'v Value>,
    {
        match self {
            Predicate::Compare { column, op, value } => {
                let left = value_of(column).filter(|v| !v.is_null())?;
                if value.is_null() {
                    return None;
                }
                Some(op.matches(left.cmp(value)))
            }
            Predicate::IsNull(column) => Some(value_of(column).map_or(true, Value::is_null)),
            Predicate::IsNotNull(column) => Some(value_of(column).map_or(false, |v| !v.is_null())),
            Predicate::And(l, r) => match (l.evaluate(value_of), r.evaluate(value_of)) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            },
            Predicate::Or(l, r) => match (l.evaluate(value_of), r.evaluate(value_of)) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
            Predicate::Not(inner) => inner.evaluate(value_of).map(|b| !b),
        }
    }

    /// Renders the predicate as statement text.
    pub fn render(&self, dialect: Dialect) -> String {
        match self {
            Predicate::Compare { column, op, value } => format!(
                "{} {} {}",
                quote_ident(dialect, column),
                op,
                render_value(dialect, value)
            ),
            Predicate::IsNull(column) => format!("{} IS NULL", quote_ident(dialect, column)),
            Predicate::IsNotNull(column) => {
                format!("{} IS NOT NULL", quote_ident(dialect, column))
            }
            Predicate::And(l, r) => format!("({} AND {})", l.render(dialect), r.render(dialect)),
            Predicate::Or(l, r) => format!("({} OR {})", l.render(dialect), r.render(dialect)),
            Predicate::Not(inner) => format!("NOT ({})", inner.render(dialect)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn row(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_compare_matches() {
        let r = row(&[("age", Value::Int(30)), ("name", Value::string("ann"))]);
        let lookup = |c: &str| r.get(c);

        assert!(Predicate::eq("age", 30).matches(&lookup));
        assert!(Predicate::gt("age", 18).matches(&lookup));
        assert!(!Predicate::lt("age", 18).matches(&lookup));
        assert!(Predicate::eq("age", 18).not().matches(&lookup));
        assert!(Predicate::eq("name", "ann")
            .and(Predicate::is_not_null("age"))
            .matches(&lookup));
    }

    #[test]
    fn test_null_is_unknown() {
        let r = row(&[("email", Value::Null)]);
        let lookup = |c: &str| r.get(c);

        assert!(!Predicate::eq("email", "x").matches(&lookup));
        // NOT (unknown) is still unknown.
        assert!(!Predicate::eq("email", "x").not().matches(&lookup));
        assert!(Predicate::is_null("email").matches(&lookup));
        assert!(Predicate::eq("email", "x")
            .or(Predicate::is_null("email"))
            .matches(&lookup));
        assert!(!Predicate::eq("email", Value::Null).matches(&lookup));
    }

    #[test]
    fn test_columns() {
        let p = Predicate::eq("a", 1)
            .and(Predicate::is_null("b"))
            .or(Predicate::gt("a", 3));
        assert_eq!(p.columns(), vec!["a", "b"]);
    }

    #[test]
    fn test_render() {
        let p = Predicate::eq("name", "O'Neil").and(Predicate::is_not_null("id"));
        assert_eq!(
            p.render(Dialect::MySql),
            "(`name` = 'O''Neil' AND `id` IS NOT NULL)"
        );
        assert_eq!(
            Predicate::compare("n", CompareOp::GtEq, 2).not().render(Dialect::Sqlite),
            "NOT (\"n\" >= 2)"
        );
    }

    #[test]
    fn test_negate() {
        for op in [CompareOp::Eq, CompareOp::Lt, CompareOp::GtEq] {
            assert_eq!(op.negate().negate(), op);
        }
    }
}
