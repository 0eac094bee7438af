//! Statements issued to a backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use spits_common::TableName;

use crate::render::{quote_ident, Dialect, RenderError, RenderResult};
use crate::Query;

/// A unit of work sent to a backend: either a caller query or one of the
/// internal steps used to promote a shadow table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    /// A caller query, possibly retargeted.
    Query(Query),
    /// `CREATE TABLE table LIKE like`: a permanent, empty table with the
    /// shape of `like`.
    CreateTableLike {
        /// New table.
        table: TableName,
        /// Table whose shape is copied.
        like: TableName,
    },
    /// `INSERT INTO into SELECT * FROM from`
    CopyRows {
        /// Source table.
        from: TableName,
        /// Destination table.
        into: TableName,
    },
}

impl Statement {
    /// Returns the wrapped query, if any.
    pub fn query(&self) -> Option<&Query> {
        match self {
            Statement::Query(q) => Some(q),
            _ => None,
        }
    }

    /// Renders the statement as text.
    ///
    /// SQLite has no `CREATE TABLE ... LIKE`; backends targeting it have to
    /// emulate the statement from catalog data.
    pub fn render(&self, dialect: Dialect) -> RenderResult<String> {
        match self {
            Statement::Query(q) => Ok(q.render(dialect)),
            Statement::CreateTableLike { table, like } => match dialect {
                Dialect::MySql => Ok(format!(
                    "CREATE TABLE {} LIKE {}",
                    quote_ident(dialect, table.as_str()),
                    quote_ident(dialect, like.as_str())
                )),
                Dialect::Sqlite => Err(RenderError::Unsupported {
                    dialect,
                    statement: "CREATE TABLE ... LIKE",
                }),
            },
            Statement::CopyRows { from, into } => Ok(format!(
                "INSERT INTO {} SELECT * FROM {}",
                quote_ident(dialect, into.as_str()),
                quote_ident(dialect, from.as_str())
            )),
        }
    }
}

impl From<Query> for Statement {
    fn from(q: Query) -> Self {
        Statement::Query(q)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render(Dialect::MySql) {
            Ok(sql) => f.write_str(&sql),
            Err(e) => write!(f, "<{}>", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> TableName {
        TableName::new(s).unwrap()
    }

    #[test]
    fn test_render_promotion_steps() {
        let like = Statement::CreateTableLike {
            table: name("t"),
            like: name("$temp$t"),
        };
        assert_eq!(
            like.render(Dialect::MySql).unwrap(),
            "CREATE TABLE `t` LIKE `$temp$t`"
        );
        assert!(matches!(
            like.render(Dialect::Sqlite),
            Err(RenderError::Unsupported { .. })
        ));

        let copy = Statement::CopyRows {
            from: name("$temp$t"),
            into: name("t"),
        };
        assert_eq!(
            copy.render(Dialect::Sqlite).unwrap(),
            "INSERT INTO \"t\" SELECT * FROM \"$temp$t\""
        );
    }

    #[test]
    fn test_query_statement() {
        let stmt = Statement::from(Query::ListTables);
        assert_eq!(stmt.query(), Some(&Query::ListTables));
        assert_eq!(stmt.to_string(), "SHOW TABLES");
    }
}
