//! The backend boundary.

use spits_common::TableName;
use spits_sql::{Dialect, ResultSet, Statement};

use crate::StorageResult;

/// Raw outcome of one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutput {
    /// Result rows.
    Rows(ResultSet),
    /// Number of rows written.
    Affected(u64),
    /// A count result.
    Count(u64),
    /// Table names from a catalog listing.
    Tables(Vec<String>),
    /// Schema statement completed.
    Ddl(String),
}

impl QueryOutput {
    /// Returns the result rows, if any.
    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            QueryOutput::Rows(rs) => Some(rs),
            _ => None,
        }
    }

    /// Returns the table names, if this is a catalog listing.
    pub fn tables(&self) -> Option<&[String]> {
        match self {
            QueryOutput::Tables(t) => Some(t),
            _ => None,
        }
    }
}

/// One session against a relational store.
///
/// A backend owns a native DML transaction that is always open: statements
/// run inside it until [`commit`](Backend::commit) or
/// [`rollback`](Backend::rollback) ends it and a new one begins. Temporary
/// tables are scoped to the session and are never reported by the catalog
/// methods.
pub trait Backend: Send {
    /// Executes a statement in the current transaction.
    fn execute(&mut self, statement: &Statement) -> StorageResult<QueryOutput>;

    /// Commits the current DML transaction.
    fn commit(&mut self) -> StorageResult<()>;

    /// Rolls back the current DML transaction.
    fn rollback(&mut self) -> StorageResult<()>;

    /// Returns true if the permanent catalog holds `table`.
    fn table_exists(&mut self, table: &TableName) -> StorageResult<bool>;

    /// Lists the permanent catalog.
    fn list_tables(&mut self) -> StorageResult<Vec<String>>;

    /// Dialect statements are rendered in for this backend.
    fn dialect(&self) -> Dialect;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn execute(&mut self, statement: &Statement) -> StorageResult<QueryOutput> {
        (**self).execute(statement)
    }

    fn commit(&mut self) -> StorageResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> StorageResult<()> {
        (**self).rollback()
    }

    fn table_exists(&mut self, table: &TableName) -> StorageResult<bool> {
        (**self).table_exists(table)
    }

    fn list_tables(&mut self) -> StorageResult<Vec<String>> {
        (**self).list_tables()
    }

    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }
}
