//! SQLite engine.
//!
//! SQLite runs DDL inside transactions, unlike the servers this layer is
//! modelled on. Permanent schema statements commit any open transaction
//! first, run in autocommit mode and then open a new transaction, the same
//! implicit commit a server performs.
//!
//! Temporary tables are session-private and must not end the DML
//! transaction, so their DDL runs inside it. SQLite would undo that DDL on
//! `ROLLBACK`; the backend logs each temporary statement and replays the
//! log after rolling back, so rows roll back while the temp schema stays.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};
use spits_common::TableName;
use spits_sql::{quote_ident, Dialect, Query, ResultSet, Row, Statement, Value};
use tracing::debug;

use crate::{Backend, QueryOutput, StorageError, StorageResult};

const DIALECT: Dialect = Dialect::Sqlite;

/// A session on a SQLite database.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
    /// Temporary-table DDL issued since the last commit.
    temp_ddl: Vec<String>,
}

impl SqliteBackend {
    /// Opens a database file, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let conn = if path.as_os_str() == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wraps an open connection and starts its first transaction.
    pub fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch("BEGIN")?;
        Ok(Self {
            conn,
            temp_ddl: Vec::new(),
        })
    }

    /// Runs a schema statement outside the DML transaction.
    fn run_ddl(&mut self, sql: &str) -> StorageResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        self.temp_ddl.clear();
        let result = self.conn.execute_batch(sql);
        self.conn.execute_batch("BEGIN")?;
        result.map_err(StorageError::from)
    }

    /// Runs temporary-table DDL inside the open transaction.
    fn run_temp_ddl(&mut self, sql: &str) -> StorageResult<()> {
        self.conn.execute_batch(sql)?;
        self.temp_ddl.push(sql.to_string());
        Ok(())
    }

    fn query_rows(&self, sql: &str) -> StorageResult<ResultSet> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(to_value(row.get_ref(i)?));
            }
            out.push(Row::new(values));
        }
        Ok(ResultSet::new(columns, out))
    }

    fn query_count(&self, sql: &str) -> StorageResult<u64> {
        let n: i64 = self.conn.query_row(sql, [], |r| r.get(0))?;
        Ok(u64::try_from(n).unwrap_or_default())
    }

    fn describe(&self, table: &TableName) -> StorageResult<ResultSet> {
        let info = self.table_info(table)?;
        if info.is_empty() {
            return Err(StorageError::TableNotFound(table.to_string()));
        }
        let rows = info
            .into_iter()
            .map(|c| {
                Row::new(vec![
                    Value::string(c.name),
                    Value::string(c.data_type),
                    Value::string(if c.not_null { "NO" } else { "YES" }),
                    Value::string(if c.primary_key { "PRI" } else { "" }),
                    Value::string(""),
                ])
            })
            .collect();
        Ok(ResultSet::new(
            ["Field", "Type", "Null", "Key", "Extra"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows,
        ))
    }

    fn table_info(&self, table: &TableName) -> StorageResult<Vec<ColumnInfo>> {
        let sql = format!("PRAGMA table_info({})", quote_ident(DIALECT, table.as_str()));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |r| {
                Ok(ColumnInfo {
                    name: r.get(1)?,
                    data_type: r.get(2)?,
                    not_null: r.get::<_, i64>(3)? != 0,
                    primary_key: r.get::<_, i64>(5)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Returns the stored CREATE statement of a table, temporary or not.
    fn table_sql(&self, table: &TableName) -> StorageResult<Option<String>> {
        let sql = self
            .conn
            .query_row(
                "SELECT sql FROM sqlite_temp_master WHERE type = 'table' AND name = ?1 \
                 UNION ALL \
                 SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1 \
                 LIMIT 1",
                params![table.as_str()],
                |r| r.get::<_, Option<String>>(0),
            )
            .optional()?;
        match sql {
            Some(sql) => Ok(sql),
            None => Err(StorageError::TableNotFound(table.to_string())),
        }
    }

    /// Emulates `CREATE TABLE table LIKE like`.
    ///
    /// The stored definition of `like` is reused with the name swapped, so
    /// constraints carry over. Definitions written in another form fall
    /// back to a column-only copy built from `PRAGMA table_info`.
    fn create_table_like(&mut self, table: &TableName, like: &TableName) -> StorageResult<()> {
        let stored = self.table_sql(like)?;
        let prefix = format!("CREATE TABLE {}", quote_ident(DIALECT, like.as_str()));
        let ddl = match stored.as_deref().and_then(|s| s.strip_prefix(&prefix)) {
            Some(rest) => format!("CREATE TABLE {}{}", quote_ident(DIALECT, table.as_str()), rest),
            None => self.ddl_from_table_info(table, like)?,
        };
        debug!(sql = %ddl, "sqlite create like");
        self.run_ddl(&ddl)
    }

    fn ddl_from_table_info(&self, table: &TableName, like: &TableName) -> StorageResult<String> {
        let info = self.table_info(like)?;
        let mut defs: Vec<String> = info
            .iter()
            .map(|c| {
                let mut def = format!("{} {}", quote_ident(DIALECT, &c.name), c.data_type);
                if c.not_null {
                    def.push_str(" NOT NULL");
                }
                def
            })
            .collect();
        let keys: Vec<String> = info
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| quote_ident(DIALECT, &c.name))
            .collect();
        if !keys.is_empty() {
            defs.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }
        Ok(format!(
            "CREATE TABLE {} ({})",
            quote_ident(DIALECT, table.as_str()),
            defs.join(", ")
        ))
    }

    fn execute_query(&mut self, query: &Query) -> StorageResult<QueryOutput> {
        let sql = query.render(DIALECT);
        debug!(sql = %sql, "sqlite execute");
        match query {
            Query::Select(_) => self.query_rows(&sql).map(QueryOutput::Rows),
            Query::Insert(_) | Query::Update(_) | Query::Delete(_) => {
                let n = self.conn.execute(&sql, [])?;
                Ok(QueryOutput::Affected(n as u64))
            }
            Query::CountRows(_) | Query::CountUniqueRows(_) => {
                self.query_count(&sql).map(QueryOutput::Count)
            }
            Query::DescribeTable(q) => self.describe(&q.table).map(QueryOutput::Rows),
            Query::ListTables => self.list_tables().map(QueryOutput::Tables),
            Query::CreateTable(q) if q.temporary => {
                self.run_temp_ddl(&sql)?;
                Ok(QueryOutput::Ddl(sql))
            }
            Query::DropTable(q) if q.temporary => {
                self.run_temp_ddl(&sql)?;
                Ok(QueryOutput::Ddl(sql))
            }
            Query::CreateTable(_)
            | Query::DropTable(_)
            | Query::AddColumn(_)
            | Query::DropColumn(_) => {
                self.run_ddl(&sql)?;
                Ok(QueryOutput::Ddl(sql))
            }
        }
    }
}

struct ColumnInfo {
    name: String,
    data_type: String,
    not_null: bool,
    primary_key: bool,
}

fn to_value(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Double(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

impl Backend for SqliteBackend {
    fn execute(&mut self, statement: &Statement) -> StorageResult<QueryOutput> {
        match statement {
            Statement::Query(q) => self.execute_query(q),
            Statement::CreateTableLike { table, like } => {
                self.create_table_like(table, like)?;
                Ok(QueryOutput::Ddl(format!("created table {}", table)))
            }
            Statement::CopyRows { .. } => {
                let sql = statement.render(DIALECT)?;
                debug!(sql = %sql, "sqlite execute");
                let n = self.conn.execute(&sql, [])?;
                Ok(QueryOutput::Affected(n as u64))
            }
        }
    }

    fn commit(&mut self) -> StorageResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        self.temp_ddl.clear();
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        // Replay in autocommit mode so a later rollback keeps it too.
        let replay = std::mem::take(&mut self.temp_ddl);
        let mut result = Ok(());
        for sql in &replay {
            debug!(sql = %sql, "sqlite replay temporary ddl");
            if let Err(e) = self.conn.execute_batch(sql) {
                result = Err(StorageError::from(e));
                break;
            }
        }
        self.conn.execute_batch("BEGIN")?;
        result
    }

    fn table_exists(&mut self, table: &TableName) -> StorageResult<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table.as_str()],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    fn list_tables(&mut self) -> StorageResult<Vec<String>> {
        let rs = self.query_rows(&Query::ListTables.render(DIALECT))?;
        Ok(rs
            .rows
            .iter()
            .filter_map(|r| r.get(0).and_then(Value::as_str).map(String::from))
            .collect())
    }

    fn dialect(&self) -> Dialect {
        DIALECT
    }
}
