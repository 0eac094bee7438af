//! One session on a memory database.

use std::collections::HashMap;

use spits_common::TableName;
use spits_sql::{Dialect, Query, Statement};
use tracing::{debug, warn};

use super::table::TableData;
use super::MemoryDatabase;
use crate::{Backend, QueryOutput, StorageError, StorageResult};

/// Where a table name resolves in this session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TableRef {
    name: String,
    temporary: bool,
}

/// A session on a [`MemoryDatabase`].
///
/// Temporary tables shadow permanent ones of the same name and disappear
/// with the session. Permanent DDL implicitly commits pending DML first;
/// temporary DDL does not.
#[derive(Debug)]
pub struct MemoryBackend {
    db: MemoryDatabase,
    session_id: u64,
    temporaries: HashMap<String, TableData>,
    /// Uncommitted snapshots of tables written in the current transaction.
    pending: HashMap<TableRef, TableData>,
}

impl MemoryBackend {
    pub(super) fn new(db: MemoryDatabase, session_id: u64) -> Self {
        Self {
            db,
            session_id,
            temporaries: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Returns this session's id.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Returns the database this session runs on.
    pub fn database(&self) -> &MemoryDatabase {
        &self.db
    }

    /// Returns true if this session holds a temporary table `name`.
    pub fn has_temporary(&self, name: &str) -> bool {
        self.temporaries.contains_key(name)
    }

    fn resolve(&self, name: &str) -> StorageResult<TableRef> {
        let temporary = if self.temporaries.contains_key(name) {
            true
        } else if self.db.catalog().read().table_exists(name) {
            false
        } else {
            return Err(StorageError::TableNotFound(name.to_string()));
        };
        Ok(TableRef {
            name: name.to_string(),
            temporary,
        })
    }

    /// Runs `f` against the session-visible version of a table.
    fn read<R>(
        &self,
        name: &str,
        f: impl FnOnce(&TableData) -> StorageResult<R>,
    ) -> StorageResult<R> {
        let table = self.resolve(name)?;
        if let Some(data) = self.pending.get(&table) {
            return f(data);
        }
        if table.temporary {
            let data = self
                .temporaries
                .get(name)
                .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
            return f(data);
        }
        let catalog = self.db.catalog().read();
        let data = catalog
            .get(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
        f(data)
    }

    /// Runs `f` against a private copy of a table and records the copy in
    /// the write set if `f` succeeds.
    fn write<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut TableData) -> StorageResult<R>,
    ) -> StorageResult<R> {
        let table = self.resolve(name)?;
        let mut work = match self.pending.get(&table) {
            Some(data) => data.clone(),
            None => self.read(name, |data| Ok(data.clone()))?,
        };
        let out = f(&mut work)?;
        self.pending.insert(table, work);
        Ok(out)
    }

    /// Publishes the write set.
    fn publish(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut catalog = self.db.catalog().write();
        for (table, data) in self.pending.drain() {
            let slot = if table.temporary {
                self.temporaries.get_mut(&table.name)
            } else {
                catalog.get_mut(&table.name)
            };
            match slot {
                Some(slot) => *slot = data,
                None => warn!(
                    session = self.session_id,
                    table = %table.name,
                    "table vanished before commit, discarding its writes"
                ),
            }
        }
    }

    fn create_table_like(&mut self, table: &TableName, like: &TableName) -> StorageResult<()> {
        self.publish();
        let data = self.read(like.as_str(), |src| Ok(src.like(table.as_str())))?;
        self.db.catalog().write().create_table(data)
    }

    fn copy_rows(&mut self, from: &TableName, into: &TableName) -> StorageResult<u64> {
        let rows = self.read(from.as_str(), |src| Ok(src.rows().to_vec()))?;
        self.write(into.as_str(), |dst| dst.append_rows(rows))
    }

    fn alter<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut TableData) -> StorageResult<R>,
    ) -> StorageResult<R> {
        self.publish();
        let table = self.resolve(name)?;
        if table.temporary {
            let data = self
                .temporaries
                .get_mut(name)
                .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
            return f(data);
        }
        let mut catalog = self.db.catalog().write();
        let data = catalog
            .get_mut(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
        f(data)
    }

    fn execute_query(&mut self, query: &Query) -> StorageResult<QueryOutput> {
        match query {
            Query::Select(q) => self
                .read(q.table.as_str(), |t| t.select(q))
                .map(QueryOutput::Rows),
            Query::Insert(q) => self
                .write(q.table.as_str(), |t| t.insert(q))
                .map(QueryOutput::Affected),
            Query::Update(q) => self
                .write(q.table.as_str(), |t| t.update(q))
                .map(QueryOutput::Affected),
            Query::Delete(q) => self
                .write(q.table.as_str(), |t| t.delete(q.filter.as_ref()))
                .map(QueryOutput::Affected),
            Query::CountRows(q) => self
                .read(q.table.as_str(), |t| t.count(q.filter.as_ref()))
                .map(QueryOutput::Count),
            Query::CountUniqueRows(q) => self
                .read(q.table.as_str(), |t| {
                    t.count_unique(&q.column, q.filter.as_ref())
                })
                .map(QueryOutput::Count),
            Query::DescribeTable(q) => self
                .read(q.table.as_str(), |t| Ok(t.describe()))
                .map(QueryOutput::Rows),
            Query::CreateTable(q) => {
                let data = TableData::from_create(q)?;
                if q.temporary {
                    if self.temporaries.contains_key(data.name()) {
                        return Err(StorageError::TableExists(data.name().to_string()));
                    }
                    self.temporaries.insert(data.name().to_string(), data);
                } else {
                    self.publish();
                    self.db.catalog().write().create_table(data)?;
                }
                Ok(QueryOutput::Ddl(format!("created table {}", q.table)))
            }
            Query::DropTable(q) => {
                let name = q.table.as_str();
                if q.temporary {
                    self.temporaries
                        .remove(name)
                        .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
                    self.pending.remove(&TableRef {
                        name: name.to_string(),
                        temporary: true,
                    });
                } else {
                    self.publish();
                    self.db.catalog().write().drop_table(name)?;
                }
                Ok(QueryOutput::Ddl(format!("dropped table {}", q.table)))
            }
            Query::ListTables => Ok(QueryOutput::Tables(self.db.list_tables())),
            Query::AddColumn(q) => {
                self.alter(q.table.as_str(), |t| t.add_column(q.column.clone()))?;
                Ok(QueryOutput::Ddl(format!("altered table {}", q.table)))
            }
            Query::DropColumn(q) => {
                self.alter(q.table.as_str(), |t| t.drop_column(&q.column))?;
                Ok(QueryOutput::Ddl(format!("altered table {}", q.table)))
            }
        }
    }
}

impl Backend for MemoryBackend {
    fn execute(&mut self, statement: &Statement) -> StorageResult<QueryOutput> {
        debug!(session = self.session_id, %statement, "memory execute");
        match statement {
            Statement::Query(q) => self.execute_query(q),
            Statement::CreateTableLike { table, like } => {
                self.create_table_like(table, like)?;
                Ok(QueryOutput::Ddl(format!("created table {}", table)))
            }
            Statement::CopyRows { from, into } => {
                self.copy_rows(from, into).map(QueryOutput::Affected)
            }
        }
    }

    fn commit(&mut self) -> StorageResult<()> {
        debug!(
            session = self.session_id,
            tables = self.pending.len(),
            "memory commit"
        );
        self.publish();
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        debug!(
            session = self.session_id,
            tables = self.pending.len(),
            "memory rollback"
        );
        self.pending.clear();
        Ok(())
    }

    fn table_exists(&mut self, table: &TableName) -> StorageResult<bool> {
        Ok(self.db.table_exists(table.as_str()))
    }

    fn list_tables(&mut self) -> StorageResult<Vec<String>> {
        Ok(self.db.list_tables())
    }

    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spits_sql::{
        ColumnDef, CountRows, CreateTable, DataType, DropTable, Insert, Select, Value,
    };

    fn name(s: &str) -> TableName {
        TableName::new(s).unwrap()
    }

    fn create(table: &str, temporary: bool) -> Statement {
        let mut q = CreateTable::new(name(table))
            .auto_increment("id")
            .column(ColumnDef::new("v", DataType::Int));
        if temporary {
            q = q.temporary();
        }
        Statement::Query(q.into())
    }

    fn insert(table: &str, v: i64) -> Statement {
        Statement::Query(Insert::new(name(table), ["v"]).values([v]).into())
    }

    fn count(backend: &mut MemoryBackend, table: &str) -> u64 {
        match backend
            .execute(&Statement::Query(CountRows::new(name(table)).into()))
            .unwrap()
        {
            QueryOutput::Count(n) => n,
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_dml_isolated_until_commit() {
        let db = MemoryDatabase::new();
        let mut a = db.session();
        let mut b = db.session();

        a.execute(&create("t", false)).unwrap();
        a.execute(&insert("t", 1)).unwrap();
        assert_eq!(count(&mut a, "t"), 1);
        assert_eq!(count(&mut b, "t"), 0);

        a.commit().unwrap();
        assert_eq!(count(&mut b, "t"), 1);
        assert_eq!(db.row_count("t"), Some(1));
    }

    #[test]
    fn test_rollback_discards_writes() {
        let db = MemoryDatabase::new();
        let mut s = db.session();
        s.execute(&create("t", false)).unwrap();
        s.execute(&insert("t", 1)).unwrap();
        s.rollback().unwrap();
        assert_eq!(count(&mut s, "t"), 0);
        // The table itself was auto-committed.
        assert!(db.table_exists("t"));
    }

    #[test]
    fn test_permanent_ddl_commits_pending_dml() {
        let db = MemoryDatabase::new();
        let mut s = db.session();
        s.execute(&create("t", false)).unwrap();
        s.execute(&insert("t", 1)).unwrap();
        s.execute(&create("u", false)).unwrap();
        s.rollback().unwrap();
        assert_eq!(db.row_count("t"), Some(1));
    }

    #[test]
    fn test_temporary_tables_are_private() {
        let db = MemoryDatabase::new();
        let mut a = db.session();
        let mut b = db.session();

        a.execute(&create("$temp$t", true)).unwrap();
        assert!(a.has_temporary("$temp$t"));
        assert!(!a.table_exists(&name("$temp$t")).unwrap());
        assert!(a.list_tables().unwrap().is_empty());
        assert!(b
            .execute(&Statement::Query(Select::new(name("$temp$t")).into()))
            .is_err());

        // Temporary DDL leaves the open transaction alone.
        a.execute(&create("t", false)).unwrap();
        a.execute(&insert("t", 7)).unwrap();
        a.execute(&create("$temp$u", true)).unwrap();
        a.rollback().unwrap();
        assert_eq!(count(&mut a, "t"), 0);
    }

    #[test]
    fn test_drop_temporary_requires_temporary() {
        let db = MemoryDatabase::new();
        let mut s = db.session();
        s.execute(&create("t", false)).unwrap();
        let drop_temp = Statement::Query(DropTable::temporary(name("t")).into());
        assert!(matches!(
            s.execute(&drop_temp),
            Err(StorageError::TableNotFound(_))
        ));
        assert!(db.table_exists("t"));
    }

    #[test]
    fn test_promote_temporary() {
        let db = MemoryDatabase::new();
        let mut s = db.session();
        s.execute(&create("$temp$t", true)).unwrap();
        s.execute(&insert("$temp$t", 1)).unwrap();
        s.execute(&insert("$temp$t", 2)).unwrap();

        s.commit().unwrap();
        s.execute(&Statement::CreateTableLike {
            table: name("t"),
            like: name("$temp$t"),
        })
        .unwrap();
        let copied = s
            .execute(&Statement::CopyRows {
                from: name("$temp$t"),
                into: name("t"),
            })
            .unwrap();
        assert_eq!(copied, QueryOutput::Affected(2));
        s.execute(&Statement::Query(DropTable::temporary(name("$temp$t")).into()))
            .unwrap();
        s.commit().unwrap();

        assert_eq!(db.row_count("t"), Some(2));
        assert!(!s.has_temporary("$temp$t"));

        // Keys continue after the copied ones.
        s.execute(&insert("t", 3)).unwrap();
        let rows = s
            .execute(&Statement::Query(Select::new(name("t")).columns(["id"]).into()))
            .unwrap();
        let ids: Vec<Value> = rows
            .rows()
            .unwrap()
            .rows
            .iter()
            .filter_map(|r| r.get(0).cloned())
            .collect();
        assert_eq!(ids, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_create_like_existing_fails() {
        let db = MemoryDatabase::new();
        let mut s = db.session();
        s.execute(&create("t", false)).unwrap();
        s.execute(&create("$temp$t", true)).unwrap();
        let err = s
            .execute(&Statement::CreateTableLike {
                table: name("t"),
                like: name("$temp$t"),
            })
            .unwrap_err();
        assert!(matches!(err, StorageError::TableExists(_)));
    }
}
