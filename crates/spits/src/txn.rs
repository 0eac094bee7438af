//! Commit and rollback of staged schema changes.
//!
//! Commit is not atomic across tables. The DML transaction is committed
//! first; then each staged table is applied and made durable on its own,
//! logging one line per table. A failure on one table does not stop the
//! others, and staging is cleared regardless.

use std::collections::BTreeSet;

use spits_common::{SpitsError, SpitsResult, TableName};
use spits_sql::{DropTable, Query, Statement};
use spits_storage::Backend;
use tracing::{info, warn};

use crate::coordinator::Coordinator;
use crate::naming::shadow_name;
use crate::result::{CommitReport, ExecutionResult, Payload};

impl<B: Backend> Coordinator<B> {
    /// Commits the DML transaction and applies staged creates and drops.
    ///
    /// Returns a [`CommitReport`] on success. If some table fails, the
    /// remaining tables are still applied and the result carries the first
    /// failure.
    pub fn commit(&mut self) -> SpitsResult<ExecutionResult> {
        self.check_consistency()?;
        let result = self.commit_staged();
        self.normalize("commit", result)
    }

    /// Rolls back the DML transaction and discards staged changes.
    pub fn rollback(&mut self) -> SpitsResult<ExecutionResult> {
        let result = self.rollback_staged();
        self.normalize("rollback", result)
    }

    /// Fails if any staged table disagrees with the backend catalog.
    fn check_consistency(&mut self) -> SpitsResult<()> {
        let tracked: BTreeSet<TableName> = self
            .staging
            .created()
            .union(self.staging.deleted())
            .cloned()
            .collect();
        for table in &tracked {
            self.table_state(table)?;
        }
        Ok(())
    }

    fn commit_staged(&mut self) -> SpitsResult<ExecutionResult> {
        let (created, deleted) = self.staging.take();

        if let Err(e) = self.backend.commit() {
            warn!(error = %e, "DML commit failed, discarding staged changes");
            for table in &created {
                self.discard_shadow(table);
            }
            return Err(e.into());
        }

        let mut report = CommitReport::default();
        let mut first_error: Option<SpitsError> = None;

        for table in &created {
            let replace = deleted.contains(table);
            if let Err(e) = self.apply_create(table, replace, &mut report) {
                warn!(table = %table, error = %e, "promotion failed");
                self.discard_shadow(table);
                first_error.get_or_insert(SpitsError::PartialCommit {
                    table: table.to_string(),
                    message: e.to_string(),
                });
            }
        }

        for table in deleted.difference(&created) {
            match self.drop_permanent(table) {
                Ok(()) => report.dropped.push(table.to_string()),
                Err(e) => {
                    warn!(table = %table, error = %e, "drop failed");
                    first_error.get_or_insert(SpitsError::PartialCommit {
                        table: table.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            promoted = ?report.promoted,
            dropped = ?report.dropped,
            failed = first_error.is_some(),
            "commit finished"
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(ExecutionResult::ok(Payload::Commit(report))),
        }
    }

    /// Promotes one staged create, dropping the permanent table it replaces
    /// first.
    fn apply_create(
        &mut self,
        table: &TableName,
        replace: bool,
        report: &mut CommitReport,
    ) -> SpitsResult<()> {
        if replace {
            self.drop_permanent(table)?;
            report.dropped.push(table.to_string());
        }

        let shadow = shadow_name(table)?;
        self.run(&Statement::CreateTableLike {
            table: table.clone(),
            like: shadow.clone(),
        })?;
        self.run(&Statement::CopyRows {
            from: shadow.clone(),
            into: table.clone(),
        })?;
        self.backend.commit()?;
        self.run(&Statement::Query(DropTable::temporary(shadow).into()))?;

        info!(table = %table, replaced = replace, "promoted table");
        report.promoted.push(table.to_string());
        Ok(())
    }

    fn drop_permanent(&mut self, table: &TableName) -> SpitsResult<()> {
        self.run(&Statement::Query(Query::from(DropTable::new(table.clone()))))?;
        info!(table = %table, "dropped table");
        Ok(())
    }

    /// Drops a shadow table, logging instead of failing.
    fn discard_shadow(&mut self, table: &TableName) {
        if let Err(e) = self.drop_shadow(table) {
            warn!(table = %table, error = %e, "could not drop shadow table");
        }
    }

    fn drop_shadow(&mut self, table: &TableName) -> SpitsResult<()> {
        let shadow = shadow_name(table)?;
        self.run(&Statement::Query(DropTable::temporary(shadow).into()))?;
        Ok(())
    }

    /// Rolls back without normalizing the outcome.
    pub(crate) fn rollback_staged(&mut self) -> SpitsResult<ExecutionResult> {
        let (created, deleted) = self.staging.take();
        let mut first_error: Option<SpitsError> = self.backend.rollback().err().map(Into::into);

        for table in &created {
            if let Err(e) = self.drop_shadow(table) {
                warn!(table = %table, error = %e, "could not drop shadow table");
                first_error.get_or_insert(e);
            }
        }

        info!(
            creates = created.len(),
            deletes = deleted.len(),
            "rolled back staged changes"
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(ExecutionResult::message("rolled back")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spits_sql::{ColumnDef, CreateTable, DataType, Dialect, Insert};
    use spits_storage::{MemoryBackend, MemoryDatabase, QueryOutput, StorageError, StorageResult};

    /// Memory session that refuses to promote one table.
    struct FailingPromotion {
        inner: MemoryBackend,
        fail_on: TableName,
    }

    impl Backend for FailingPromotion {
        fn execute(&mut self, statement: &Statement) -> StorageResult<QueryOutput> {
            if let Statement::CreateTableLike { table, .. } = statement {
                if *table == self.fail_on {
                    return Err(StorageError::Internal("disk full".into()));
                }
            }
            self.inner.execute(statement)
        }

        fn commit(&mut self) -> StorageResult<()> {
            self.inner.commit()
        }

        fn rollback(&mut self) -> StorageResult<()> {
            self.inner.rollback()
        }

        fn table_exists(&mut self, table: &TableName) -> StorageResult<bool> {
            self.inner.table_exists(table)
        }

        fn list_tables(&mut self) -> StorageResult<Vec<String>> {
            self.inner.list_tables()
        }

        fn dialect(&self) -> Dialect {
            self.inner.dialect()
        }
    }

    fn name(s: &str) -> TableName {
        TableName::new(s).unwrap()
    }

    fn create(table: &str) -> Query {
        CreateTable::new(name(table))
            .auto_increment("id")
            .column(ColumnDef::new("v", DataType::Int))
            .into()
    }

    fn insert(table: &str, v: i64) -> Query {
        Insert::new(name(table), ["v"]).values([v]).into()
    }

    fn setup() -> (MemoryDatabase, Coordinator<MemoryBackend>) {
        let db = MemoryDatabase::new();
        let c = Coordinator::new(db.session());
        (db, c)
    }

    #[test]
    fn test_commit_promotes() {
        let (db, mut c) = setup();
        c.execute(&create("t")).unwrap();
        c.execute(&insert("t", 7)).unwrap();

        let result = c.commit().unwrap();
        let report = result.commit_report().unwrap();
        assert_eq!(report.promoted, vec!["t".to_string()]);
        assert!(report.dropped.is_empty());

        assert!(db.table_exists("t"));
        assert_eq!(db.row_count("t"), Some(1));
        assert!(!c.backend().has_temporary("$temp$t"));
        assert!(!c.has_pending_changes());
    }

    #[test]
    fn test_commit_drops_soft_deleted() {
        let (db, mut c) = setup();
        c.execute(&create("t")).unwrap();
        c.commit().unwrap();
        c.execute(&DropTable::new(name("t")).into()).unwrap();
        assert!(db.table_exists("t"));

        let result = c.commit().unwrap();
        assert_eq!(result.commit_report().unwrap().dropped, vec!["t".to_string()]);
        assert!(!db.table_exists("t"));
    }

    #[test]
    fn test_commit_replaces_recreated() {
        let (db, mut c) = setup();
        c.execute(&create("t")).unwrap();
        c.execute(&insert("t", 1)).unwrap();
        c.execute(&insert("t", 2)).unwrap();
        c.commit().unwrap();

        c.execute(&DropTable::new(name("t")).into()).unwrap();
        c.execute(&create("t")).unwrap();
        c.execute(&insert("t", 3)).unwrap();

        let result = c.commit().unwrap();
        let report = result.commit_report().unwrap();
        assert_eq!(report.promoted, vec!["t".to_string()]);
        assert_eq!(report.dropped, vec!["t".to_string()]);
        assert_eq!(db.row_count("t"), Some(1));
    }

    #[test]
    fn test_commit_keeps_committed_dml() {
        let (db, mut c) = setup();
        c.execute(&create("t")).unwrap();
        c.commit().unwrap();

        c.execute(&insert("t", 1)).unwrap();
        assert_eq!(db.row_count("t"), Some(0));
        c.commit().unwrap();
        assert_eq!(db.row_count("t"), Some(1));
    }

    #[test]
    fn test_commit_refuses_diverged_staging() {
        let (db, mut c) = setup();
        c.execute(&create("a")).unwrap();
        c.execute(&create("b")).unwrap();

        // Another session takes the name "a" before we commit.
        let mut other = Coordinator::new(db.session());
        other.execute(&create("a")).unwrap();
        other.commit().unwrap();

        // Staging now disagrees with the catalog for "a".
        assert!(matches!(
            c.commit(),
            Err(SpitsError::InconsistentState { .. })
        ));
        assert!(c.has_pending_changes());

        let result = c.rollback().unwrap();
        assert!(result.is_success());
        assert!(!c.has_pending_changes());
        assert!(!db.table_exists("b"));
    }

    #[test]
    fn test_partial_commit_applies_remaining_tables() {
        let db = MemoryDatabase::new();
        let mut c = Coordinator::new(FailingPromotion {
            inner: db.session(),
            fail_on: name("a"),
        });
        c.execute(&create("a")).unwrap();
        c.execute(&create("b")).unwrap();
        c.execute(&insert("a", 1)).unwrap();
        c.execute(&insert("b", 2)).unwrap();

        let result = c.commit().unwrap();
        assert!(!result.is_success());
        let error = result.error().unwrap();
        assert!(
            error.contains("commit partially applied, first failure on 'a'"),
            "{}",
            error
        );
        assert!(error.contains("disk full"));

        // Staging is cleared and the other table was still promoted.
        assert!(!c.has_pending_changes());
        assert!(!db.table_exists("a"));
        assert!(db.table_exists("b"));
        assert_eq!(db.row_count("b"), Some(1));
        assert!(!c.backend.inner.has_temporary("$temp$a"));
        assert!(!c.backend.inner.has_temporary("$temp$b"));
    }

    #[test]
    fn test_rollback_discards() {
        let (db, mut c) = setup();
        c.execute(&create("kept")).unwrap();
        c.commit().unwrap();

        c.execute(&create("t")).unwrap();
        c.execute(&DropTable::new(name("kept")).into()).unwrap();
        assert!(!c.execute(&insert("kept", 1)).unwrap().is_success());

        let result = c.rollback().unwrap();
        assert_eq!(result.message_text(), Some("rolled back"));
        assert!(!c.backend().has_temporary("$temp$t"));
        assert!(!db.table_exists("t"));
        assert!(db.table_exists("kept"));
        assert!(!c.has_pending_changes());
    }

    #[test]
    fn test_rollback_discards_dml() {
        let (db, mut c) = setup();
        c.execute(&create("t")).unwrap();
        c.commit().unwrap();

        c.execute(&insert("t", 1)).unwrap();
        c.rollback().unwrap();
        assert_eq!(db.row_count("t"), Some(0));
    }
}
