//! The coordinator: one session of staged schema changes over a backend.
//!
//! A [`Coordinator`] owns a backend session and the staging sets of that
//! session. Every public operation returns an [`ExecutionResult`]; only
//! caller-contract and consistency faults escape as `Err`.

use std::collections::BTreeSet;

use spits_common::{BackendConfig, SpitsConfig, SpitsError, SpitsResult, TableName};
use spits_sql::{Dialect, Query, Statement};
use spits_storage::{Backend, MemoryDatabase, QueryOutput, SqliteBackend};
use tracing::{debug, info, warn};

use crate::classifier::{classify, Policy, StagedAction};
use crate::result::{ExecutionResult, Payload};
use crate::staging::{Staging, TableState};

/// Builds the backend named by `config`.
///
/// A memory backend gets a fresh private database.
pub fn open_backend(config: &BackendConfig) -> SpitsResult<Box<dyn Backend>> {
    match config {
        BackendConfig::Memory => Ok(Box::new(MemoryDatabase::new().session())),
        BackendConfig::Sqlite { path } => Ok(Box::new(SqliteBackend::open(path)?)),
    }
}

/// Coordinates staged CREATE/DROP TABLE over one backend session.
///
/// Row-level statements run inside the backend's native transaction. Table
/// creation is staged into a session-scoped shadow table and table deletion
/// is deferred; both become permanent on [`commit`](Coordinator::commit) and
/// are discarded on [`rollback`](Coordinator::rollback).
///
/// # Example
///
/// ```
/// use spits::Coordinator;
/// use spits_common::TableName;
/// use spits_sql::{ColumnDef, CreateTable, DataType, Query};
/// use spits_storage::MemoryDatabase;
///
/// let db = MemoryDatabase::new();
/// let mut coordinator = Coordinator::new(db.session());
///
/// let users = TableName::new("users").unwrap();
/// let create = Query::from(
///     CreateTable::new(users).column(ColumnDef::new("name", DataType::Text)),
/// );
/// assert!(coordinator.execute(&create).unwrap().is_success());
/// assert!(!db.table_exists("users"));
///
/// coordinator.commit().unwrap();
/// assert!(db.table_exists("users"));
/// ```
pub struct Coordinator<B: Backend = Box<dyn Backend>> {
    pub(crate) backend: B,
    pub(crate) staging: Staging,
    dialect: Dialect,
    statement_logging: bool,
    rollback_on_drop: bool,
}

impl<B: Backend> Coordinator<B> {
    /// Creates a coordinator over `backend` with default settings.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, &SpitsConfig::default())
    }

    /// Creates a coordinator over `backend` using the settings of `config`.
    /// The backend section of `config` is ignored.
    pub fn with_config(backend: B, config: &SpitsConfig) -> Self {
        let dialect = config.dialect.unwrap_or_else(|| backend.dialect());
        Self {
            backend,
            staging: Staging::new(),
            dialect,
            statement_logging: config.statement_logging,
            rollback_on_drop: config.rollback_on_drop,
        }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the backend mutably. Statements issued through it bypass
    /// staging.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Dialect statements are rendered in for logging.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Executes `query` according to its classification.
    ///
    /// Fails with `Disallowed` for column alterations.
    pub fn execute(&mut self, query: &Query) -> SpitsResult<ExecutionResult> {
        let kind = query.kind();
        let policy = classify(kind);
        debug!(%kind, ?policy, "dispatch");
        match policy {
            Policy::PassThrough => self.pass_through(query),
            Policy::Staged(StagedAction::Create) => self.create_table(query),
            Policy::Staged(StagedAction::Drop) => self.drop_table(query),
            Policy::Staged(StagedAction::List) => self.list_tables(),
            Policy::Disallowed => {
                warn!(%kind, "rejected disallowed query");
                Err(SpitsError::Disallowed {
                    kind: kind.to_string(),
                })
            }
        }
    }

    /// Executes `queries` in order and commits.
    ///
    /// Stops at the first failed result or fault, rolls back, and returns
    /// that failure (or re-raises the fault). On success the payload holds
    /// one result per query.
    pub fn execute_many(&mut self, queries: &[Query]) -> SpitsResult<ExecutionResult> {
        let mut results = Vec::with_capacity(queries.len());
        for (index, query) in queries.iter().enumerate() {
            match self.execute(query) {
                Ok(result) if result.is_success() => results.push(result),
                Ok(result) => {
                    warn!(index, %result, "batch stopped, rolling back");
                    self.rollback()?;
                    return Ok(result);
                }
                Err(e) => {
                    warn!(index, error = %e, "batch aborted, rolling back");
                    if let Err(rollback_err) = self.rollback() {
                        warn!(error = %rollback_err, "rollback after batch fault failed");
                    }
                    return Err(e);
                }
            }
        }

        let committed = self.commit()?;
        if !committed.is_success() {
            return Ok(committed);
        }
        Ok(ExecutionResult::ok(Payload::Batch(results)))
    }

    /// Tables staged for creation.
    pub fn staged_creates(&self) -> &BTreeSet<TableName> {
        self.staging.created()
    }

    /// Tables staged for deletion.
    pub fn staged_deletes(&self) -> &BTreeSet<TableName> {
        self.staging.deleted()
    }

    /// Returns true if a commit or rollback has staged work to apply.
    pub fn has_pending_changes(&self) -> bool {
        !self.staging.is_empty()
    }

    /// Logical state of `table` in this session.
    pub fn table_state(&mut self, table: &TableName) -> SpitsResult<TableState> {
        let permanent = self.backend.table_exists(table)?;
        self.staging.state(table, permanent)
    }

    /// Folds recoverable errors into a failed result.
    pub(crate) fn normalize(
        &self,
        operation: &'static str,
        result: SpitsResult<ExecutionResult>,
    ) -> SpitsResult<ExecutionResult> {
        match result {
            Ok(result) => Ok(result),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(operation, error = %e, "operation failed");
                Ok(ExecutionResult::failure(&e))
            }
        }
    }

    /// Sends one statement to the backend.
    pub(crate) fn run(&mut self, statement: &Statement) -> SpitsResult<QueryOutput> {
        if self.statement_logging {
            match statement.render(self.dialect) {
                Ok(sql) => debug!(%sql, "backend statement"),
                Err(_) => debug!(?statement, "backend statement"),
            }
        }
        Ok(self.backend.execute(statement)?)
    }
}

impl<B: Backend> Drop for Coordinator<B> {
    fn drop(&mut self) {
        if !self.rollback_on_drop || self.staging.is_empty() {
            return;
        }
        info!(
            creates = self.staging.created().len(),
            deletes = self.staging.deleted().len(),
            "discarding staged changes on close"
        );
        if let Err(e) = self.rollback_staged() {
            warn!(error = %e, "rollback on close failed");
        }
    }
}

impl<B: Backend> std::fmt::Debug for Coordinator<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("staging", &self.staging)
            .field("dialect", &self.dialect)
            .field("statement_logging", &self.statement_logging)
            .field("rollback_on_drop", &self.rollback_on_drop)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Opens the configured backend and wraps it in a coordinator.
    pub fn from_config(config: &SpitsConfig) -> SpitsResult<Self> {
        config.validate()?;
        let backend = open_backend(&config.backend)?;
        Ok(Self::with_config(backend, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spits_sql::{AddColumn, ColumnDef, CreateTable, DataType, DropColumn, DropTable, Insert};
    use spits_storage::MemoryBackend;

    fn name(s: &str) -> TableName {
        TableName::new(s).unwrap()
    }

    fn create(table: &str) -> Query {
        CreateTable::new(name(table))
            .auto_increment("id")
            .column(ColumnDef::new("v", DataType::Int))
            .into()
    }

    fn coordinator() -> (MemoryDatabase, Coordinator<MemoryBackend>) {
        let db = MemoryDatabase::new();
        let coordinator = Coordinator::new(db.session());
        (db, coordinator)
    }

    #[test]
    fn test_disallowed_is_fatal() {
        let (_db, mut c) = coordinator();
        let add = Query::from(AddColumn {
            table: name("t"),
            column: ColumnDef::new("x", DataType::Int),
        });
        let drop = Query::from(DropColumn {
            table: name("t"),
            column: "x".into(),
        });
        assert!(matches!(c.execute(&add), Err(SpitsError::Disallowed { .. })));
        assert!(matches!(c.execute(&drop), Err(SpitsError::Disallowed { .. })));
    }

    #[test]
    fn test_execute_many_commits() {
        let (db, mut c) = coordinator();
        let insert = Query::from(Insert::new(name("t"), ["v"]).values([1]).values([2]));
        let result = c.execute_many(&[create("t"), insert]).unwrap();

        match &result.data {
            Payload::Batch(results) => assert_eq!(results.len(), 2),
            other => panic!("unexpected payload {:?}", other),
        }
        assert!(!c.has_pending_changes());
        assert_eq!(db.row_count("t"), Some(2));
    }

    #[test]
    fn test_execute_many_stops_on_failure() {
        let (db, mut c) = coordinator();
        let result = c
            .execute_many(&[create("t"), Query::from(DropTable::new(name("missing")))])
            .unwrap();

        assert!(!result.is_success());
        assert!(!c.has_pending_changes());
        assert!(!db.table_exists("t"));
    }

    #[test]
    fn test_execute_many_reraises_fault() {
        let (db, mut c) = coordinator();
        let add = Query::from(AddColumn {
            table: name("t"),
            column: ColumnDef::new("x", DataType::Int),
        });
        assert!(c.execute_many(&[create("t"), add]).is_err());
        assert!(!c.has_pending_changes());
        assert!(!db.table_exists("t"));
    }

    #[test]
    fn test_drop_rolls_back() {
        let db = MemoryDatabase::new();
        let session = db.session();
        {
            let mut c = Coordinator::new(session);
            c.execute(&create("t")).unwrap();
            assert!(c.backend().has_temporary("$temp$t"));
        }
        assert!(!db.table_exists("t"));
    }

    #[test]
    fn test_from_config() {
        let c = Coordinator::from_config(&SpitsConfig::default()).unwrap();
        assert_eq!(c.dialect(), Dialect::MySql);
        assert!(!c.has_pending_changes());

        let mut config = SpitsConfig::sqlite(":memory:");
        config.statement_logging = true;
        let c = Coordinator::from_config(&config).unwrap();
        assert_eq!(c.dialect(), Dialect::Sqlite);
    }
}
