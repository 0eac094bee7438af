//! Staged actions: CREATE TABLE, DROP TABLE and catalog listing.

use spits_common::{SpitsError, SpitsResult};
use spits_sql::{CreateTable, DropTable, Query, QueryKind, Statement};
use spits_storage::Backend;
use tracing::{debug, info};

use crate::coordinator::Coordinator;
use crate::naming::shadow_name;
use crate::result::{format_result, ExecutionResult, Payload};
use crate::staging::TableState;

fn wrong_kind(expected: QueryKind, query: &Query) -> SpitsError {
    SpitsError::WrongQueryKind {
        expected: expected.to_string(),
        actual: query.kind().to_string(),
    }
}

impl<B: Backend> Coordinator<B> {
    /// Stages a table creation.
    ///
    /// The table is materialized at once as a session-scoped shadow table
    /// and stays invisible to other sessions until commit. Creating over a
    /// table soft-deleted in this session is allowed and replaces it on
    /// commit.
    pub fn create_table(&mut self, query: &Query) -> SpitsResult<ExecutionResult> {
        let create = match query {
            Query::CreateTable(create) => create,
            other => return Err(wrong_kind(QueryKind::CreateTable, other)),
        };
        let result = self.stage_create(create);
        self.normalize("create table", result)
    }

    /// Drops a table.
    ///
    /// A table created in this session is dropped immediately. A committed
    /// table is soft-deleted: hidden from this session and dropped on
    /// commit. Anything else is a failed result.
    pub fn drop_table(&mut self, query: &Query) -> SpitsResult<ExecutionResult> {
        let drop = match query {
            Query::DropTable(drop) => drop,
            other => return Err(wrong_kind(QueryKind::DropTable, other)),
        };
        let result = self.stage_drop(drop);
        self.normalize("drop table", result)
    }

    /// Lists the tables visible to this session.
    pub fn list_tables(&mut self) -> SpitsResult<ExecutionResult> {
        let result = self.visible_tables();
        self.normalize("list tables", result)
    }

    fn stage_create(&mut self, create: &CreateTable) -> SpitsResult<ExecutionResult> {
        let table = &create.table;
        let permanent = self.backend.table_exists(table)?;
        match self.staging.state(table, permanent)? {
            TableState::StagedCreate | TableState::StagedRecreate => {
                return Err(SpitsError::TableStaged {
                    table: table.to_string(),
                })
            }
            TableState::Committed => {
                return Err(SpitsError::TableExists {
                    table: table.to_string(),
                })
            }
            TableState::Absent | TableState::StagedDelete => {}
        }

        let shadow = CreateTable {
            table: shadow_name(table)?,
            temporary: true,
            ..create.clone()
        };
        debug!(table = %table, shadow = %shadow.table, "creating shadow table");
        let output = self.run(&Statement::Query(Query::CreateTable(shadow)))?;
        self.staging.stage_create(table.clone());
        info!(table = %table, replaces = permanent, "staged table creation");
        Ok(format_result(QueryKind::CreateTable, output))
    }

    fn stage_drop(&mut self, drop: &DropTable) -> SpitsResult<ExecutionResult> {
        let table = &drop.table;
        let permanent = self.backend.table_exists(table)?;
        match self.staging.state(table, permanent)? {
            TableState::StagedCreate | TableState::StagedRecreate => {
                let shadow = shadow_name(table)?;
                self.run(&Statement::Query(DropTable::temporary(shadow).into()))?;
                self.staging.unstage_create(table);
                info!(table = %table, "dropped uncommitted table");
                Ok(ExecutionResult::message(format!(
                    "uncommitted table dropped: {}",
                    table
                )))
            }
            TableState::Committed => {
                self.staging.stage_delete(table.clone());
                info!(table = %table, "soft-deleted table");
                Ok(ExecutionResult::message(format!(
                    "table soft-deleted: {}",
                    table
                )))
            }
            TableState::Absent | TableState::StagedDelete => Err(SpitsError::NotLogicallyPresent {
                table: table.to_string(),
            }),
        }
    }

    fn visible_tables(&mut self) -> SpitsResult<ExecutionResult> {
        let output = self.run(&Statement::Query(Query::ListTables))?;
        let permanent = match format_result(QueryKind::ListTables, output).data {
            Payload::Tables(tables) => tables,
            other => {
                return Err(SpitsError::internal(format!(
                    "catalog listing returned {}",
                    other
                )))
            }
        };
        Ok(ExecutionResult::ok(Payload::Tables(
            self.staging.visible(permanent),
        )))
    }
}
