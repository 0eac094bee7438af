//! Row-level statements.

use std::borrow::Cow;

use spits_common::{SpitsError, SpitsResult};
use spits_sql::{Query, Statement};
use spits_storage::Backend;
use tracing::debug;

use crate::classifier::{classify, Policy};
use crate::coordinator::Coordinator;
use crate::naming::shadow_name;
use crate::result::{format_result, ExecutionResult};
use crate::staging::TableState;

impl<B: Backend> Coordinator<B> {
    /// Runs a row-level query inside the backend's DML transaction.
    ///
    /// Queries against a table created in this session are retargeted at
    /// its shadow table; queries against a soft-deleted table fail without
    /// reaching the backend. A table dropped and then created again is
    /// listed as present, so its queries go to the new shadow table.
    pub fn pass_through(&mut self, query: &Query) -> SpitsResult<ExecutionResult> {
        let kind = query.kind();
        if classify(kind) != Policy::PassThrough {
            return Err(SpitsError::WrongQueryKind {
                expected: "row-level query".to_string(),
                actual: kind.to_string(),
            });
        }
        let result = self.run_pass_through(query);
        self.normalize("pass-through", result)
    }

    fn run_pass_through(&mut self, query: &Query) -> SpitsResult<ExecutionResult> {
        let target = self.retarget(query)?;
        let output = self.run(&Statement::Query(target.into_owned()))?;
        Ok(format_result(query.kind(), output))
    }

    /// Resolves the physical table a query has to run against.
    fn retarget<'q>(&mut self, query: &'q Query) -> SpitsResult<Cow<'q, Query>> {
        let table = match query.table_name() {
            Some(table) if self.staging.tracks(table) => table,
            _ => return Ok(Cow::Borrowed(query)),
        };

        let permanent = self.backend.table_exists(table)?;
        match self.staging.state(table, permanent)? {
            TableState::StagedDelete => Err(SpitsError::TableSoftDeleted {
                table: table.to_string(),
            }),
            // A recreate shadows the soft-delete.
            TableState::StagedCreate | TableState::StagedRecreate => {
                let shadow = shadow_name(table)?;
                debug!(table = %table, shadow = %shadow, "retargeting to shadow table");
                Ok(Cow::Owned(query.with_table_name(shadow)))
            }
            TableState::Absent | TableState::Committed => Ok(Cow::Borrowed(query)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spits_common::TableName;
    use spits_sql::{
        ColumnDef, CountRows, CreateTable, DataType, DescribeTable, DropTable, Insert, Predicate,
        Select, Update, Value,
    };
    use spits_storage::{MemoryBackend, MemoryDatabase};

    fn name(s: &str) -> TableName {
        TableName::new(s).unwrap()
    }

    fn setup() -> (MemoryDatabase, Coordinator<MemoryBackend>) {
        let db = MemoryDatabase::new();
        let mut c = Coordinator::new(db.session());
        let create = CreateTable::new(name("t"))
            .auto_increment("id")
            .column(ColumnDef::new("v", DataType::Int));
        c.create_table(&create.into()).unwrap();
        (db, c)
    }

    fn insert(values: &[i64]) -> Query {
        values
            .iter()
            .fold(Insert::new(name("t"), ["v"]), |q, v| q.values([*v]))
            .into()
    }

    #[test]
    fn test_rows_go_to_shadow() {
        let (db, mut c) = setup();
        let result = c.pass_through(&insert(&[1, 2, 3])).unwrap();
        assert_eq!(result.count(), Some(3));
        assert_eq!(db.row_count("t"), None);

        let count = c
            .pass_through(&CountRows::new(name("t")).into())
            .unwrap();
        assert_eq!(count.count(), Some(3));
    }

    #[test]
    fn test_select_and_update() {
        let (_db, mut c) = setup();
        c.pass_through(&insert(&[1, 2])).unwrap();

        let update = Update::new(name("t"))
            .set("v", 20)
            .filter(Predicate::eq("v", 2));
        assert_eq!(c.pass_through(&update.into()).unwrap().count(), Some(1));

        let select = Select::new(name("t")).columns(["v"]);
        let result = c.pass_through(&select.into()).unwrap();
        let rows = result.rows().unwrap();
        assert_eq!(
            rows.column_values("v").unwrap(),
            vec![&Value::Int(1), &Value::Int(20)]
        );
    }

    #[test]
    fn test_soft_deleted_fails() {
        let (_db, mut c) = setup();
        c.commit().unwrap();
        c.drop_table(&DropTable::new(name("t")).into()).unwrap();

        let result = c.pass_through(&insert(&[1])).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.error(), Some("table 't' does not exist (soft-deleted)"));

        let describe = c
            .pass_through(&DescribeTable { table: name("t") }.into())
            .unwrap();
        assert!(!describe.is_success());
    }

    #[test]
    fn test_recreated_goes_to_new_shadow() {
        let (db, mut c) = setup();
        c.pass_through(&insert(&[1, 2])).unwrap();
        c.commit().unwrap();
        c.drop_table(&DropTable::new(name("t")).into()).unwrap();
        let create = CreateTable::new(name("t"))
            .auto_increment("id")
            .column(ColumnDef::new("v", DataType::Int));
        c.create_table(&create.into()).unwrap();
        assert_eq!(c.table_state(&name("t")).unwrap(), TableState::StagedRecreate);

        let result = c.pass_through(&insert(&[7])).unwrap();
        assert!(result.is_success(), "{}", result);
        let count = c.pass_through(&CountRows::new(name("t")).into()).unwrap();
        assert_eq!(count.count(), Some(1));

        // The committed table is untouched until commit replaces it.
        assert_eq!(db.row_count("t"), Some(2));
        assert!(c.backend().has_temporary("$temp$t"));
    }

    #[test]
    fn test_untracked_runs_unmodified() {
        let (_db, mut c) = setup();
        let result = c.pass_through(&Select::new(name("missing")).into()).unwrap();
        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("missing"));
    }

    #[test]
    fn test_rejects_schema_queries() {
        let (_db, mut c) = setup();
        assert!(matches!(
            c.pass_through(&Query::ListTables),
            Err(SpitsError::WrongQueryKind { .. })
        ));
    }
}
