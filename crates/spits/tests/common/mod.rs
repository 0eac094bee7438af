//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Once;

use spits_common::TableName;
use spits_sql::{
    ColumnDef, CountRows, CreateTable, DataType, DropTable, Insert, Query, Select, Value,
};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a test-writer subscriber once per test binary. `RUST_LOG`
/// controls the filter; the default is `warn`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn name(s: &str) -> TableName {
    TableName::new(s).unwrap()
}

pub fn create(table: &str) -> Query {
    CreateTable::new(name(table))
        .auto_increment("id")
        .column(ColumnDef::new("username", DataType::Varchar(30)).unique())
        .column(ColumnDef::new("score", DataType::Int).nullable())
        .into()
}

pub fn drop_table(table: &str) -> Query {
    DropTable::new(name(table)).into()
}

pub fn insert(table: &str, username: &str, score: i64) -> Query {
    Insert::new(name(table), ["username", "score"])
        .values([Value::from(username), Value::from(score)])
        .into()
}

pub fn count(table: &str) -> Query {
    CountRows::new(name(table)).into()
}

pub fn select(table: &str) -> Query {
    Select::new(name(table)).into()
}
