//! # spits-sql
//!
//! Query representation for SPITS.
//!
//! This crate implements:
//! - SQL data types and column definitions
//! - Runtime values, rows and result sets
//! - Row predicates (WHERE clauses)
//! - The closed set of query kinds the coordinator accepts
//! - Backend statements, including the internal promotion steps
//! - Dialect-aware rendering to statement text (MySQL, SQLite)
//!
//! # Usage
//!
//! ```
//! use spits_common::TableName;
//! use spits_sql::{ColumnDef, CreateTable, DataType, Dialect, Query};
//!
//! let users = TableName::new("users").unwrap();
//! let create = Query::CreateTable(
//!     CreateTable::new(users)
//!         .auto_increment("id")
//!         .column(ColumnDef::new("username", DataType::Varchar(30)).unique()),
//! );
//!
//! assert_eq!(
//!     create.render(Dialect::MySql),
//!     "CREATE TABLE `users` (`id` BIGINT NOT NULL AUTO_INCREMENT, \
//!      `username` VARCHAR(30) NOT NULL UNIQUE, PRIMARY KEY (`id`))"
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod predicate;
mod query;
mod render;
mod row;
mod statement;
mod types;
mod value;

pub use predicate::{CompareOp, Predicate};
pub use query::{
    AddColumn, CountRows, CountUniqueRows, CreateTable, Delete, DescribeTable, DropColumn,
    DropTable, Insert, OrderBy, Query, QueryKind, Select, Update,
};
pub use render::{quote_ident, Dialect, RenderError, RenderResult};
pub use row::{ResultSet, Row};
pub use statement::Statement;
pub use types::{ColumnDef, DataType};
pub use value::Value;
