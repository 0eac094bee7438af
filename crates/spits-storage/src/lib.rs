//! # spits-storage
//!
//! Backend boundary for SPITS.
//!
//! The coordinator drives a [`Backend`]: one session with a native DML
//! transaction, session-scoped temporary tables and catalog introspection
//! that only reports permanent tables. Two engines are provided:
//!
//! - [`MemoryDatabase`] / [`MemoryBackend`]: an in-process engine whose DDL
//!   auto-commits the way MySQL's does
//! - [`SqliteBackend`]: a SQLite database through `rusqlite`
//!
//! ```
//! use spits_common::TableName;
//! use spits_sql::{ColumnDef, CreateTable, DataType, Statement};
//! use spits_storage::{Backend, MemoryDatabase};
//!
//! let db = MemoryDatabase::new();
//! let mut session = db.session();
//! let create = CreateTable::new(TableName::new("users").unwrap())
//!     .column(ColumnDef::new("name", DataType::Text));
//! session.execute(&Statement::Query(create.into())).unwrap();
//!
//! assert!(db.table_exists("users"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod backend;
mod error;
pub mod memory;
pub mod sqlite;

pub use backend::{Backend, QueryOutput};
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryBackend, MemoryDatabase};
pub use sqlite::SqliteBackend;
