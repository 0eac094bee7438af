//! # spits
//!
//! Transactional schema changes for backends whose DDL cannot be rolled
//! back.
//!
//! Row-level statements run inside the backend's native transaction. Table
//! creation and deletion are staged by the [`Coordinator`] instead:
//!
//! - CREATE TABLE materializes a session-scoped shadow table named
//!   `$temp$<table>`; row statements against the table are redirected to it
//! - DROP TABLE removes an uncommitted table at once, and otherwise hides a
//!   committed table until commit drops it
//! - commit promotes shadow tables and applies the deferred drops; rollback
//!   discards both
//!
//! Column alterations are rejected outright.
//!
//! ## Example
//!
//! ```
//! use spits::{Coordinator, TableState};
//! use spits_common::TableName;
//! use spits_sql::{ColumnDef, CreateTable, DataType, DropTable, Insert};
//! use spits_storage::MemoryDatabase;
//!
//! let db = MemoryDatabase::new();
//! let mut coordinator = Coordinator::new(db.session());
//! let users = TableName::new("users").unwrap();
//!
//! coordinator
//!     .execute(&CreateTable::new(users.clone())
//!         .column(ColumnDef::new("name", DataType::Text))
//!         .into())
//!     .unwrap();
//! coordinator
//!     .execute(&Insert::new(users.clone(), ["name"]).values(["ada"]).into())
//!     .unwrap();
//! coordinator.commit().unwrap();
//! assert_eq!(db.row_count("users"), Some(1));
//!
//! let dropped = coordinator.execute(&DropTable::new(users.clone()).into()).unwrap();
//! assert!(dropped.is_success());
//! assert_eq!(coordinator.table_state(&users).unwrap(), TableState::StagedDelete);
//!
//! coordinator.rollback().unwrap();
//! assert_eq!(coordinator.table_state(&users).unwrap(), TableState::Committed);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod actions;
pub mod classifier;
mod coordinator;
pub mod naming;
mod passthrough;
pub mod result;
pub mod staging;
mod txn;

pub use classifier::{classify, Policy, StagedAction};
pub use coordinator::{open_backend, Coordinator};
pub use result::{format_result, CommitReport, ExecutionResult, Payload};
pub use staging::{Staging, TableState};
