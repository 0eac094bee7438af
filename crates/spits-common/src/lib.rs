//! # spits-common
//!
//! Common types, errors, and configuration for SPITS, the transactional
//! schema-change coordinator.
//!
//! This crate provides the foundational pieces shared by every other SPITS
//! crate:
//!
//! - **Types**: the validated [`TableName`] identifier
//! - **Errors**: the coordinator error taxonomy [`SpitsError`] with stable
//!   [`ErrorCode`]s
//! - **Config**: [`SpitsConfig`] and its backend section
//! - **Constants**: identifier limits
//!
//! ## Example
//!
//! ```rust
//! use spits_common::types::TableName;
//! use spits_common::error::SpitsResult;
//!
//! fn example() -> SpitsResult<()> {
//!     let users = TableName::new("users")?;
//!     assert_eq!(users.as_str(), "users");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::{BackendConfig, DialectName, SpitsConfig};
pub use constants::*;
pub use error::{ErrorCode, SpitsError, SpitsResult};
pub use types::TableName;
