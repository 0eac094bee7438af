//! Configuration for SPITS.
//!
//! This module provides configuration structures for the coordinator and
//! the backend it drives.

mod spits;

pub use spits::{BackendConfig, DialectName, SpitsConfig};
