//! Error handling for SPITS.
//!
//! This module provides the coordinator error taxonomy and result alias used
//! across all SPITS components.

mod spits;

pub use spits::{ErrorCode, SpitsError};

/// Result type alias for SPITS operations.
pub type SpitsResult<T> = std::result::Result<T, SpitsError>;
