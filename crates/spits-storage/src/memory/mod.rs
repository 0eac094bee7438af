//! In-process memory engine.
//!
//! A [`MemoryDatabase`] holds the permanent catalog and is shared between
//! sessions. Each [`MemoryBackend`] is one session on it:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ MemoryBackend (session)                      │
//! │  ┌──────────────┐   ┌──────────────────────┐ │
//! │  │ temporaries  │   │ pending (write set)  │ │
//! │  └──────────────┘   └──────────────────────┘ │
//! └──────────────────────────────────────────────┘
//!                        │ commit publishes
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │ MemoryDatabase: RwLock<Catalog>              │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! DML works on copy-on-write snapshots kept in the session's write set;
//! commit publishes them and rollback discards them. Concurrent sessions
//! writing the same table see last-writer-wins on commit.

mod catalog;
mod session;
mod table;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

pub use catalog::Catalog;
pub use session::MemoryBackend;
pub use table::TableData;

#[derive(Debug, Default)]
struct Shared {
    catalog: RwLock<Catalog>,
    next_session: AtomicU64,
}

/// A memory database shared between sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    shared: Arc<Shared>,
}

impl MemoryDatabase {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new session.
    pub fn session(&self) -> MemoryBackend {
        let id = self.shared.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        MemoryBackend::new(self.clone(), id)
    }

    /// Returns true if the permanent catalog holds `name`.
    pub fn table_exists(&self, name: &str) -> bool {
        self.shared.catalog.read().table_exists(name)
    }

    /// Lists the permanent catalog.
    pub fn list_tables(&self) -> Vec<String> {
        self.shared.catalog.read().list_tables()
    }

    /// Returns the committed row count of a permanent table.
    pub fn row_count(&self, name: &str) -> Option<usize> {
        self.shared.catalog.read().get(name).map(TableData::row_count)
    }

    pub(crate) fn catalog(&self) -> &RwLock<Catalog> {
        &self.shared.catalog
    }
}
