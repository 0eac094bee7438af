//! Staged schema state.
//!
//! The coordinator tracks two sets: tables staged for creation (backed by a
//! shadow table) and tables staged for deletion (whose permanent table is
//! still in the backend). Together with the backend catalog they determine
//! each table's [`TableState`].

use std::collections::BTreeSet;
use std::fmt;

use spits_common::{SpitsError, SpitsResult, TableName};

/// Logical state of a table name as seen by one coordinator.
///
/// | permanent | staged create | staged delete | state |
/// |---|---|---|---|
/// | no  | no  | no  | `Absent` |
/// | no  | yes | no  | `StagedCreate` |
/// | yes | no  | no  | `Committed` |
/// | yes | no  | yes | `StagedDelete` |
/// | yes | yes | yes | `StagedRecreate` |
///
/// Every other combination is an inconsistency between staging and the
/// backend catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableState {
    /// No such table.
    Absent,
    /// Created in this session, not yet committed.
    StagedCreate,
    /// Permanent and visible.
    Committed,
    /// Permanent, but deleted in this session pending commit.
    StagedDelete,
    /// Deleted and created again in this session; commit replaces the
    /// permanent table.
    StagedRecreate,
}

impl TableState {
    /// Derives the state from catalog and staging membership.
    pub fn derive(
        table: &TableName,
        permanent: bool,
        staged_create: bool,
        staged_delete: bool,
    ) -> SpitsResult<Self> {
        match (permanent, staged_create, staged_delete) {
            (false, false, false) => Ok(TableState::Absent),
            (false, true, false) => Ok(TableState::StagedCreate),
            (true, false, false) => Ok(TableState::Committed),
            (true, false, true) => Ok(TableState::StagedDelete),
            (true, true, true) => Ok(TableState::StagedRecreate),
            (permanent, staged_create, staged_delete) => {
                tracing::error!(
                    table = %table,
                    permanent,
                    staged_create,
                    staged_delete,
                    "staging state diverged from backend catalog"
                );
                Err(SpitsError::InconsistentState {
                    table: table.to_string(),
                    permanent,
                    staged_create,
                    staged_delete,
                })
            }
        }
    }

    /// Returns true if the table is visible to this session.
    pub fn is_visible(&self) -> bool {
        matches!(
            self,
            TableState::StagedCreate | TableState::Committed | TableState::StagedRecreate
        )
    }

    /// Returns true if the table is backed by a shadow table.
    pub fn has_shadow(&self) -> bool {
        matches!(self, TableState::StagedCreate | TableState::StagedRecreate)
    }
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableState::Absent => write!(f, "absent"),
            TableState::StagedCreate => write!(f, "staged-create"),
            TableState::Committed => write!(f, "committed"),
            TableState::StagedDelete => write!(f, "staged-delete"),
            TableState::StagedRecreate => write!(f, "staged-recreate"),
        }
    }
}

/// The two staging sets of one coordinator.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Staging {
    created: BTreeSet<TableName>,
    deleted: BTreeSet<TableName>,
}

impl Staging {
    /// Creates empty staging state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables staged for creation.
    pub fn created(&self) -> &BTreeSet<TableName> {
        &self.created
    }

    /// Tables staged for deletion.
    pub fn deleted(&self) -> &BTreeSet<TableName> {
        &self.deleted
    }

    /// Returns true if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty()
    }

    /// Returns true if either set mentions `table`.
    pub fn tracks(&self, table: &TableName) -> bool {
        self.created.contains(table) || self.deleted.contains(table)
    }

    /// Derives the state of `table` given whether the backend holds a
    /// permanent table of that name.
    pub fn state(&self, table: &TableName, permanent: bool) -> SpitsResult<TableState> {
        TableState::derive(
            table,
            permanent,
            self.created.contains(table),
            self.deleted.contains(table),
        )
    }

    /// Records a materialized shadow table.
    pub fn stage_create(&mut self, table: TableName) {
        self.created.insert(table);
    }

    /// Forgets a shadow table that was dropped.
    pub fn unstage_create(&mut self, table: &TableName) -> bool {
        self.created.remove(table)
    }

    /// Marks a permanent table as deleted.
    pub fn stage_delete(&mut self, table: TableName) {
        self.deleted.insert(table);
    }

    /// Empties both sets, returning their contents.
    pub fn take(&mut self) -> (BTreeSet<TableName>, BTreeSet<TableName>) {
        (
            std::mem::take(&mut self.created),
            std::mem::take(&mut self.deleted),
        )
    }

    /// Tables visible to this session: staged creates plus permanent tables
    /// that are not staged for deletion. Sorted and deduplicated.
    pub fn visible<I>(&self, permanent: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut visible: BTreeSet<String> = permanent
            .into_iter()
            .filter(|t| !self.deleted.contains(t.as_str()))
            .collect();
        visible.extend(self.created.iter().map(|t| t.to_string()));
        visible.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> TableName {
        TableName::new(s).unwrap()
    }

    #[test]
    fn test_lattice() {
        let t = name("t");
        let cases = [
            ((false, false, false), Some(TableState::Absent)),
            ((false, true, false), Some(TableState::StagedCreate)),
            ((true, false, false), Some(TableState::Committed)),
            ((true, false, true), Some(TableState::StagedDelete)),
            ((true, true, true), Some(TableState::StagedRecreate)),
            ((false, false, true), None),
            ((false, true, true), None),
            ((true, true, false), None),
        ];
        for ((p, c, d), expected) in cases {
            match (TableState::derive(&t, p, c, d), expected) {
                (Ok(state), Some(want)) => assert_eq!(state, want),
                (Err(SpitsError::InconsistentState { .. }), None) => {}
                (got, want) => panic!("({}, {}, {}): got {:?}, want {:?}", p, c, d, got, want),
            }
        }
    }

    #[test]
    fn test_visibility() {
        assert!(TableState::StagedRecreate.is_visible());
        assert!(!TableState::StagedDelete.is_visible());
        assert!(!TableState::Absent.is_visible());
        assert!(TableState::StagedRecreate.has_shadow());
        assert!(!TableState::Committed.has_shadow());
    }

    #[test]
    fn test_stage_and_take() {
        let mut staging = Staging::new();
        assert!(staging.is_empty());

        staging.stage_create(name("a"));
        staging.stage_delete(name("b"));
        assert!(staging.tracks(&name("a")));
        assert!(staging.tracks(&name("b")));
        assert!(!staging.tracks(&name("c")));
        assert_eq!(staging.state(&name("a"), false).unwrap(), TableState::StagedCreate);
        assert_eq!(staging.state(&name("b"), true).unwrap(), TableState::StagedDelete);

        assert!(staging.unstage_create(&name("a")));
        assert!(!staging.unstage_create(&name("a")));

        let (created, deleted) = staging.take();
        assert!(created.is_empty());
        assert_eq!(deleted.len(), 1);
        assert!(staging.is_empty());
    }

    #[test]
    fn test_visible_merges_staging() {
        let mut staging = Staging::new();
        staging.stage_create(name("new"));
        staging.stage_create(name("old"));
        staging.stage_delete(name("old"));
        staging.stage_delete(name("gone"));

        let permanent = vec!["gone".to_string(), "kept".to_string(), "old".to_string()];
        assert_eq!(staging.visible(permanent), vec!["kept", "new", "old"]);
    }
}
