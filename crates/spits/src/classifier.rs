//! Query classification.

use spits_sql::QueryKind;

/// Schema actions the coordinator stages itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagedAction {
    /// CREATE TABLE into a shadow table.
    Create,
    /// DROP TABLE, immediate for staged creates and deferred otherwise.
    Drop,
    /// Catalog listing merged with staged state.
    List,
}

/// How the coordinator handles a query kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Runs inside the backend's DML transaction, retargeted if needed.
    PassThrough,
    /// Never accepted.
    Disallowed,
    /// Handled by a staged action.
    Staged(StagedAction),
}

/// Maps a query kind to its policy.
pub fn classify(kind: QueryKind) -> Policy {
    match kind {
        QueryKind::Select
        | QueryKind::Insert
        | QueryKind::Update
        | QueryKind::Delete
        | QueryKind::CountRows
        | QueryKind::CountUniqueRows
        | QueryKind::DescribeTable => Policy::PassThrough,
        QueryKind::AddColumn | QueryKind::DropColumn => Policy::Disallowed,
        QueryKind::CreateTable => Policy::Staged(StagedAction::Create),
        QueryKind::DropTable => Policy::Staged(StagedAction::Drop),
        QueryKind::ListTables => Policy::Staged(StagedAction::List),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_every_kind() {
        let mut pass = 0;
        let mut disallowed = 0;
        let mut staged = 0;
        for kind in QueryKind::ALL {
            match classify(kind) {
                Policy::PassThrough => pass += 1,
                Policy::Disallowed => disallowed += 1,
                Policy::Staged(_) => staged += 1,
            }
        }
        assert_eq!((pass, disallowed, staged), (7, 2, 3));
    }

    #[test]
    fn test_classify_schema_kinds() {
        assert_eq!(
            classify(QueryKind::CreateTable),
            Policy::Staged(StagedAction::Create)
        );
        assert_eq!(
            classify(QueryKind::DropTable),
            Policy::Staged(StagedAction::Drop)
        );
        assert_eq!(
            classify(QueryKind::ListTables),
            Policy::Staged(StagedAction::List)
        );
        assert_eq!(classify(QueryKind::AddColumn), Policy::Disallowed);
        assert_eq!(classify(QueryKind::DropColumn), Policy::Disallowed);
        assert_eq!(classify(QueryKind::DescribeTable), Policy::PassThrough);
    }
}
