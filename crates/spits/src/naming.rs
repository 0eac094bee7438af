//! Shadow table names.
//!
//! A table staged for creation lives in the backend as a session-scoped
//! temporary table named [`SHADOW_PREFIX`] followed by its logical name.

use spits_common::{SpitsResult, TableName};

/// Prefix of every shadow table name.
pub const SHADOW_PREFIX: &str = "$temp$";

/// Returns the shadow name of a logical table.
///
/// Fails with `InvalidIdentifier` when the prefixed name exceeds the
/// identifier limit.
///
/// ```
/// use spits::naming::{logical_name, shadow_name};
/// use spits_common::TableName;
///
/// let users = TableName::new("users").unwrap();
/// let shadow = shadow_name(&users).unwrap();
/// assert_eq!(shadow.as_str(), "$temp$users");
/// assert_eq!(logical_name(&shadow), Some(users));
/// ```
pub fn shadow_name(table: &TableName) -> SpitsResult<TableName> {
    table.with_prefix(SHADOW_PREFIX)
}

/// Returns the logical name behind a shadow name, or `None` if `table` is
/// not a shadow name.
pub fn logical_name(table: &TableName) -> Option<TableName> {
    table.strip_prefix(SHADOW_PREFIX)
}

/// Returns true if `table` carries the shadow prefix.
pub fn is_shadow_name(table: &TableName) -> bool {
    table.as_str().starts_with(SHADOW_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spits_common::{SpitsError, MAX_IDENTIFIER_LEN};

    #[test]
    fn test_round_trip() {
        for raw in ["t", "users", "order_items", "_x", "A1$b", "$temp$nested"] {
            let name = TableName::new(raw).unwrap();
            let shadow = shadow_name(&name).unwrap();
            assert!(is_shadow_name(&shadow));
            assert_eq!(logical_name(&shadow), Some(name));
        }
    }

    #[test]
    fn test_non_shadow_names() {
        let name = TableName::new("users").unwrap();
        assert!(!is_shadow_name(&name));
        assert_eq!(logical_name(&name), None);
    }

    #[test]
    fn test_limit() {
        let longest = MAX_IDENTIFIER_LEN - SHADOW_PREFIX.len();
        let fits = TableName::new("a".repeat(longest)).unwrap();
        assert!(shadow_name(&fits).is_ok());

        let too_long = TableName::new("a".repeat(longest + 1)).unwrap();
        assert!(matches!(
            shadow_name(&too_long),
            Err(SpitsError::InvalidIdentifier { .. })
        ));
    }
}
