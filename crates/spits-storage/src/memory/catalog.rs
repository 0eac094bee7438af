//! Permanent table catalog of the memory engine.

use std::collections::BTreeMap;

use super::table::TableData;
use crate::{StorageError, StorageResult};

/// Permanent tables by name.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: BTreeMap<String, TableData>,
}

impl Catalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table.
    pub fn create_table(&mut self, table: TableData) -> StorageResult<()> {
        if self.tables.contains_key(table.name()) {
            return Err(StorageError::TableExists(table.name().to_string()));
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(())
    }

    /// Drops a table.
    pub fn drop_table(&mut self, name: &str) -> StorageResult<TableData> {
        self.tables
            .remove(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    /// Gets a table.
    pub fn get(&self, name: &str) -> Option<&TableData> {
        self.tables.get(name)
    }

    /// Gets a table for modification.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut TableData> {
        self.tables.get_mut(name)
    }

    /// Checks if a table exists.
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Lists all table names in sorted order.
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Returns the number of tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spits_common::TableName;
    use spits_sql::{ColumnDef, CreateTable, DataType};

    fn table(name: &str) -> TableData {
        let create = CreateTable::new(TableName::new(name).unwrap())
            .column(ColumnDef::new("id", DataType::Int));
        TableData::from_create(&create).unwrap()
    }

    #[test]
    fn test_create_and_drop() {
        let mut catalog = Catalog::new();
        catalog.create_table(table("users")).unwrap();
        assert!(catalog.table_exists("users"));
        assert_eq!(catalog.table_count(), 1);

        let dropped = catalog.drop_table("users").unwrap();
        assert_eq!(dropped.name(), "users");
        assert!(!catalog.table_exists("users"));
    }

    #[test]
    fn test_duplicate_and_missing() {
        let mut catalog = Catalog::new();
        catalog.create_table(table("users")).unwrap();
        assert!(matches!(
            catalog.create_table(table("users")),
            Err(StorageError::TableExists(_))
        ));
        assert!(matches!(
            catalog.drop_table("orders"),
            Err(StorageError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_list_sorted() {
        let mut catalog = Catalog::new();
        for name in ["orders", "accounts", "users"] {
            catalog.create_table(table(name)).unwrap();
        }
        assert_eq!(catalog.list_tables(), vec!["accounts", "orders", "users"]);
    }
}
