//! In-memory table storage.

use std::cmp::Ordering;
use std::collections::HashSet;

use spits_sql::{ColumnDef, CreateTable, Insert, Predicate, ResultSet, Row, Select, Update, Value};

use crate::{StorageError, StorageResult};

/// Schema and rows of one table.
#[derive(Debug, Clone)]
pub struct TableData {
    name: String,
    columns: Vec<ColumnDef>,
    /// Index of the auto-increment key column.
    auto_increment: Option<usize>,
    rows: Vec<Row>,
    next_auto: i64,
}

impl TableData {
    /// Builds an empty table from a CREATE TABLE definition.
    pub fn from_create(create: &CreateTable) -> StorageResult<Self> {
        let columns = create.all_columns();
        if columns.is_empty() {
            return Err(StorageError::SchemaMismatch(format!(
                "table '{}' must have at least one column",
                create.table
            )));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(StorageError::DuplicateColumn {
                    table: create.table.to_string(),
                    column: column.name.clone(),
                });
            }
        }

        Ok(Self {
            name: create.table.to_string(),
            auto_increment: create.auto_increment.as_ref().map(|_| 0),
            columns,
            rows: Vec::new(),
            next_auto: 1,
        })
    }

    /// Returns an empty table with this table's shape.
    pub fn like(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: self.columns.clone(),
            auto_increment: self.auto_increment,
            rows: Vec::new(),
            next_auto: 1,
        }
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column definitions.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the stored rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_index(&self, column: &str) -> StorageResult<usize> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| StorageError::ColumnNotFound {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    fn check_filter(&self, filter: Option<&Predicate>) -> StorageResult<()> {
        if let Some(p) = filter {
            for column in p.columns() {
                self.column_index(column)?;
            }
        }
        Ok(())
    }

    fn matches(&self, row: &Row, filter: Option<&Predicate>) -> bool {
        match filter {
            None => true,
            Some(p) => p.matches(&|column: &str| {
                self.columns
                    .iter()
                    .position(|c| c.name == column)
                    .and_then(|i| row.get(i))
            }),
        }
    }

    fn is_unique_column(&self, index: usize) -> bool {
        self.columns[index].unique || self.auto_increment == Some(index)
    }

    /// Validates NOT NULL and UNIQUE over a complete row set.
    fn check_constraints(&self, rows: &[Row]) -> StorageResult<()> {
        for (i, column) in self.columns.iter().enumerate() {
            if !column.nullable
                && rows
                    .iter()
                    .any(|r| r.get(i).map_or(true, Value::is_null))
            {
                return Err(StorageError::ConstraintViolation(format!(
                    "column '{}' cannot be null",
                    column.name
                )));
            }
            if self.is_unique_column(i) {
                let mut seen = HashSet::new();
                for value in rows.iter().filter_map(|r| r.get(i)) {
                    if !value.is_null() && !seen.insert(value) {
                        return Err(StorageError::ConstraintViolation(format!(
                            "duplicate entry '{}' for key '{}'",
                            value, column.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Assigns an auto-increment key if the row has none and advances the
    /// counter past explicit keys.
    fn fill_auto_increment(&mut self, row: &mut Row) -> StorageResult<()> {
        let Some(idx) = self.auto_increment else {
            return Ok(());
        };
        match row.get(idx) {
            Some(Value::Null) | None => {
                row.set(idx, Value::Int(self.next_auto));
                self.next_auto += 1;
            }
            Some(v) => {
                let key = v.to_i64().ok_or_else(|| {
                    StorageError::SchemaMismatch(format!(
                        "auto-increment column '{}' requires an integer",
                        self.columns[idx].name
                    ))
                })?;
                row.set(idx, Value::Int(key));
                self.next_auto = self.next_auto.max(key.saturating_add(1));
            }
        }
        Ok(())
    }

    /// Appends full-width rows.
    pub fn append_rows(&mut self, rows: Vec<Row>) -> StorageResult<u64> {
        let mut staged = self.rows.clone();
        let saved_auto = self.next_auto;
        for mut row in rows {
            if row.num_columns() != self.columns.len() {
                self.next_auto = saved_auto;
                return Err(StorageError::SchemaMismatch(format!(
                    "table '{}' has {} columns, row has {}",
                    self.name,
                    self.columns.len(),
                    row.num_columns()
                )));
            }
            if let Err(e) = self.fill_auto_increment(&mut row) {
                self.next_auto = saved_auto;
                return Err(e);
            }
            staged.push(row);
        }
        if let Err(e) = self.check_constraints(&staged) {
            self.next_auto = saved_auto;
            return Err(e);
        }

        let added = (staged.len() - self.rows.len()) as u64;
        self.rows = staged;
        Ok(added)
    }

    /// Executes an INSERT.
    pub fn insert(&mut self, insert: &Insert) -> StorageResult<u64> {
        let targets: Vec<usize> = if insert.columns.is_empty() {
            (0..self.columns.len()).collect()
        } else {
            insert
                .columns
                .iter()
                .map(|c| self.column_index(c))
                .collect::<StorageResult<_>>()?
        };

        let mut rows = Vec::with_capacity(insert.rows.len());
        for values in &insert.rows {
            if values.len() != targets.len() {
                return Err(StorageError::SchemaMismatch(format!(
                    "column count doesn't match value count ({} vs {})",
                    targets.len(),
                    values.len()
                )));
            }
            let mut row = Row::nulls(self.columns.len());
            for (&idx, value) in targets.iter().zip(values) {
                row.set(idx, value.clone());
            }
            rows.push(row);
        }
        self.append_rows(rows)
    }

    /// Executes a SELECT.
    pub fn select(&self, select: &Select) -> StorageResult<ResultSet> {
        self.check_filter(select.filter.as_ref())?;
        let projection: Vec<usize> = if select.columns.is_empty() {
            (0..self.columns.len()).collect()
        } else {
            select
                .columns
                .iter()
                .map(|c| self.column_index(c))
                .collect::<StorageResult<_>>()?
        };
        let sort_keys: Vec<(usize, bool)> = select
            .order_by
            .iter()
            .map(|o| -> StorageResult<(usize, bool)> {
                Ok((self.column_index(&o.column)?, o.descending))
            })
            .collect::<StorageResult<_>>()?;

        let mut rows: Vec<&Row> = self
            .rows
            .iter()
            .filter(|r| self.matches(r, select.filter.as_ref()))
            .collect();
        if !sort_keys.is_empty() {
            rows.sort_by(|a, b| {
                for &(idx, descending) in &sort_keys {
                    let ord = a.get(idx).cmp(&b.get(idx));
                    let ord = if descending { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }
        let limit = select
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        let columns = projection
            .iter()
            .map(|&i| self.columns[i].name.clone())
            .collect();
        let rows = rows
            .into_iter()
            .take(limit)
            .map(|r| r.project(&projection))
            .collect();
        Ok(ResultSet::new(columns, rows))
    }

    /// Executes an UPDATE.
    pub fn update(&mut self, update: &Update) -> StorageResult<u64> {
        self.check_filter(update.filter.as_ref())?;
        let assignments: Vec<(usize, &Value)> = update
            .assignments
            .iter()
            .map(|(c, v)| -> StorageResult<(usize, &Value)> { Ok((self.column_index(c)?, v)) })
            .collect::<StorageResult<_>>()?;

        let mut staged = self.rows.clone();
        let mut affected = 0u64;
        for row in staged.iter_mut() {
            if self.matches(row, update.filter.as_ref()) {
                for &(idx, value) in &assignments {
                    row.set(idx, value.clone());
                }
                affected += 1;
            }
        }
        self.check_constraints(&staged)?;
        self.rows = staged;
        Ok(affected)
    }

    /// Executes a DELETE.
    pub fn delete(&mut self, filter: Option<&Predicate>) -> StorageResult<u64> {
        self.check_filter(filter)?;
        let before = self.rows.len();
        let rows = std::mem::take(&mut self.rows);
        self.rows = rows
            .into_iter()
            .filter(|r| !self.matches(r, filter))
            .collect();
        Ok((before - self.rows.len()) as u64)
    }

    /// Counts matching rows.
    pub fn count(&self, filter: Option<&Predicate>) -> StorageResult<u64> {
        self.check_filter(filter)?;
        Ok(self.rows.iter().filter(|r| self.matches(r, filter)).count() as u64)
    }

    /// Counts distinct non-NULL values of a column among matching rows.
    pub fn count_unique(&self, column: &str, filter: Option<&Predicate>) -> StorageResult<u64> {
        self.check_filter(filter)?;
        let idx = self.column_index(column)?;
        let distinct: HashSet<&Value> = self
            .rows
            .iter()
            .filter(|r| self.matches(r, filter))
            .filter_map(|r| r.get(idx))
            .filter(|v| !v.is_null())
            .collect();
        Ok(distinct.len() as u64)
    }

    /// Describes the table shape, one row per column.
    pub fn describe(&self) -> ResultSet {
        let rows = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let key = if self.auto_increment == Some(i) {
                    "PRI"
                } else if c.unique {
                    "UNI"
                } else {
                    ""
                };
                let extra = if self.auto_increment == Some(i) {
                    "auto_increment"
                } else {
                    ""
                };
                Row::new(vec![
                    Value::string(c.name.clone()),
                    Value::string(c.data_type.to_string()),
                    Value::string(if c.nullable { "YES" } else { "NO" }),
                    Value::string(key),
                    Value::string(extra),
                ])
            })
            .collect();
        ResultSet::new(
            ["Field", "Type", "Null", "Key", "Extra"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows,
        )
    }

    /// Adds a column. Existing rows get NULL, so the column must be
    /// nullable unless the table is empty.
    pub fn add_column(&mut self, column: ColumnDef) -> StorageResult<()> {
        if self.columns.iter().any(|c| c.name == column.name) {
            return Err(StorageError::DuplicateColumn {
                table: self.name.clone(),
                column: column.name,
            });
        }
        if !column.nullable && !self.rows.is_empty() {
            return Err(StorageError::ConstraintViolation(format!(
                "column '{}' cannot be null",
                column.name
            )));
        }
        self.columns.push(column);
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        Ok(())
    }

    /// Drops a column.
    pub fn drop_column(&mut self, column: &str) -> StorageResult<()> {
        let idx = self.column_index(column)?;
        if self.columns.len() == 1 {
            return Err(StorageError::SchemaMismatch(format!(
                "cannot drop the only column of table '{}'",
                self.name
            )));
        }
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        self.auto_increment = match self.auto_increment {
            Some(a) if a == idx => None,
            Some(a) if a > idx => Some(a - 1),
            other => other,
        };
        Ok(())
    }

    /// Column names in table order.
    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
