//! Rows and result sets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Value;

/// A single row of values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row {
    /// The values in this row.
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row with the given values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Creates a row with all NULL values.
    pub fn nulls(num_columns: usize) -> Self {
        Self {
            values: vec![Value::Null; num_columns],
        }
    }

    /// Returns the number of columns in this row.
    pub fn num_columns(&self) -> usize {
        self.values.len()
    }

    /// Returns the value at the given index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Sets the value at the given index.
    pub fn set(&mut self, index: usize, value: Value) {
        if index < self.values.len() {
            self.values[index] = value;
        }
    }

    /// Appends a value to this row.
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Removes the value at the given index.
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        (index < self.values.len()).then(|| self.values.remove(index))
    }

    /// Returns an iterator over the values.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Projects this row to include only the specified columns.
    pub fn project(&self, indices: &[usize]) -> Row {
        let values = indices
            .iter()
            .map(|&i| self.values.get(i).cloned().unwrap_or(Value::Null))
            .collect();
        Row { values }
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

/// Rows returned by a query, with their column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Output column names.
    pub columns: Vec<String>,
    /// Result rows.
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Creates a result set.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns every value of one column, in row order.
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().filter_map(|r| r.get(idx)).collect())
    }

    /// Returns a single value from the first row.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|r| r.get(0))
    }

    /// Pretty prints the result.
    pub fn display(&self) -> String {
        let mut col_widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        for row in &self.rows {
            for (i, val) in row.iter().enumerate() {
                if i < col_widths.len() {
                    col_widths[i] = col_widths[i].max(val.to_string().len());
                }
            }
        }

        let mut output = String::new();
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                output.push_str(" | ");
            }
            output.push_str(&format!("{:width$}", column, width = col_widths[i]));
        }
        output.push('\n');

        for (i, width) in col_widths.iter().enumerate() {
            if i > 0 {
                output.push_str("-+-");
            }
            output.push_str(&"-".repeat(*width));
        }
        output.push('\n');

        for row in &self.rows {
            for (i, val) in row.iter().enumerate() {
                if i > 0 {
                    output.push_str(" | ");
                }
                let width = col_widths.get(i).copied().unwrap_or(0);
                output.push_str(&format!("{:width$}", val.to_string(), width = width));
            }
            output.push('\n');
        }

        output.push_str(&format!("({} rows)\n", self.rows.len()));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_project() {
        let row = Row::new(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let projected = row.project(&[2, 0, 7]);
        assert_eq!(projected.num_columns(), 3);
        assert_eq!(projected.get(0), Some(&Value::Int(3)));
        assert_eq!(projected.get(1), Some(&Value::Int(1)));
        assert_eq!(projected.get(2), Some(&Value::Null));
    }

    #[test]
    fn test_row_remove() {
        let mut row = Row::new(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(row.remove(0), Some(Value::Int(1)));
        assert_eq!(row.remove(5), None);
        assert_eq!(row.num_columns(), 1);
    }

    #[test]
    fn test_row_display() {
        let row = Row::new(vec![Value::Int(1), Value::string("hello")]);
        assert_eq!(row.to_string(), "(1, hello)");
    }

    #[test]
    fn test_result_set_accessors() {
        let rs = ResultSet::new(
            vec!["id".into(), "name".into()],
            vec![
                Row::new(vec![Value::Int(1), Value::string("Alice")]),
                Row::new(vec![Value::Int(2), Value::string("Bob")]),
            ],
        );
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.scalar(), Some(&Value::Int(1)));
        assert_eq!(
            rs.column_values("name").unwrap(),
            vec![&Value::string("Alice"), &Value::string("Bob")]
        );
        assert!(rs.column_values("missing").is_none());

        let display = rs.display();
        assert!(display.contains("name"));
        assert!(display.contains("Alice"));
        assert!(display.contains("(2 rows)"));
    }
}
