//! SQL data types and column definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// SQL data types supported by SPITS table definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean type.
    Boolean,
    /// 8-bit signed integer.
    TinyInt,
    /// 16-bit signed integer.
    SmallInt,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    BigInt,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// Arbitrary precision decimal.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Digits after decimal point.
        scale: u8,
    },
    /// Fixed-length string.
    Char(u32),
    /// Variable-length string.
    Varchar(u32),
    /// Unlimited text.
    Text,
    /// Binary data.
    Blob,
    /// Date (year, month, day).
    Date,
    /// Timestamp (date + time).
    Timestamp,
}

impl DataType {
    /// Returns true if this type is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::TinyInt | DataType::SmallInt | DataType::Int | DataType::BigInt
        )
    }

    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        self.is_integer()
            || matches!(
                self,
                DataType::Float | DataType::Double | DataType::Decimal { .. }
            )
    }

    /// Returns true if this type is a string type.
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            DataType::Char(_) | DataType::Varchar(_) | DataType::Text
        )
    }

    /// Parses a type name as reported by a backend's catalog
    /// (`DESCRIBE`, `PRAGMA table_info`).
    ///
    /// Unknown names map to `Text`, which every backend can store.
    pub fn from_catalog_name(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        let (base, args) = match upper.find('(') {
            Some(open) => {
                let close = upper.rfind(')').unwrap_or(upper.len());
                (upper[..open].trim(), &upper[open + 1..close.max(open + 1)])
            }
            None => (upper.as_str(), ""),
        };
        let mut nums = args.split(',').filter_map(|a| a.trim().parse::<u32>().ok());

        match base {
            "BOOL" | "BOOLEAN" => DataType::Boolean,
            "TINYINT" => DataType::TinyInt,
            "SMALLINT" => DataType::SmallInt,
            "INT" | "INTEGER" | "MEDIUMINT" => DataType::Int,
            "BIGINT" => DataType::BigInt,
            "FLOAT" | "REAL" => DataType::Float,
            "DOUBLE" | "DOUBLE PRECISION" => DataType::Double,
            "DECIMAL" | "NUMERIC" => {
                let precision = nums.next().unwrap_or(10).min(u8::MAX as u32) as u8;
                let scale = nums.next().unwrap_or(0).min(u8::MAX as u32) as u8;
                DataType::Decimal { precision, scale }
            }
            "CHAR" => DataType::Char(nums.next().unwrap_or(1)),
            "VARCHAR" => DataType::Varchar(nums.next().unwrap_or(255)),
            "BLOB" | "BINARY" | "VARBINARY" => DataType::Blob,
            "DATE" => DataType::Date,
            "TIMESTAMP" | "DATETIME" => DataType::Timestamp,
            _ => DataType::Text,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::TinyInt => write!(f, "TINYINT"),
            DataType::SmallInt => write!(f, "SMALLINT"),
            DataType::Int => write!(f, "INT"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Decimal { precision, scale } => write!(f, "DECIMAL({}, {})", precision, scale),
            DataType::Char(len) => write!(f, "CHAR({})", len),
            DataType::Varchar(len) => write!(f, "VARCHAR({})", len),
            DataType::Text => write!(f, "TEXT"),
            DataType::Blob => write!(f, "BLOB"),
            DataType::Date => write!(f, "DATE"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

/// Column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Data type.
    pub data_type: DataType,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Whether values must be unique.
    pub unique: bool,
}

impl ColumnDef {
    /// Creates a NOT NULL column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            unique: false,
        }
    }

    /// Marks the column as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the column as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(DataType::Varchar(30).to_string(), "VARCHAR(30)");
        assert_eq!(
            DataType::Decimal {
                precision: 12,
                scale: 2
            }
            .to_string(),
            "DECIMAL(12, 2)"
        );
        assert_eq!(DataType::BigInt.to_string(), "BIGINT");
    }

    #[test]
    fn test_from_catalog_name() {
        assert_eq!(DataType::from_catalog_name("varchar(30)"), DataType::Varchar(30));
        assert_eq!(DataType::from_catalog_name("INTEGER"), DataType::Int);
        assert_eq!(DataType::from_catalog_name("bigint(20)"), DataType::BigInt);
        assert_eq!(
            DataType::from_catalog_name("DECIMAL(12, 2)"),
            DataType::Decimal {
                precision: 12,
                scale: 2
            }
        );
        assert_eq!(DataType::from_catalog_name("geometry"), DataType::Text);
        assert_eq!(DataType::from_catalog_name(""), DataType::Text);
    }

    #[test]
    fn test_catalog_name_round_trip() {
        for dt in [
            DataType::Boolean,
            DataType::SmallInt,
            DataType::Double,
            DataType::Char(4),
            DataType::Varchar(64),
            DataType::Blob,
            DataType::Timestamp,
        ] {
            assert_eq!(DataType::from_catalog_name(&dt.to_string()), dt);
        }
    }

    #[test]
    fn test_column_builder() {
        let col = ColumnDef::new("email", DataType::Varchar(255))
            .nullable()
            .unique();
        assert!(col.nullable);
        assert!(col.unique);
        assert!(col.data_type.is_string());
    }
}
