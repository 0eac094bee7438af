//! Core types for SPITS.

mod table_name;

pub use table_name::TableName;
