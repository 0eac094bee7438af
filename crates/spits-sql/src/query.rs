//! The closed set of queries the coordinator accepts.

use std::fmt;

use serde::{Deserialize, Serialize};
use spits_common::TableName;

use crate::render::{comma_list, quote_ident, quote_table, render_value, Dialect};
use crate::{ColumnDef, DataType, Predicate, Value};

/// Discriminant of a [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueryKind {
    /// Row select.
    Select,
    /// Row insert.
    Insert,
    /// Row update.
    Update,
    /// Row delete.
    Delete,
    /// Row count.
    CountRows,
    /// Distinct-value count.
    CountUniqueRows,
    /// Table-shape introspection.
    DescribeTable,
    /// CREATE TABLE.
    CreateTable,
    /// DROP TABLE.
    DropTable,
    /// Catalog listing.
    ListTables,
    /// ALTER TABLE ... ADD COLUMN.
    AddColumn,
    /// ALTER TABLE ... DROP COLUMN.
    DropColumn,
}

impl QueryKind {
    /// Every query kind.
    pub const ALL: [QueryKind; 12] = [
        QueryKind::Select,
        QueryKind::Insert,
        QueryKind::Update,
        QueryKind::Delete,
        QueryKind::CountRows,
        QueryKind::CountUniqueRows,
        QueryKind::DescribeTable,
        QueryKind::CreateTable,
        QueryKind::DropTable,
        QueryKind::ListTables,
        QueryKind::AddColumn,
        QueryKind::DropColumn,
    ];

    /// Returns the kind's display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Select => "SELECT",
            QueryKind::Insert => "INSERT",
            QueryKind::Update => "UPDATE",
            QueryKind::Delete => "DELETE",
            QueryKind::CountRows => "COUNT ROWS",
            QueryKind::CountUniqueRows => "COUNT UNIQUE ROWS",
            QueryKind::DescribeTable => "DESCRIBE TABLE",
            QueryKind::CreateTable => "CREATE TABLE",
            QueryKind::DropTable => "DROP TABLE",
            QueryKind::ListTables => "LIST TABLES",
            QueryKind::AddColumn => "ADD COLUMN",
            QueryKind::DropColumn => "DROP COLUMN",
        }
    }

    /// Returns true if queries of this kind target a single table.
    pub fn is_table_scoped(&self) -> bool {
        !matches!(self, QueryKind::ListTables)
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Column to sort by.
    pub column: String,
    /// Sort descending.
    pub descending: bool,
}

impl OrderBy {
    /// Ascending sort on a column.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// Descending sort on a column.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// `SELECT`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Select {
    /// Source table.
    pub table: TableName,
    /// Projected columns; empty means all.
    pub columns: Vec<String>,
    /// Row filter.
    pub filter: Option<Predicate>,
    /// Sort keys.
    pub order_by: Vec<OrderBy>,
    /// Maximum number of rows.
    pub limit: Option<u64>,
}

impl Select {
    /// Selects every column of every row.
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            columns: Vec::new(),
            filter: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Sets the projected columns.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the row filter.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    /// Appends a sort key.
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Sets the row limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// `INSERT`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insert {
    /// Target table.
    pub table: TableName,
    /// Target columns; empty means every column in table order.
    pub columns: Vec<String>,
    /// Rows to insert.
    pub rows: Vec<Vec<Value>>,
}

impl Insert {
    /// Creates an insert into the given columns.
    pub fn new<I, S>(table: TableName, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table,
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    pub fn values<I, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }
}

/// `UPDATE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    /// Target table.
    pub table: TableName,
    /// `column = value` assignments.
    pub assignments: Vec<(String, Value)>,
    /// Row filter.
    pub filter: Option<Predicate>,
}

impl Update {
    /// Creates an update with no assignments.
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            assignments: Vec::new(),
            filter: None,
        }
    }

    /// Adds an assignment.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    /// Sets the row filter.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }
}

/// `DELETE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delete {
    /// Target table.
    pub table: TableName,
    /// Row filter; `None` deletes every row.
    pub filter: Option<Predicate>,
}

impl Delete {
    /// Deletes every row.
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            filter: None,
        }
    }

    /// Sets the row filter.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }
}

/// `SELECT COUNT(*)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRows {
    /// Source table.
    pub table: TableName,
    /// Row filter.
    pub filter: Option<Predicate>,
}

impl CountRows {
    /// Counts every row.
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            filter: None,
        }
    }

    /// Sets the row filter.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }
}

/// `SELECT COUNT(DISTINCT column)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountUniqueRows {
    /// Source table.
    pub table: TableName,
    /// Column whose distinct non-NULL values are counted.
    pub column: String,
    /// Row filter.
    pub filter: Option<Predicate>,
}

impl CountUniqueRows {
    /// Counts distinct values of one column.
    pub fn new(table: TableName, column: impl Into<String>) -> Self {
        Self {
            table,
            column: column.into(),
            filter: None,
        }
    }

    /// Sets the row filter.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }
}

/// Table-shape introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeTable {
    /// Described table.
    pub table: TableName,
}

/// `CREATE TABLE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTable {
    /// Table name.
    pub table: TableName,
    /// Auto-increment primary key column, placed first.
    pub auto_increment: Option<String>,
    /// Column definitions.
    pub columns: Vec<ColumnDef>,
    /// Session-scoped temporary table.
    pub temporary: bool,
}

impl CreateTable {
    /// Creates a table definition with no columns.
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            auto_increment: None,
            columns: Vec::new(),
            temporary: false,
        }
    }

    /// Sets the auto-increment primary key column.
    pub fn auto_increment(mut self, column: impl Into<String>) -> Self {
        self.auto_increment = Some(column.into());
        self
    }

    /// Appends a column.
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Marks the table as temporary.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    /// Returns every column definition, the auto-increment key included.
    pub fn all_columns(&self) -> Vec<ColumnDef> {
        let mut out = Vec::with_capacity(self.columns.len() + 1);
        if let Some(key) = &self.auto_increment {
            out.push(ColumnDef::new(key.clone(), DataType::BigInt).unique());
        }
        out.extend(self.columns.iter().cloned());
        out
    }

    fn render(&self, dialect: Dialect) -> String {
        let mut defs = Vec::with_capacity(self.columns.len() + 2);
        if let Some(key) = &self.auto_increment {
            defs.push(match dialect {
                Dialect::MySql => {
                    format!("{} BIGINT NOT NULL AUTO_INCREMENT", quote_ident(dialect, key))
                }
                Dialect::Sqlite => {
                    format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote_ident(dialect, key))
                }
            });
        }
        defs.extend(self.columns.iter().map(|c| render_column(dialect, c)));
        if let (Some(key), Dialect::MySql) = (&self.auto_increment, dialect) {
            defs.push(format!("PRIMARY KEY ({})", quote_ident(dialect, key)));
        }

        format!(
            "CREATE {}TABLE {} ({})",
            if self.temporary { "TEMPORARY " } else { "" },
            quote_ident(dialect, self.table.as_str()),
            comma_list(defs)
        )
    }
}

pub(crate) fn render_column(dialect: Dialect, column: &ColumnDef) -> String {
    let mut out = format!("{} {}", quote_ident(dialect, &column.name), column.data_type);
    if !column.nullable {
        out.push_str(" NOT NULL");
    }
    if column.unique {
        out.push_str(" UNIQUE");
    }
    out
}

/// `DROP TABLE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTable {
    /// Table name.
    pub table: TableName,
    /// The table is a session-scoped temporary table.
    pub temporary: bool,
}

impl DropTable {
    /// Drops a permanent table.
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            temporary: false,
        }
    }

    /// Drops a temporary table.
    pub fn temporary(table: TableName) -> Self {
        Self {
            table,
            temporary: true,
        }
    }
}

/// `ALTER TABLE ... ADD COLUMN`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddColumn {
    /// Altered table.
    pub table: TableName,
    /// New column.
    pub column: ColumnDef,
}

/// `ALTER TABLE ... DROP COLUMN`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropColumn {
    /// Altered table.
    pub table: TableName,
    /// Removed column.
    pub column: String,
}

/// A structured query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// Row select.
    Select(Select),
    /// Row insert.
    Insert(Insert),
    /// Row update.
    Update(Update),
    /// Row delete.
    Delete(Delete),
    /// Row count.
    CountRows(CountRows),
    /// Distinct-value count.
    CountUniqueRows(CountUniqueRows),
    /// Table-shape introspection.
    DescribeTable(DescribeTable),
    /// Table creation.
    CreateTable(CreateTable),
    /// Table removal.
    DropTable(DropTable),
    /// Catalog listing.
    ListTables,
    /// Column addition.
    AddColumn(AddColumn),
    /// Column removal.
    DropColumn(DropColumn),
}

impl Query {
    /// Returns the query's kind.
    pub fn kind(&self) -> QueryKind {
        match self {
            Query::Select(_) => QueryKind::Select,
            Query::Insert(_) => QueryKind::Insert,
            Query::Update(_) => QueryKind::Update,
            Query::Delete(_) => QueryKind::Delete,
            Query::CountRows(_) => QueryKind::CountRows,
            Query::CountUniqueRows(_) => QueryKind::CountUniqueRows,
            Query::DescribeTable(_) => QueryKind::DescribeTable,
            Query::CreateTable(_) => QueryKind::CreateTable,
            Query::DropTable(_) => QueryKind::DropTable,
            Query::ListTables => QueryKind::ListTables,
            Query::AddColumn(_) => QueryKind::AddColumn,
            Query::DropColumn(_) => QueryKind::DropColumn,
        }
    }

    /// Returns the target table, if the query is table-scoped.
    pub fn table_name(&self) -> Option<&TableName> {
        match self {
            Query::Select(q) => Some(&q.table),
            Query::Insert(q) => Some(&q.table),
            Query::Update(q) => Some(&q.table),
            Query::Delete(q) => Some(&q.table),
            Query::CountRows(q) => Some(&q.table),
            Query::CountUniqueRows(q) => Some(&q.table),
            Query::DescribeTable(q) => Some(&q.table),
            Query::CreateTable(q) => Some(&q.table),
            Query::DropTable(q) => Some(&q.table),
            Query::ListTables => None,
            Query::AddColumn(q) => Some(&q.table),
            Query::DropColumn(q) => Some(&q.table),
        }
    }

    /// Returns a copy of this query retargeted at `table`. The receiver is
    /// left untouched. Queries that are not table-scoped are copied as is.
    pub fn with_table_name(&self, table: TableName) -> Query {
        let mut copy = self.clone();
        if let Some(slot) = copy.table_slot() {
            *slot = table;
        }
        copy
    }

    fn table_slot(&mut self) -> Option<&mut TableName> {
        match self {
            Query::Select(q) => Some(&mut q.table),
            Query::Insert(q) => Some(&mut q.table),
            Query::Update(q) => Some(&mut q.table),
            Query::Delete(q) => Some(&mut q.table),
            Query::CountRows(q) => Some(&mut q.table),
            Query::CountUniqueRows(q) => Some(&mut q.table),
            Query::DescribeTable(q) => Some(&mut q.table),
            Query::CreateTable(q) => Some(&mut q.table),
            Query::DropTable(q) => Some(&mut q.table),
            Query::ListTables => None,
            Query::AddColumn(q) => Some(&mut q.table),
            Query::DropColumn(q) => Some(&mut q.table),
        }
    }

    /// Renders the query as statement text.
    pub fn render(&self, dialect: Dialect) -> String {
        let ident = |s: &str| quote_ident(dialect, s);
        let table = |t: &TableName| quote_ident(dialect, t.as_str());
        let filter = |p: &Option<Predicate>| match p {
            Some(p) => format!(" WHERE {}", p.render(dialect)),
            None => String::new(),
        };

        match self {
            Query::Select(q) => {
                let columns = if q.columns.is_empty() {
                    "*".to_string()
                } else {
                    comma_list(q.columns.iter().map(|c| ident(c)))
                };
                let mut sql = format!("SELECT {} FROM {}{}", columns, table(&q.table), filter(&q.filter));
                if !q.order_by.is_empty() {
                    let keys = q.order_by.iter().map(|o| {
                        format!("{} {}", ident(&o.column), if o.descending { "DESC" } else { "ASC" })
                    });
                    sql.push_str(&format!(" ORDER BY {}", comma_list(keys)));
                }
                if let Some(limit) = q.limit {
                    sql.push_str(&format!(" LIMIT {}", limit));
                }
                sql
            }
            Query::Insert(q) => {
                let rows = q.rows.iter().map(|row| {
                    format!("({})", comma_list(row.iter().map(|v| render_value(dialect, v))))
                });
                let columns = if q.columns.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", comma_list(q.columns.iter().map(|c| ident(c))))
                };
                format!(
                    "INSERT INTO {}{} VALUES {}",
                    table(&q.table),
                    columns,
                    comma_list(rows)
                )
            }
            Query::Update(q) => {
                let sets = q
                    .assignments
                    .iter()
                    .map(|(c, v)| format!("{} = {}", ident(c), render_value(dialect, v)));
                format!(
                    "UPDATE {} SET {}{}",
                    table(&q.table),
                    comma_list(sets),
                    filter(&q.filter)
                )
            }
            Query::Delete(q) => format!("DELETE FROM {}{}", table(&q.table), filter(&q.filter)),
            Query::CountRows(q) => {
                format!("SELECT COUNT(*) FROM {}{}", table(&q.table), filter(&q.filter))
            }
            Query::CountUniqueRows(q) => format!(
                "SELECT COUNT(DISTINCT {}) FROM {}{}",
                ident(&q.column),
                table(&q.table),
                filter(&q.filter)
            ),
            Query::DescribeTable(q) => match dialect {
                Dialect::MySql => format!("DESCRIBE {}", table(&q.table)),
                Dialect::Sqlite => format!("PRAGMA table_info({})", table(&q.table)),
            },
            Query::CreateTable(q) => q.render(dialect),
            Query::DropTable(q) => match dialect {
                Dialect::MySql if q.temporary => format!("DROP TEMPORARY TABLE {}", table(&q.table)),
                _ => format!("DROP TABLE {}", quote_table(dialect, &q.table, q.temporary)),
            },
            Query::ListTables => match dialect {
                Dialect::MySql => "SHOW TABLES".to_string(),
                Dialect::Sqlite => "SELECT name FROM sqlite_master WHERE type = 'table' \
                                    AND name NOT LIKE 'sqlite_%' ORDER BY name"
                    .to_string(),
            },
            Query::AddColumn(q) => format!(
                "ALTER TABLE {} ADD COLUMN {}",
                table(&q.table),
                render_column(dialect, &q.column)
            ),
            Query::DropColumn(q) => format!(
                "ALTER TABLE {} DROP COLUMN {}",
                table(&q.table),
                ident(&q.column)
            ),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Dialect::MySql))
    }
}

impl From<Select> for Query {
    fn from(q: Select) -> Self {
        Query::Select(q)
    }
}

impl From<Insert> for Query {
    fn from(q: Insert) -> Self {
        Query::Insert(q)
    }
}

impl From<Update> for Query {
    fn from(q: Update) -> Self {
        Query::Update(q)
    }
}

impl From<Delete> for Query {
    fn from(q: Delete) -> Self {
        Query::Delete(q)
    }
}

impl From<CountRows> for Query {
    fn from(q: CountRows) -> Self {
        Query::CountRows(q)
    }
}

impl From<CountUniqueRows> for Query {
    fn from(q: CountUniqueRows) -> Self {
        Query::CountUniqueRows(q)
    }
}

impl From<DescribeTable> for Query {
    fn from(q: DescribeTable) -> Self {
        Query::DescribeTable(q)
    }
}

impl From<CreateTable> for Query {
    fn from(q: CreateTable) -> Self {
        Query::CreateTable(q)
    }
}

impl From<DropTable> for Query {
    fn from(q: DropTable) -> Self {
        Query::DropTable(q)
    }
}

impl From<AddColumn> for Query {
    fn from(q: AddColumn) -> Self {
        Query::AddColumn(q)
    }
}

impl From<DropColumn> for Query {
    fn from(q: DropColumn) -> Self {
        Query::DropColumn(q)
    }
}
