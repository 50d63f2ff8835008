use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, ToSql};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{InspectError, Result};

/// Core value types for SQLite cells
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Render the value, substituting `fallback` for NULL.
    pub fn display_or(&self, fallback: &str) -> String {
        match self {
            Value::Null => fallback.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(r) => ValueRef::Real(*r),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b.as_slice()),
        }))
    }
}

static NULL: Value = Value::Null;

/// One result row, columns kept in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub columns: Vec<(String, Value)>,
}

impl Row {
    /// Value of the named column, `Null` when the column was not selected.
    pub fn get(&self, name: &str) -> &Value {
        self.columns
            .iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
            .unwrap_or(&NULL)
    }
}

/// One line of `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
}

/// Read operation over a single table
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOperation {
    pub table: String,
    /// Selected columns, every column when empty
    pub fields: Vec<String>,
    /// Equality filter `(column, value)`
    pub filter: Option<(String, Value)>,
    pub limit: Option<usize>,
}

impl ReadOperation {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            fields: Vec::new(),
            filter: None,
            limit: None,
        }
    }
    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }
    pub fn with_filter(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filter = Some((column.to_string(), value.into()));
        self
    }
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn to_sql(&self) -> (String, Vec<Value>) {
        let fields = if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields
                .iter()
                .map(|f| quote_ident(f))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut sql = format!("SELECT {fields} FROM {}", quote_ident(&self.table));
        let mut params = Vec::new();
        if let Some((column, value)) = &self.filter {
            sql.push_str(&format!(" WHERE {} = ?1", quote_ident(column)));
            params.push(value.clone());
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        (sql, params)
    }
}

/// Parent rows without any child row pointing at them
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub parent: String,
    pub parent_key: String,
    pub child: String,
    pub child_key: String,
}

impl Relation {
    pub fn new(parent: &str, parent_key: &str, child: &str, child_key: &str) -> Self {
        Self {
            parent: parent.to_string(),
            parent_key: parent_key.to_string(),
            child: child.to_string(),
            child_key: child_key.to_string(),
        }
    }
}

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Read-only handle on the inspected database
pub struct Inspector {
    conn: Connection,
}

impl Inspector {
    /// Open an existing database file read-only. Never creates the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("opening database at path: {}", path.display());
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|source| {
            InspectError::Open {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Self { conn })
    }

    /// Wrap an already opened connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        debug!(%sql, "count");
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    pub fn count_where(&self, table: &str, column: &str, value: impl Into<Value>) -> Result<i64> {
        self.ensure_columns(table, &[column])?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1",
            quote_ident(table),
            quote_ident(column)
        );
        let value = value.into();
        debug!(%sql, %value, "count_where");
        Ok(self.conn.query_row(&sql, [&value], |row| row.get(0))?)
    }

    /// Counts grouped by `column`, ordered by key with NULL first.
    pub fn count_by(&self, table: &str, column: &str) -> Result<Vec<(Value, i64)>> {
        self.ensure_columns(table, &[column])?;
        let column = quote_ident(column);
        let sql = format!(
            "SELECT {column}, COUNT(*) FROM {} GROUP BY {column} ORDER BY {column}",
            quote_ident(table)
        );
        debug!(%sql, "count_by");
        let mut stmt = self.conn.prepare(&sql)?;
        let groups = stmt.query_map([], |row| {
            Ok((Value::from(row.get_ref(0)?), row.get::<_, i64>(1)?))
        })?;
        let mut result = Vec::new();
        for group in groups {
            result.push(group?);
        }
        Ok(result)
    }

    pub fn read(&self, op: &ReadOperation) -> Result<Vec<Row>> {
        let mut columns: Vec<&str> = op.fields.iter().map(String::as_str).collect();
        if let Some((column, _)) = &op.filter {
            columns.push(column.as_str());
        }
        self.ensure_columns(&op.table, &columns)?;
        let (sql, params) = op.to_sql();
        self.query_rows(&sql, &params)
    }

    /// Column description of `table`, empty when the table does not exist.
    pub fn table_info(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1)",
        )?;
        let columns = stmt.query_map([table], |row| {
            Ok(ColumnInfo {
                cid: row.get(0)?,
                name: row.get(1)?,
                data_type: row.get(2)?,
                not_null: row.get::<_, i64>(3)? != 0,
                default_value: row.get(4)?,
                primary_key: row.get::<_, i64>(5)? != 0,
            })
        })?;
        let mut result = Vec::new();
        for column in columns {
            result.push(column?);
        }
        Ok(result)
    }

    pub fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self
            .table_info(table)?
            .iter()
            .any(|info| info.name.eq_ignore_ascii_case(column)))
    }

    /// Rows of the parent table that no child row references, with the
    /// given parent columns (all of them when `fields` is empty).
    pub fn missing_related(&self, relation: &Relation, fields: &[&str]) -> Result<Vec<Row>> {
        let mut parent_columns = fields.to_vec();
        parent_columns.push(relation.parent_key.as_str());
        self.ensure_columns(&relation.parent, &parent_columns)?;
        self.ensure_columns(&relation.child, &[relation.child_key.as_str()])?;
        let fields = if fields.is_empty() {
            "p.*".to_string()
        } else {
            fields
                .iter()
                .map(|f| format!("p.{}", quote_ident(f)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let sql = format!(
            "SELECT {fields} FROM {} p WHERE NOT EXISTS \
             (SELECT 1 FROM {} c WHERE c.{} = p.{})",
            quote_ident(&relation.parent),
            quote_ident(&relation.child),
            quote_ident(&relation.child_key),
            quote_ident(&relation.parent_key),
        );
        self.query_rows(&sql, &[])
    }

    // Double-quoted names that resolve to no column are read by SQLite as
    // string literals, so columns are checked before they reach a query.
    fn ensure_columns(&self, table: &str, columns: &[&str]) -> Result<()> {
        let info = self.table_info(table)?;
        if info.is_empty() {
            return Err(InspectError::MissingTable(table.to_string()));
        }
        for column in columns {
            if !info.iter().any(|c| c.name.eq_ignore_ascii_case(column)) {
                return Err(InspectError::MissingColumn(format!("{table}.{column}")));
            }
        }
        Ok(())
    }

    fn query_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        debug!(%sql, "query");
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut columns = Vec::with_capacity(names.len());
            for (index, name) in names.iter().enumerate() {
                columns.push((name.clone(), Value::from(row.get_ref(index)?)));
            }
            result.push(Row { columns });
        }
        Ok(result)
    }
}
