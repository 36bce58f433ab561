use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ExportError, Result};

/// Core value types returned by SQLite queries
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Numeric view of the value; `None` for NULL, text and blobs
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<SqlValue> for Value {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::Integer(i),
            SqlValue::Real(r) => Value::Real(r),
            SqlValue::Text(s) => Value::Text(s),
            SqlValue::Blob(b) => Value::Blob(b),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            // same text as the CSV writer, so reals keep their `.0`
            Value::Real(r) => f.write_str(ryu::Buffer::new().format(*r)),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => {
                f.write_str("x'")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                f.write_str("'")
            }
        }
    }
}

/// One result row, in the statement's column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// SQLite store configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
}

impl SqliteConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

/// Thin access layer over one on-disk SQLite database.
///
/// No connection is held between calls: every operation opens its own
/// connection and drops it before returning, including on error.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    config: SqliteConfig,
}

impl SqliteStore {
    pub fn new(config: SqliteConfig) -> Self {
        Self { config }
    }

    /// Shorthand for `SqliteStore::new(SqliteConfig::new(path))`
    pub fn open(db_path: impl Into<PathBuf>) -> Self {
        Self::new(SqliteConfig::new(db_path))
    }

    pub fn path(&self) -> &Path {
        &self.config.db_path
    }

    /// Opens a connection to an existing database file. A missing file is an
    /// error rather than an empty store.
    fn connect(&self) -> Result<Connection> {
        debug!("opening sqlite store at {}", self.config.db_path.display());
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Ok(Connection::open_with_flags(&self.config.db_path, flags)?)
    }

    /// Runs a literal statement and returns every result row.
    ///
    /// The statement is not parameterized; callers must not pass untrusted
    /// input.
    pub fn execute(&self, statement: &str) -> Result<Vec<Row>> {
        let conn = self.connect()?;
        let rows = query_rows(&conn, statement)?;
        debug!("statement returned {} rows: {}", rows.len(), statement);
        Ok(rows)
    }

    /// Names of all user tables in the store, sorted
    pub fn tables(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        table_names(&conn)
    }

    /// Column names of `table_name` in physical order
    pub fn columns(&self, table_name: &str) -> Result<Vec<String>> {
        let conn = self.connect()?;
        if !table_names(&conn)?.iter().any(|t| t == table_name) {
            return Err(ExportError::TableNotFound {
                table: table_name.to_string(),
            });
        }

        let sql = format!("PRAGMA table_info({})", quote_identifier(table_name));
        let mut stmt = conn.prepare(&sql)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }
}

fn query_rows(conn: &Connection, statement: &str) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(statement)?;
    let column_count = stmt.column_count();
    let mut rows = stmt.query([])?;

    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(Value::from(row.get::<_, SqlValue>(i)?));
        }
        result.push(Row::new(values));
    }
    Ok(result)
}

fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Quotes `name` as an SQL identifier
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
