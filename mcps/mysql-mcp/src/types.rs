//! Type definitions for the MySQL MCP server

use thiserror::Error;

// ============================================================================
// Row Types
// ============================================================================

/// A single column value as read from the result set
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    /// Raw bytes from binary columns, or text that was not valid UTF-8
    Binary(Vec<u8>),
}

/// One result row, keyed by column name in result-set order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Rows fetched for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultBatch {
    /// At most `max_rows` rows
    pub rows: Vec<Row>,
    /// Whether the result set had at least one row past the cap
    pub more_rows: bool,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MysqlError {
    #[error("missing required environment variables: {}", .missing.join(", "))]
    Configuration { missing: Vec<&'static str> },

    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),
}

pub type MysqlResult<T> = Result<T, MysqlError>;
