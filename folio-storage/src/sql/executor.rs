//! The driver seam: parameterized statement execution.

use std::collections::HashMap;

use folio_core::{FolioResult, StorageError, Timestamp};

/// A bind parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    I32(i32),
    I64(i64),
    Bool(bool),
    Text(String),
    Timestamp(Timestamp),
}

impl SqlValue {
    pub fn opt_i32(value: Option<i32>) -> SqlValue {
        value.map(SqlValue::I32).unwrap_or(SqlValue::Null)
    }

    pub fn opt_text(value: Option<&str>) -> SqlValue {
        value
            .map(|s| SqlValue::Text(s.to_string()))
            .unwrap_or(SqlValue::Null)
    }

    pub fn opt_timestamp(value: Option<Timestamp>) -> SqlValue {
        value.map(SqlValue::Timestamp).unwrap_or(SqlValue::Null)
    }
}

/// One result row, with typed column accessors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    columns: HashMap<String, SqlValue>,
}

impl SqlRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: SqlValue) -> Self {
        self.columns.insert(column.to_string(), value);
        self
    }

    fn raw(&self, entity: &'static str, column: &str) -> FolioResult<&SqlValue> {
        self.columns.get(column).ok_or_else(|| {
            StorageError::MalformedRow {
                entity,
                reason: format!("missing column {}", column),
            }
            .into()
        })
    }

    fn type_error(entity: &'static str, column: &str, expected: &str) -> folio_core::FolioError {
        StorageError::MalformedRow {
            entity,
            reason: format!("column {} is not {}", column, expected),
        }
        .into()
    }

    pub fn i32(&self, entity: &'static str, column: &str) -> FolioResult<i32> {
        match self.raw(entity, column)? {
            SqlValue::I32(v) => Ok(*v),
            SqlValue::I64(v) => Ok(*v as i32),
            _ => Err(Self::type_error(entity, column, "an integer")),
        }
    }

    pub fn opt_i32(&self, entity: &'static str, column: &str) -> FolioResult<Option<i32>> {
        match self.raw(entity, column)? {
            SqlValue::Null => Ok(None),
            SqlValue::I32(v) => Ok(Some(*v)),
            SqlValue::I64(v) => Ok(Some(*v as i32)),
            _ => Err(Self::type_error(entity, column, "an integer")),
        }
    }

    pub fn i64(&self, entity: &'static str, column: &str) -> FolioResult<i64> {
        match self.raw(entity, column)? {
            SqlValue::I32(v) => Ok(*v as i64),
            SqlValue::I64(v) => Ok(*v),
            _ => Err(Self::type_error(entity, column, "an integer")),
        }
    }

    pub fn bool(&self, entity: &'static str, column: &str) -> FolioResult<bool> {
        match self.raw(entity, column)? {
            SqlValue::Bool(v) => Ok(*v),
            // engines without a boolean type store 0/1
            SqlValue::I32(v) => Ok(*v != 0),
            _ => Err(Self::type_error(entity, column, "a boolean")),
        }
    }

    pub fn text(&self, entity: &'static str, column: &str) -> FolioResult<String> {
        match self.raw(entity, column)? {
            SqlValue::Text(v) => Ok(v.clone()),
            _ => Err(Self::type_error(entity, column, "text")),
        }
    }

    pub fn opt_text(&self, entity: &'static str, column: &str) -> FolioResult<Option<String>> {
        match self.raw(entity, column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(v) => Ok(Some(v.clone())),
            _ => Err(Self::type_error(entity, column, "text")),
        }
    }

    pub fn timestamp(&self, entity: &'static str, column: &str) -> FolioResult<Timestamp> {
        match self.raw(entity, column)? {
            SqlValue::Timestamp(v) => Ok(*v),
            _ => Err(Self::type_error(entity, column, "a timestamp")),
        }
    }

    pub fn opt_timestamp(
        &self,
        entity: &'static str,
        column: &str,
    ) -> FolioResult<Option<Timestamp>> {
        match self.raw(entity, column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Timestamp(v) => Ok(Some(*v)),
            _ => Err(Self::type_error(entity, column, "a timestamp")),
        }
    }
}

/// Executes parameterized statements against a relational engine.
///
/// This is where a concrete driver attaches. Implementations map driver
/// errors to [`StorageError::Unavailable`] (connectivity) or
/// [`StorageError::IntegrityViolation`] (constraint) so callers can tell
/// infrastructure failures from data failures.
pub trait SqlExecutor: Send + Sync {
    /// Run a statement returning rows.
    fn query(&self, sql: &str, params: &[SqlValue]) -> FolioResult<Vec<SqlRow>>;

    /// Run a statement returning an affected-row count.
    fn execute(&self, sql: &str, params: &[SqlValue]) -> FolioResult<u64>;

    /// Open a transaction on the current connection.
    fn begin(&self) -> FolioResult<()>;

    /// Commit the open transaction.
    fn commit(&self) -> FolioResult<()>;

    /// Roll back the open transaction.
    fn rollback(&self) -> FolioResult<()>;
}
