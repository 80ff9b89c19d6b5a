//! Bulk copy options and row value representation.

use crate::error::BulkError;

/// A single scalar value within a row.
///
/// This is a minimal literal representation sufficient for rendering
/// INSERT statement text; it carries no TDS wire-type information (that
/// belongs to the higher-level SQL client layer this crate sits above).
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    /// SQL NULL.
    Null,
    /// Boolean (rendered as `0`/`1`).
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Text, quoted and escaped as a SQL string literal.
    Text(String),
    /// Binary data, rendered as a `0x`-prefixed hex literal.
    Bytes(Vec<u8>),
}

impl RowValue {
    /// Render this value as a SQL literal suitable for an INSERT statement.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Bytes(b) => format!("0x{}", b.iter().map(|byte| format!("{byte:02x}")).collect::<String>()),
        }
    }
}

/// A row of values, positional against [`BulkOptions::columns`].
pub type Row = Vec<RowValue>;

/// Options controlling a [`crate::driver::BulkBatchDriver::copy`] operation.
#[derive(Debug, Clone)]
pub struct BulkOptions {
    /// Fully-qualified target table name.
    pub table: String,
    /// Ordered column names the row values are positional against.
    pub columns: Vec<String>,
    /// Maximum number of rows per batch INSERT. Must be at least 1.
    pub batch_size: usize,
    /// Whether to permit explicit values for an identity column, issuing the
    /// enabling/disabling statements around the whole operation.
    pub identity_insert: bool,
}

impl BulkOptions {
    /// Create options for inserting into `table` with the given `columns`
    /// and a default `batch_size` of 1000.
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            batch_size: 1000,
            identity_insert: false,
        }
    }

    /// Set the batch size.
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Enable or disable identity-insert handling.
    #[must_use]
    pub fn identity_insert(mut self, enabled: bool) -> Self {
        self.identity_insert = enabled;
        self
    }

    /// Validate the options themselves (not the row data).
    pub fn validate(&self) -> Result<(), BulkError> {
        if self.batch_size == 0 {
            return Err(BulkError::ExecutionError("batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Build a single multi-row `INSERT` statement for one batch.
///
/// This is ordinary SQL text submitted through the standard message path,
/// not the TDS Bulk Load wire protocol.
pub(crate) fn build_insert_statement(table: &str, columns: &[String], rows: &[Row]) -> String {
    let mut sql = format!("INSERT INTO {table} ({}) VALUES ", columns.join(", "));
    let tuples: Vec<String> = rows
        .iter()
        .map(|row| {
            let values: Vec<String> = row.iter().map(RowValue::to_sql_literal).collect();
            format!("({})", values.join(", "))
        })
        .collect();
    sql.push_str(&tuples.join(", "));
    sql
}
