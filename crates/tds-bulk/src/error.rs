//! Error types for the bulk batch engine.

use thiserror::Error;

/// Errors that can occur during a [`crate::driver::BulkBatchDriver::copy`] operation.
#[derive(Debug, Error)]
pub enum BulkError {
    /// A row's value count does not match `columns.len()`. Raised before any
    /// connection is acquired or I/O performed.
    #[error("row {row_index} has {actual} values, expected {expected} to match columns")]
    ColumnCountMismatch {
        /// Index of the offending row.
        row_index: usize,
        /// Expected value count (`columns.len()`).
        expected: usize,
        /// Actual value count found.
        actual: usize,
    },

    /// The server rejected a batch (constraint violation, deadlock, syntax
    /// error). Surfaced verbatim; prior batches remain durable.
    #[error("batch execution failed: {0}")]
    ExecutionError(String),

    /// The connection was lost mid-operation. Treated like
    /// [`BulkError::ExecutionError`] by callers: prior batches are durable,
    /// the pooled handle must be discarded.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// Acquiring a connection from the pool failed.
    #[error("failed to acquire a connection: {0}")]
    Pool(#[from] tds_pool::PoolError),
}

impl BulkError {
    /// Whether this error indicates the underlying connection should be
    /// discarded rather than returned to the pool.
    #[must_use]
    pub fn discards_connection(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }
}
