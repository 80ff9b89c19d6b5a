//! The bulk batch submission engine.

use std::time::{Duration, Instant};

use tds_pool::{ConnectionFactory, Pool};

use crate::error::BulkError;
use crate::options::{BulkOptions, Row, build_insert_statement};

/// A connection capable of executing raw SQL text and reporting affected
/// row counts. Implemented by whatever connection type the pool manages;
/// this crate has no notion of the wire protocol beneath it.
#[allow(async_fn_in_trait)]
pub trait SqlExecutor: Send {
    /// Execute `sql`, returning the number of rows affected.
    async fn execute(&mut self, sql: &str) -> Result<u64, BulkError>;
}

/// Summary of a completed (or partially completed, on error) `copy`.
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    /// Total rows submitted across all executed batches.
    pub total_rows: usize,
    /// Number of batches that executed successfully.
    pub batches_executed: usize,
    /// Wall-clock duration of the whole operation.
    pub duration: Duration,
    /// Whether identity-insert was enabled for this operation.
    pub identity_insert: bool,
}

/// Drives a bounded-batch bulk insert against a single pooled connection.
///
/// Per-batch execution is all-or-nothing: a failing batch leaves every
/// previously executed batch durable and aborts the remaining ones. There
/// is no retry at this layer — the caller decides what failure modes are
/// safe to retry.
pub struct BulkBatchDriver<F: ConnectionFactory>
where
    F::Connection: SqlExecutor,
{
    pool: Pool<F>,
}

impl<F: ConnectionFactory> BulkBatchDriver<F>
where
    F::Connection: SqlExecutor,
{
    /// Create a driver that acquires connections from `pool`.
    pub fn new(pool: Pool<F>) -> Self {
        Self { pool }
    }

    /// Copy `rows` into `options.table`, `batch_size` rows at a time.
    ///
    /// `after_batch_hook`, if present, runs after each successful batch with
    /// the live connection and the 0-based batch index; a hook error aborts
    /// the operation with that error, skipping any identity-insert restore.
    pub async fn copy(
        &self,
        rows: Vec<Row>,
        options: &BulkOptions,
        mut after_batch_hook: Option<&mut (dyn FnMut(&mut F::Connection, usize) -> Result<(), BulkError> + Send)>,
    ) -> Result<Summary, BulkError> {
        options.validate()?;

        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != options.columns.len() {
                return Err(BulkError::ColumnCountMismatch {
                    row_index,
                    expected: options.columns.len(),
                    actual: row.len(),
                });
            }
        }

        let start = Instant::now();
        let mut conn = self.pool.get().await?;

        if options.identity_insert {
            conn.execute(&format!("SET IDENTITY_INSERT {} ON", options.table)).await?;
        }

        let result = self.run_batches(&mut conn, &rows, options, &mut after_batch_hook).await;

        if options.identity_insert {
            if let Err(e) = conn.execute(&format!("SET IDENTITY_INSERT {} OFF", options.table)).await {
                tracing::warn!(error = %e, "best-effort identity_insert restore failed");
            }
        }

        result.map(|batches_executed| Summary {
            total_rows: rows.len(),
            batches_executed,
            duration: start.elapsed(),
            identity_insert: options.identity_insert,
        })
    }

    async fn run_batches(
        &self,
        conn: &mut F::Connection,
        rows: &[Row],
        options: &BulkOptions,
        after_batch_hook: &mut Option<&mut (dyn FnMut(&mut F::Connection, usize) -> Result<(), BulkError> + Send)>,
    ) -> Result<usize, BulkError> {
        let mut executed = 0;
        for (batch_index, chunk) in rows.chunks(options.batch_size).enumerate() {
            let sql = build_insert_statement(&options.table, &options.columns, chunk);
            conn.execute(&sql).await?;
            executed += 1;

            if let Some(hook) = after_batch_hook.as_deref_mut() {
                hook(conn, batch_index)?;
            }
        }
        Ok(executed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tds_pool::{ConnectionLifecycle, PoolError};

    struct MockConnection {
        closed: Arc<AtomicBool>,
        executed: Arc<std::sync::Mutex<Vec<String>>>,
        fail_on_substring: Option<&'static str>,
    }

    impl ConnectionLifecycle for MockConnection {
        async fn health_check(&self) -> Result<(), PoolError> {
            Ok(())
        }
        async fn reset(&mut self) -> Result<(), PoolError> {
            Ok(())
        }
        fn is_valid(&self) -> bool {
            !self.closed.load(Ordering::SeqCst)
        }
    }

    impl SqlExecutor for MockConnection {
        async fn execute(&mut self, sql: &str) -> Result<u64, BulkError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(BulkError::ConnectionLost("connection closed by hook".into()));
            }
            if let Some(needle) = self.fail_on_substring {
                if sql.contains(needle) {
                    return Err(BulkError::ExecutionError("CHECK constraint violated".into()));
                }
            }
            self.executed.lock().unwrap().push(sql.to_string());
            Ok(1)
        }
    }

    struct MockFactory {
        closed: Arc<AtomicBool>,
        executed: Arc<std::sync::Mutex<Vec<String>>>,
        fail_on_substring: Option<&'static str>,
    }

    impl MockFactory {
        fn new() -> Self {
            Self {
                closed: Arc::new(AtomicBool::new(false)),
                executed: Arc::new(std::sync::Mutex::new(Vec::new())),
                fail_on_substring: None,
            }
        }
    }

    impl ConnectionFactory for MockFactory {
        type Connection = MockConnection;

        async fn connect(&self) -> Result<Self::Connection, PoolError> {
            Ok(MockConnection {
                closed: Arc::clone(&self.closed),
                executed: Arc::clone(&self.executed),
                fail_on_substring: self.fail_on_substring,
            })
        }
    }

    fn row(n: i64) -> Row {
        vec![crate::options::RowValue::Int(n)]
    }

    #[tokio::test]
    async fn copy_reports_ceil_batches_and_total_rows() {
        let factory = MockFactory::new();
        let executed = Arc::clone(&factory.executed);
        let pool = Pool::builder().connection_factory(factory).max_connections(1).build().await.unwrap();
        let driver = BulkBatchDriver::new(pool);

        let options = BulkOptions::new("dbo.Nums", vec!["n".into()]).batch_size(3);
        let rows: Vec<Row> = (0..10).map(row).collect();

        let summary = driver.copy(rows, &options, None).await.unwrap();
        assert_eq!(summary.total_rows, 10);
        assert_eq!(summary.batches_executed, 4); // ceil(10/3)
        assert_eq!(executed.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn column_count_mismatch_rejected_before_any_io() {
        let pool = Pool::builder()
            .connection_factory(MockFactory::new())
            .max_connections(1)
            .build()
            .await
            .unwrap();
        let driver = BulkBatchDriver::new(pool);

        let options = BulkOptions::new("dbo.Nums", vec!["a".into(), "b".into()]);
        let rows = vec![vec![crate::options::RowValue::Int(1)]]; // only 1 value, need 2

        let err = driver.copy(rows, &options, None).await.unwrap_err();
        assert!(matches!(err, BulkError::ColumnCountMismatch { row_index: 0, expected: 2, actual: 1 }));
        assert_eq!(driver.pool.metrics().checkouts_successful, 0, "no connection should be acquired");
    }

    #[tokio::test]
    async fn failing_batch_leaves_prior_batches_durable_and_aborts_remaining() {
        let mut factory = MockFactory::new();
        factory.fail_on_substring = Some("(1)"); // second row's value triggers the "constraint"
        let executed = Arc::clone(&factory.executed);
        let pool = Pool::builder().connection_factory(factory).max_connections(1).build().await.unwrap();
        let driver = BulkBatchDriver::new(pool);

        let options = BulkOptions::new("dbo.Nums", vec!["n".into()]).batch_size(1);
        let rows = vec![row(0), row(1), row(2)];

        let err = driver.copy(rows, &options, None).await.unwrap_err();
        assert!(matches!(err, BulkError::ExecutionError(_)));
        assert_eq!(executed.lock().unwrap().len(), 1, "only the first batch should have executed");
    }

    #[tokio::test]
    async fn hook_closing_connection_aborts_with_connection_lost() {
        let factory = MockFactory::new();
        let closed = Arc::clone(&factory.closed);
        let executed = Arc::clone(&factory.executed);
        let pool = Pool::builder().connection_factory(factory).max_connections(1).build().await.unwrap();
        let driver = BulkBatchDriver::new(pool);

        let options = BulkOptions::new("dbo.Nums", vec!["n".into()]).batch_size(3);
        let rows: Vec<Row> = (0..10).map(row).collect();

        let closed_for_hook = Arc::clone(&closed);
        let mut hook = move |_conn: &mut MockConnection, batch_index: usize| -> Result<(), BulkError> {
            if batch_index == 0 {
                closed_for_hook.store(true, Ordering::SeqCst);
            }
            Ok(())
        };

        let err = driver.copy(rows, &options, Some(&mut hook)).await.unwrap_err();
        assert!(matches!(err, BulkError::ConnectionLost(_)));
        assert_eq!(executed.lock().unwrap().len(), 1, "exactly the first batch of 3 rows should be durable");
    }

    #[tokio::test]
    async fn identity_insert_brackets_the_operation() {
        let factory = MockFactory::new();
        let executed = Arc::clone(&factory.executed);
        let pool = Pool::builder().connection_factory(factory).max_connections(1).build().await.unwrap();
        let driver = BulkBatchDriver::new(pool);

        let options = BulkOptions::new("dbo.Nums", vec!["n".into()]).batch_size(5).identity_insert(true);
        let summary = driver.copy(vec![row(1)], &options, None).await.unwrap();

        assert!(summary.identity_insert);
        let log = executed.lock().unwrap();
        assert!(log[0].contains("IDENTITY_INSERT dbo.Nums ON"));
        assert!(log.last().unwrap().contains("IDENTITY_INSERT dbo.Nums OFF"));
    }
}
