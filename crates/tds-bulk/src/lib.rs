//! # tds-bulk — bounded-batch bulk insert submission engine
//!
//! Fragments a row set into bounded batches, executes each on a single
//! connection acquired from a pool, and reports a summary. Each batch is a
//! single multi-row `INSERT` submitted through the ordinary SQL text path —
//! this is not the TDS Bulk Load (BCP) wire protocol.
//!
//! A failing batch is not retried and prior batches are not rolled back:
//! the driver has no way to safely disambiguate why the server rejected a
//! batch, so it leaves that decision to the caller.
//!
//! ```no_run
//! use tds_bulk::{BulkBatchDriver, BulkOptions, RowValue};
//!
//! # async fn run<F: tds_pool::ConnectionFactory>(pool: tds_pool::Pool<F>) -> Result<(), tds_bulk::BulkError>
//! # where F::Connection: tds_bulk::SqlExecutor {
//! let driver = BulkBatchDriver::new(pool);
//! let options = BulkOptions::new("dbo.Events", vec!["id".into(), "payload".into()]).batch_size(500);
//! let rows = vec![vec![RowValue::Int(1), RowValue::Text("hello".into())]];
//! let summary = driver.copy(rows, &options, None).await?;
//! println!("{} rows in {} batches", summary.total_rows, summary.batches_executed);
//! # Ok(())
//! # }
//! ```

mod driver;
mod error;
mod options;

pub use driver::{BulkBatchDriver, SqlExecutor, Summary};
pub use error::BulkError;
pub use options::{BulkOptions, Row, RowValue};
