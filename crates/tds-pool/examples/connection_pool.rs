//! Connection pooling with metrics example.
//!
//! Demonstrates the pool against a toy in-process connection so the example
//! runs without a live server. A real caller would supply a
//! [`ConnectionFactory`] that dials a TDS connection instead.
//!
//! # Running
//!
//! ```bash
//! cargo run --example connection_pool
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tds_pool::{ConnectionFactory, ConnectionLifecycle, Pool, PoolError};
use tokio::time::Instant;

struct DemoConnection {
    id: u64,
}

impl ConnectionLifecycle for DemoConnection {
    async fn health_check(&self) -> Result<(), PoolError> {
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), PoolError> {
        Ok(())
    }

    fn is_valid(&self) -> bool {
        true
    }
}

struct DemoFactory {
    next_id: AtomicU64,
}

impl ConnectionFactory for DemoFactory {
    type Connection = DemoConnection;

    async fn connect(&self) -> Result<Self::Connection, PoolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(DemoConnection { id })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Connection Pool with Metrics Example ===\n");

    let pool = Arc::new(
        Pool::builder()
            .connection_factory(DemoFactory {
                next_id: AtomicU64::new(1),
            })
            .min_connections(2)
            .max_connections(10)
            .connection_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .build()
            .await?,
    );

    println!("Pool created with {} warm connections\n", pool.status().available);
    print_pool_status(&pool);

    println!("\n1. Basic pool usage:");
    {
        let conn = pool.get().await?;
        println!("  Checked out connection {}", conn.metadata().id);
        // Connection is automatically returned to pool when dropped.
    }

    println!("\n2. Concurrent pool usage (10 parallel checkouts):");
    let start = Instant::now();
    let mut handles = vec![];
    for i in 0..10 {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            let conn = pool.get().await?;
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, PoolError>((i, conn.metadata().id))
        }));
    }

    let mut completed = 0;
    for handle in handles {
        if handle.await?.is_ok() {
            completed += 1;
        }
    }
    println!("  Completed {completed} checkouts in {:?}", start.elapsed());

    print_pool_metrics(&pool);

    println!("\n3. Pool health monitoring:");
    let status = pool.status();
    let utilization = status.utilization() * 100.0;
    let health_status = if utilization < 70.0 {
        "HEALTHY"
    } else if utilization < 90.0 {
        "WARNING"
    } else {
        "CRITICAL"
    };
    println!("  Pool health: {health_status}");
    println!("  Utilization: {utilization:.1}%");

    println!("\n4. Graceful shutdown:");
    pool.close().await;
    println!("  Pool closed.");

    Ok(())
}

fn print_pool_status(pool: &Pool<DemoFactory>) {
    let status = pool.status();
    println!(
        "  Status: {}/{} connections ({:.1}% utilization)",
        status.in_use,
        status.total,
        status.utilization() * 100.0
    );
}

fn print_pool_metrics(pool: &Pool<DemoFactory>) {
    let metrics = pool.metrics();
    println!("  Metrics:");
    println!("    Connections created: {}", metrics.connections_created);
    println!("    Connections closed: {}", metrics.connections_closed);
    println!(
        "    Checkout success rate: {:.2}%",
        metrics.checkout_success_rate() * 100.0
    );
    println!(
        "    Health checks: {} performed, {} failed",
        metrics.health_checks_performed, metrics.health_checks_failed
    );
    println!(
        "    Resets: {} performed, {} failed",
        metrics.resets_performed, metrics.resets_failed
    );
}
