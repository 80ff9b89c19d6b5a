//! Connection pool integration tests.
//!
//! These exercise [`Pool`] end-to-end against an in-process mock connection,
//! so they run without any external server.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tds_pool::{ConnectionFactory, ConnectionLifecycle, Pool, PoolConfig, PoolError};

struct MockConnection {
    id: u64,
    reset_count: u32,
    fail_reset: bool,
}

impl ConnectionLifecycle for MockConnection {
    async fn health_check(&self) -> Result<(), PoolError> {
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), PoolError> {
        self.reset_count += 1;
        if self.fail_reset {
            Err(PoolError::ResetFailed("mock reset failure".into()))
        } else {
            Ok(())
        }
    }

    fn is_valid(&self) -> bool {
        true
    }
}

struct MockFactory {
    next_id: AtomicU64,
    fail_reset: bool,
}

impl MockFactory {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            fail_reset: false,
        }
    }
}

impl ConnectionFactory for MockFactory {
    type Connection = MockConnection;

    async fn connect(&self) -> Result<Self::Connection, PoolError> {
        Ok(MockConnection {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            reset_count: 0,
            fail_reset: self.fail_reset,
        })
    }
}

#[tokio::test]
async fn checkout_and_checkin_reuses_connection() {
    let pool = Pool::builder()
        .connection_factory(MockFactory::new())
        .max_connections(3)
        .build()
        .await
        .unwrap();

    let conn = pool.get().await.unwrap();
    let id = conn.metadata().id;
    drop(conn);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.status().available, 1);

    let conn = pool.get().await.unwrap();
    assert_eq!(conn.metadata().id, id);
}

#[tokio::test]
async fn concurrent_checkouts_respect_max_connections() {
    let factory = MockFactory::new();
    let pool = Arc::new(
        Pool::builder()
            .connection_factory(factory)
            .max_connections(4)
            .build()
            .await
            .unwrap(),
    );

    let mut handles = Vec::new();
    for _ in 0..20 {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            let conn = pool.get().await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
            drop(conn);
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    let status = pool.status();
    assert!(status.total <= 4, "total {} exceeded max_connections", status.total);
    assert!(pool.metrics().connections_created <= 4);
}

#[tokio::test]
async fn try_get_does_not_block_at_capacity() {
    let pool = Pool::builder()
        .connection_factory(MockFactory::new())
        .max_connections(1)
        .build()
        .await
        .unwrap();

    let _held = pool.get().await.unwrap();
    let result = pool.try_get().await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn get_times_out_when_no_connections_free() {
    let pool = Pool::builder()
        .connection_factory(MockFactory::new())
        .max_connections(1)
        .connection_timeout(Duration::from_millis(30))
        .build()
        .await
        .unwrap();

    let _held = pool.get().await.unwrap();
    let err = pool.get().await.unwrap_err();
    assert!(matches!(err, PoolError::Timeout(_)));
}

#[tokio::test]
async fn detach_removes_connection_from_pool_bookkeeping() {
    let pool = Pool::builder()
        .connection_factory(MockFactory::new())
        .max_connections(1)
        .build()
        .await
        .unwrap();

    let conn = pool.get().await.unwrap();
    let inner = conn.detach();
    assert_eq!(inner.id, 1);

    // The permit is freed immediately on detach, not after a reset round trip.
    let conn2 = pool.get().await.unwrap();
    drop(conn2);
}

#[tokio::test]
async fn failed_reset_discards_connection_instead_of_reusing_it() {
    let factory = MockFactory {
        fail_reset: true,
        ..MockFactory::new()
    };
    let pool = Pool::builder()
        .connection_factory(factory)
        .config(PoolConfig::new().max_connections(2).sp_reset_connection(true))
        .build()
        .await
        .unwrap();

    let conn = pool.get().await.unwrap();
    drop(conn);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.status().available, 0, "connection with a failed reset should not return to idle");
    assert_eq!(pool.metrics().resets_failed, 1);
}

#[tokio::test]
async fn closed_pool_rejects_new_checkouts_but_existing_ones_finish() {
    let pool = Pool::builder()
        .connection_factory(MockFactory::new())
        .max_connections(2)
        .build()
        .await
        .unwrap();

    let conn = pool.get().await.unwrap();
    pool.close().await;

    assert!(matches!(pool.get().await.unwrap_err(), PoolError::PoolClosed));
    drop(conn); // does not panic even though the pool is closed
}

#[tokio::test]
async fn metrics_reflect_checkout_outcomes() {
    let pool = Pool::builder()
        .connection_factory(MockFactory::new())
        .max_connections(2)
        .build()
        .await
        .unwrap();

    let c1 = pool.get().await.unwrap();
    let c2 = pool.get().await.unwrap();
    drop(c1);
    drop(c2);

    let metrics = pool.metrics();
    assert_eq!(metrics.checkouts_successful, 2);
    assert_eq!(metrics.checkouts_failed, 0);
    assert!((metrics.checkout_success_rate() - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn builder_rejects_missing_factory() {
    let result = Pool::<MockFactory>::builder().max_connections(2).build().await;
    assert!(matches!(result, Err(PoolError::Configuration(_))));
}
