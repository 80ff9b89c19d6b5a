//! Connection pool implementation.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::lifecycle::{ConnectionLifecycle, ConnectionMetadata};

/// Creates new connections on demand.
///
/// The pool never constructs connections itself; it asks a factory, so the
/// same pool machinery works for any [`ConnectionLifecycle`] implementation
/// (a real network connection in production, a recording stub in tests).
#[allow(async_fn_in_trait)]
pub trait ConnectionFactory: Send + Sync {
    /// The connection type this factory produces.
    type Connection: ConnectionLifecycle;

    /// Establish a new connection.
    async fn connect(&self) -> Result<Self::Connection, PoolError>;
}

/// A generic connection pool.
///
/// The pool manages a bounded set of connections, providing automatic reuse,
/// health checking on checkout, and `Drop`-based return-to-pool. Concurrency
/// is bounded by a [`tokio::sync::Semaphore`] sized to
/// [`PoolConfig::max_connections`]: a permit is held for the lifetime of a
/// checkout (whether the connection is freshly created or reused from idle)
/// and released the moment the connection is checked back in, so the total
/// number of live connections never exceeds the configured maximum.
pub struct Pool<F: ConnectionFactory> {
    shared: Arc<Shared<F>>,
}

impl<F: ConnectionFactory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<F: ConnectionFactory> {
    factory: F,
    config: PoolConfig,
    semaphore: Arc<Semaphore>,
    idle: Mutex<VecDeque<Idle<F::Connection>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    metrics: Metrics,
}

struct Idle<C> {
    conn: C,
    metadata: ConnectionMetadata,
}

#[derive(Default)]
struct Metrics {
    connections_created: AtomicU64,
    connections_closed: AtomicU64,
    checkouts_successful: AtomicU64,
    checkouts_failed: AtomicU64,
    health_checks_performed: AtomicU64,
    health_checks_failed: AtomicU64,
    resets_performed: AtomicU64,
    resets_failed: AtomicU64,
}

/// Builder for [`Pool`].
pub struct PoolBuilder<F: ConnectionFactory> {
    factory: Option<F>,
    config: PoolConfig,
}

impl<F: ConnectionFactory> PoolBuilder<F> {
    fn new() -> Self {
        Self {
            factory: None,
            config: PoolConfig::default(),
        }
    }

    /// Set the connection factory. Required before [`PoolBuilder::build`].
    #[must_use]
    pub fn connection_factory(mut self, factory: F) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Set the minimum number of connections.
    #[must_use]
    pub fn min_connections(mut self, count: u32) -> Self {
        self.config.min_connections = count;
        self
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub fn max_connections(mut self, count: u32) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the connection acquisition timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Replace the whole configuration at once.
    #[must_use]
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the pool.
    ///
    /// Eagerly establishes [`PoolConfig::min_connections`] connections so the
    /// pool starts warm; if any of them fail the whole call fails.
    pub async fn build(self) -> Result<Pool<F>, PoolError> {
        let factory = self
            .factory
            .ok_or_else(|| PoolError::Configuration("connection_factory is required".into()))?;
        Pool::new(factory, self.config).await
    }
}

impl<F: ConnectionFactory> Default for PoolBuilder<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ConnectionFactory> Pool<F> {
    /// Start building a pool.
    #[must_use]
    pub fn builder() -> PoolBuilder<F> {
        PoolBuilder::new()
    }

    /// Create a pool, eagerly establishing `config.min_connections` idle
    /// connections.
    pub async fn new(factory: F, config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            factory,
            semaphore: Arc::new(Semaphore::new(config.max_connections as usize)),
            config,
            idle: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            metrics: Metrics::default(),
        });

        let min = shared.config.min_connections;
        for _ in 0..min {
            let permit = Arc::clone(&shared.semaphore)
                .try_acquire_owned()
                .map_err(|_| PoolError::Configuration("max_connections < min_connections".into()))?;
            let (conn, metadata) = Self::create(&shared).await?;
            drop(permit);
            shared.idle.lock().push_back(Idle { conn, metadata });
        }

        Ok(Self { shared })
    }

    async fn create(shared: &Shared<F>) -> Result<(F::Connection, ConnectionMetadata), PoolError> {
        let conn = shared.factory.connect().await?;
        let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
        shared.metrics.connections_created.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(connection_id = id, "created pooled connection");
        Ok((conn, ConnectionMetadata::new(id)))
    }

    /// Acquire a connection, waiting up to `config.connection_timeout` for
    /// one to become available.
    pub async fn get(&self) -> Result<PooledConnection<F>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }

        let permit = tokio::time::timeout(
            self.shared.config.connection_timeout,
            Arc::clone(&self.shared.semaphore).acquire_owned(),
        )
        .await
        .map_err(|_| PoolError::Timeout(self.shared.config.connection_timeout))?
        .map_err(|_| PoolError::PoolClosed)?;

        self.checkout_with_permit(permit).await
    }

    /// Acquire a connection without waiting; returns `Ok(None)` if the pool
    /// is at capacity rather than blocking.
    pub async fn try_get(&self) -> Result<Option<PooledConnection<F>>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }

        let permit = match Arc::clone(&self.shared.semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => return Ok(None),
        };

        self.checkout_with_permit(permit).await.map(Some)
    }

    async fn checkout_with_permit(&self, permit: OwnedSemaphorePermit) -> Result<PooledConnection<F>, PoolError> {
        let reused = self.shared.idle.lock().pop_front();

        let (mut conn, mut metadata) = match reused {
            Some(Idle { conn, metadata }) => (conn, metadata),
            None => match Self::create(&self.shared).await {
                Ok(pair) => pair,
                Err(e) => {
                    self.shared.metrics.checkouts_failed.fetch_add(1, Ordering::Relaxed);
                    return Err(e);
                }
            },
        };

        if self.shared.config.test_on_checkout {
            self.shared.metrics.health_checks_performed.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = conn.health_check().await {
                self.shared.metrics.health_checks_failed.fetch_add(1, Ordering::Relaxed);
                self.shared.metrics.checkouts_failed.fetch_add(1, Ordering::Relaxed);
                self.shared.metrics.connections_closed.fetch_add(1, Ordering::Relaxed);
                return Err(PoolError::UnhealthyConnection(e.to_string()));
            }
        }

        metadata.mark_checkout();
        self.shared.metrics.checkouts_successful.fetch_add(1, Ordering::Relaxed);

        Ok(PooledConnection {
            pool: self.shared.clone(),
            conn: Some(conn),
            metadata,
            permit: Some(permit),
        })
    }

    /// Current pool occupancy.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let available = self.shared.semaphore.available_permits() as u32;
        let max = self.shared.config.max_connections;
        let in_use = max.saturating_sub(available);
        PoolStatus {
            available: self.shared.idle.lock().len() as u32,
            in_use,
            total: max.saturating_sub(available) + self.shared.idle.lock().len() as u32,
            max,
        }
    }

    /// Snapshot pool lifecycle counters.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        let m = &self.shared.metrics;
        PoolMetrics {
            connections_created: m.connections_created.load(Ordering::Relaxed),
            connections_closed: m.connections_closed.load(Ordering::Relaxed),
            checkouts_successful: m.checkouts_successful.load(Ordering::Relaxed),
            checkouts_failed: m.checkouts_failed.load(Ordering::Relaxed),
            health_checks_performed: m.health_checks_performed.load(Ordering::Relaxed),
            health_checks_failed: m.health_checks_failed.load(Ordering::Relaxed),
            resets_performed: m.resets_performed.load(Ordering::Relaxed),
            resets_failed: m.resets_failed.load(Ordering::Relaxed),
        }
    }

    /// Close the pool, dropping all idle connections. Checked-out
    /// connections are dropped (not reset) when they are returned afterward.
    pub async fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        let drained = self.shared.idle.lock().drain(..).count();
        self.shared
            .metrics
            .connections_closed
            .fetch_add(drained as u64, Ordering::Relaxed);
        tracing::info!(drained, "connection pool closed");
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    /// Number of idle connections available for immediate reuse.
    pub available: u32,
    /// Number of connections currently checked out.
    pub in_use: u32,
    /// Total number of live connections (idle + in use).
    pub total: u32,
    /// Maximum allowed connections.
    pub max: u32,
}

impl PoolStatus {
    /// Fraction of the pool's capacity currently checked out, in `[0.0, 1.0]`.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            f64::from(self.in_use) / f64::from(self.max)
        }
    }
}

/// Point-in-time snapshot of pool lifecycle counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolMetrics {
    /// Connections created over the pool's lifetime.
    pub connections_created: u64,
    /// Connections closed (health-check failure, reset failure, or pool close).
    pub connections_closed: u64,
    /// Checkouts that returned a usable connection.
    pub checkouts_successful: u64,
    /// Checkouts that failed (timeout, creation failure, health check failure).
    pub checkouts_failed: u64,
    /// Health checks run on checkout.
    pub health_checks_performed: u64,
    /// Health checks that failed.
    pub health_checks_failed: u64,
    /// `reset` calls run on checkin.
    pub resets_performed: u64,
    /// `reset` calls that failed.
    pub resets_failed: u64,
}

impl PoolMetrics {
    /// Fraction of checkouts that succeeded, in `[0.0, 1.0]`. Returns `1.0`
    /// when no checkouts have happened yet.
    #[must_use]
    pub fn checkout_success_rate(&self) -> f64 {
        let total = self.checkouts_successful + self.checkouts_failed;
        if total == 0 {
            1.0
        } else {
            self.checkouts_successful as f64 / total as f64
        }
    }
}

/// A connection checked out from the pool.
///
/// When dropped, the connection is reset (if configured) and returned to the
/// pool on a detached task, since `Drop` cannot be async. A connection that
/// fails its reset is discarded rather than returned.
pub struct PooledConnection<F: ConnectionFactory> {
    pool: Arc<Shared<F>>,
    conn: Option<F::Connection>,
    metadata: ConnectionMetadata,
    permit: Option<OwnedSemaphorePermit>,
}

impl<F: ConnectionFactory> PooledConnection<F> {
    /// Borrow the underlying connection.
    pub fn as_ref(&self) -> &F::Connection {
        self.conn.as_ref().expect("connection taken only on drop or detach")
    }

    /// Mutably borrow the underlying connection.
    pub fn as_mut(&mut self) -> &mut F::Connection {
        self.conn.as_mut().expect("connection taken only on drop or detach")
    }

    /// Metadata describing this checkout (id, checkout count, state).
    #[must_use]
    pub fn metadata(&self) -> &ConnectionMetadata {
        &self.metadata
    }

    /// Detach the connection from the pool, returning the inner connection.
    /// It will not be reset or returned to the pool; the semaphore permit it
    /// held is released immediately, freeing a slot for a new connection.
    pub fn detach(mut self) -> F::Connection {
        self.pool.metrics.connections_closed.fetch_add(1, Ordering::Relaxed);
        self.permit.take();
        self.conn.take().expect("connection present until detach/drop")
    }
}

impl<F: ConnectionFactory> std::ops::Deref for PooledConnection<F> {
    type Target = F::Connection;

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}

impl<F: ConnectionFactory> std::ops::DerefMut for PooledConnection<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut()
    }
}

impl<F> Drop for PooledConnection<F>
where
    F: ConnectionFactory + 'static,
    F::Connection: 'static,
{
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        let Some(permit) = self.permit.take() else {
            return;
        };
        let mut metadata = self.metadata.clone();
        let pool = Arc::clone(&self.pool);

        tokio::spawn(async move {
            let _permit = permit;
            let mut conn = conn;
            let should_reset = pool.config.sp_reset_connection && !pool.closed.load(Ordering::SeqCst);

            let healthy = if should_reset {
                pool.metrics.resets_performed.fetch_add(1, Ordering::Relaxed);
                match conn.reset().await {
                    Ok(()) => true,
                    Err(e) => {
                        pool.metrics.resets_failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(error = %e, "connection reset failed, discarding");
                        false
                    }
                }
            } else {
                conn.is_valid()
            };

            if healthy && !pool.closed.load(Ordering::SeqCst) {
                metadata.mark_checkin();
                pool.idle.lock().push_back(Idle { conn, metadata });
            } else {
                pool.metrics.connections_closed.fetch_add(1, Ordering::Relaxed);
            }
        });
    }
}
