//! # tds-pool
//!
//! Generic async connection pool with pluggable lifecycle management.
//!
//! The pool itself knows nothing about SQL Server; it manages any connection
//! type that implements [`lifecycle::ConnectionLifecycle`] and is produced by
//! a [`pool::ConnectionFactory`]. `sp_reset_connection`-style cleanup on
//! return, health checks on checkout, and idle/lifetime expiry are all
//! implemented generically against those two traits.
//!
//! ## Features
//!
//! - Reset-on-return via `ConnectionLifecycle::reset`
//! - Health checks on checkout via `ConnectionLifecycle::health_check`
//! - Configurable min/max pool sizes, connection and idle timeouts
//! - Checkout metrics (success rate, health check and reset counts)
//!
//! ## Example
//!
//! ```rust,ignore
//! use tds_pool::{Pool, PoolConfig};
//!
//! let pool = Pool::builder()
//!     .connection_factory(my_factory)
//!     .min_connections(5)
//!     .max_connections(20)
//!     .build()
//!     .await?;
//!
//! let conn = pool.get().await?;
//! // Use connection...
//! // Connection is reset and returned to the pool on drop.
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod pool;

pub use config::PoolConfig;
pub use error::PoolError;
pub use lifecycle::{ConnectionLifecycle, ConnectionMetadata, ConnectionState, DynConnectionLifecycle, HealthCheckResult};
pub use pool::{ConnectionFactory, Pool, PoolBuilder, PoolMetrics, PooledConnection, PoolStatus};
