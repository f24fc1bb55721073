//! Database Pool Adapter
//!
//! Implements the `ConnectionPool` port on a `sqlx` any-driver pool, so the
//! database URL scheme picks the backend (`postgres://`, `sqlite:`).

use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyPool, Connection};

use crate::domain::ports::{ConnectionPool, PooledConnection};
use crate::error::Result;

/// Connection pool backed by `sqlx`
#[derive(Debug, Clone)]
pub struct SqlxConnectionPool {
    pool: AnyPool,
}

impl SqlxConnectionPool {
    /// Build a pool that opens connections on first use.
    pub fn connect_lazy(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)?;

        Ok(Self { pool })
    }
}

/// Leased connection; dropping it returns the connection to the pool.
struct SqlxLease {
    connection: PoolConnection<Any>,
}

#[async_trait]
impl PooledConnection for SqlxLease {
    async fn is_open(&mut self) -> Result<bool> {
        self.connection.ping().await?;
        Ok(true)
    }
}

#[async_trait]
impl ConnectionPool for SqlxConnectionPool {
    async fn acquire(&self) -> Result<Box<dyn PooledConnection>> {
        let connection = self.pool.acquire().await?;
        Ok(Box::new(SqlxLease { connection }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::PoolProbe;
    use crate::domain::ports::DependencyProbe;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sqlite_memory_pool_is_open() {
        let pool = SqlxConnectionPool::connect_lazy("sqlite::memory:", 1, Duration::from_secs(2))
            .unwrap();

        let mut lease = pool.acquire().await.unwrap();
        assert!(lease.is_open().await.unwrap());
    }

    #[tokio::test]
    async fn test_pool_probe_over_sqlite() {
        let pool = SqlxConnectionPool::connect_lazy("sqlite::memory:", 1, Duration::from_secs(2))
            .unwrap();
        let probe = PoolProbe::new(Arc::new(pool), Duration::from_secs(2));

        // Single-connection pool: the second check only succeeds if the
        // first lease was released
        assert!(probe.probe().await);
        assert!(probe.probe().await);
    }

    #[tokio::test]
    async fn test_unreachable_database() {
        let pool = SqlxConnectionPool::connect_lazy(
            "postgres://vitals@127.0.0.1:1/vitals",
            1,
            Duration::from_millis(300),
        )
        .unwrap();

        assert_matches!(pool.acquire().await.err(), Some(Error::Pool(_)));
    }
}
