//! Bounded connection pool
//!
//! Connections are built once, sequentially, before any worker starts.
//! Workers are bound by static modulo assignment, so the pool needs no
//! coordination after construction.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::service::{Connection, ConnectionFactory};
use super::types::ConnectionError;

/// Upper bound on the number of live connections
pub const MAX_CONNECTIONS: usize = 50;

/// Number of connections to build for `account_count` accounts
pub fn pool_size(account_count: usize) -> usize {
    account_count.min(MAX_CONNECTIONS)
}

/// Read-only set of connections shared across workers
#[derive(Clone)]
pub struct ConnectionPool {
    connections: Arc<[Arc<dyn Connection>]>,
}

impl ConnectionPool {
    /// Build `size` connections, failing on the first factory error.
    ///
    /// Connections built before the failure are dropped; no partial pool is
    /// returned.
    pub async fn build(
        factory: &dyn ConnectionFactory,
        size: usize,
    ) -> Result<Self, ConnectionError> {
        let mut connections = Vec::with_capacity(size);
        for index in 0..size {
            let connection = factory.connect().await.inspect_err(|e| {
                warn!("Failed to build connection {}/{}: {}", index + 1, size, e);
            })?;
            connections.push(connection);
        }

        debug!(size, "Connection pool ready");
        Ok(Self {
            connections: connections.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Slot assigned to the worker at `index`, or `None` for an empty pool
    pub fn slot(&self, index: usize) -> Option<usize> {
        index.checked_rem(self.connections.len())
    }

    /// Connection assigned to the worker at `index`
    pub fn get(&self, index: usize) -> Option<Arc<dyn Connection>> {
        self.slot(index).map(|slot| Arc::clone(&self.connections[slot]))
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("size", &self.connections.len())
            .finish()
    }
}
