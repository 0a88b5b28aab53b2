//! Dispatch configuration and error definitions

use alloy_primitives::{Address, U256};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::account::Account;
use crate::connection::{ConnectionError, ConnectionFactory};

/// Errors that end a run
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No accounts configured")]
    NoAccounts,

    #[error("Target rate must be at least 1 tx/s, got {0}")]
    InvalidRate(u32),

    #[error("Failed to build connection: {0}")]
    Connect(#[source] ConnectionError),

    #[error("No pooled connection for worker {0}")]
    NoConnection(usize),

    #[error("Error sending transaction from {from}: {source}")]
    Submit {
        from: Address,
        #[source]
        source: ConnectionError,
    },

    #[error("Worker task failed: {0}")]
    WorkerPanicked(String),

    #[error("Run cancelled")]
    Cancelled,
}

/// Everything a run needs, fixed for its duration
#[derive(Clone)]
pub struct RunConfig {
    /// Funded accounts; each one gets a worker, and all are recipients
    pub accounts: Arc<[Account]>,
    /// Amount carried by every transfer
    pub amount: U256,
    /// Aggregate transactions per second to approach
    pub target_rate: u32,
    /// Source of the pooled connections, called once per pool slot
    pub connection_factory: Arc<dyn ConnectionFactory>,
    /// Seed for recipient selection; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl RunConfig {
    pub fn new(
        accounts: impl Into<Arc<[Account]>>,
        amount: U256,
        target_rate: u32,
        connection_factory: Arc<dyn ConnectionFactory>,
    ) -> Self {
        Self {
            accounts: accounts.into(),
            amount,
            target_rate,
            connection_factory,
            seed: None,
        }
    }

    /// Makes recipient selection reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("accounts", &self.accounts.len())
            .field("amount", &self.amount)
            .field("target_rate", &self.target_rate)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}
