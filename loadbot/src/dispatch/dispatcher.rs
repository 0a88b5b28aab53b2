//! Run orchestration

use alloy_primitives::Address;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::group::TaskGroup;
use super::pacing::{Pacing, wait_for};
use super::selector::TargetSelector;
use super::stats::RunStats;
use super::types::{DispatchError, RunConfig};
use super::worker::Worker;
use crate::connection::{ConnectionPool, pool_size};

/// Drives one load-generation run over a fixed set of accounts
#[derive(Debug)]
pub struct Dispatcher {
    config: RunConfig,
    stats: Arc<RunStats>,
}

impl Dispatcher {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            stats: Arc::new(RunStats::new()),
        }
    }

    /// Counters for the current (or last) run
    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    /// Run until `cancel` fires or a worker fails.
    ///
    /// Builds `min(accounts, 50)` connections up front, abandoning the build
    /// if `cancel` fires; worker `i` uses connection `i % pool size`. Workers
    /// start one stagger apart so the first sends are spread over a full
    /// cycle. Returns the first worker
    /// error, or `Cancelled` on external cancellation. All launched workers
    /// have finished by the time this returns.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), DispatchError> {
        let accounts = &self.config.accounts;
        let pacing = Pacing::new(accounts.len(), self.config.target_rate)?;

        let pool = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Cancelled while building connections");
                return Err(DispatchError::Cancelled);
            }
            built = ConnectionPool::build(
                self.config.connection_factory.as_ref(),
                pool_size(accounts.len()),
            ) => built.map_err(DispatchError::Connect)?,
        };

        let recipients: Arc<[Address]> = accounts.iter().map(|a| a.address()).collect();
        let selector = Arc::new(match self.config.seed {
            Some(seed) => TargetSelector::seeded(recipients, self.config.amount, seed),
            None => TargetSelector::from_entropy(recipients, self.config.amount),
        });

        info!(
            accounts = accounts.len(),
            connections = pool.len(),
            target_rate = self.config.target_rate,
            cycle_ms = pacing.cycle_period.as_millis() as u64,
            stagger_us = pacing.start_stagger.as_micros() as u64,
            amount = %selector.amount(),
            "Starting dispatch"
        );

        let mut group = TaskGroup::new(cancel);
        for (index, account) in accounts.iter().enumerate() {
            if wait_for(group.token(), pacing.start_stagger).await.is_err() {
                warn!(launched = index, "Cancelled while launching workers");
                group.wait().await?;
                return Err(DispatchError::Cancelled);
            }

            let connection = pool.get(index).ok_or(DispatchError::NoConnection(index))?;
            let worker = Worker::new(
                index,
                account.clone(),
                connection,
                Arc::clone(&selector),
                Arc::clone(&self.stats),
                pacing.cycle_period,
            );
            let token = group.token().clone();
            group.spawn(worker.run(token));
        }

        info!(workers = group.len(), "All workers launched");
        group.wait().await
    }
}
