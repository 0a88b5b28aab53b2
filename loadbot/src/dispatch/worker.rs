//! Per-account send loop
//!
//! Each iteration: pick a target, submit, wait for inclusion, then sleep out
//! the rest of the cycle. An inclusion wait that overruns the cycle is not
//! compensated by a burst; the account simply falls behind for that cycle.

use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::pacing::wait_until;
use super::selector::TargetSelector;
use super::stats::RunStats;
use super::types::DispatchError;
use crate::account::Account;
use crate::connection::{Connection, ConnectionError, Inclusion, Submission};

/// Send/wait/pace loop for one account, bound to one connection for its
/// whole lifetime
pub struct Worker {
    index: usize,
    account: Account,
    connection: Arc<dyn Connection>,
    selector: Arc<TargetSelector>,
    stats: Arc<RunStats>,
    cycle_period: Duration,
}

impl Worker {
    pub fn new(
        index: usize,
        account: Account,
        connection: Arc<dyn Connection>,
        selector: Arc<TargetSelector>,
        stats: Arc<RunStats>,
        cycle_period: Duration,
    ) -> Self {
        Self {
            index,
            account,
            connection,
            selector,
            stats,
            cycle_period,
        }
    }

    /// Loop until `cancel` fires (`Cancelled`) or a submission fails
    /// (`Submit`). Never returns `Ok`.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), DispatchError> {
        gauge!("loadbot_workers_active").increment(1.0);
        debug!(worker = self.index, account = %self.account.address(), "Worker started");

        let result = self.send_loop(&cancel).await;

        gauge!("loadbot_workers_active").decrement(1.0);
        if let Err(ref err) = result {
            debug!(worker = self.index, "Worker stopped: {}", err);
        }
        result
    }

    async fn send_loop(&self, cancel: &CancellationToken) -> Result<(), DispatchError> {
        loop {
            let send_start = Instant::now();
            let intent = self.selector.next();

            let submitted = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
                submitted = self.connection.submit(&self.account, &intent) => submitted,
            };
            let submission = match submitted {
                Ok(submission) => submission,
                Err(ConnectionError::Cancelled) => return Err(DispatchError::Cancelled),
                Err(source) => {
                    self.stats.record_failed();
                    counter!("loadbot_transfers_failed_total").increment(1);
                    return Err(DispatchError::Submit {
                        from: self.account.address(),
                        source,
                    });
                }
            };
            self.report(&submission);

            let wait_start = Instant::now();
            let included = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ConnectionError::Cancelled),
                included = self.connection.await_inclusion(&submission, cancel) => included,
            };
            match included {
                Ok(inclusion) => self.record_inclusion(&inclusion, wait_start.elapsed()),
                // Surfaces through the pacing wait below.
                Err(ConnectionError::Cancelled) => {}
                Err(err) => warn!(
                    worker = self.index,
                    txhash = %submission.tx_hash,
                    "Inclusion wait failed: {}",
                    err
                ),
            }

            wait_until(cancel, send_start + self.cycle_period).await?;
        }
    }

    fn report(&self, submission: &Submission) {
        self.stats.record_submitted();
        counter!("loadbot_transfers_submitted_total").increment(1);

        info!(
            from = %submission.from,
            to = %submission.to,
            amount = %submission.amount,
            txhash = %submission.tx_hash,
            "transfer generated"
        );
        match serde_json::to_string_pretty(submission) {
            Ok(dump) => debug!(txhash = %submission.tx_hash, "submission:\n{}", dump),
            Err(e) => debug!(txhash = %submission.tx_hash, "Failed to serialize submission: {}", e),
        }
    }

    fn record_inclusion(&self, inclusion: &Inclusion, waited: Duration) {
        self.stats.record_included();
        counter!("loadbot_transfers_included_total").increment(1);
        histogram!("loadbot_inclusion_wait_seconds").record(waited);

        if inclusion.success {
            debug!(
                worker = self.index,
                txhash = %inclusion.tx_hash,
                block = ?inclusion.block_number,
                waited_ms = waited.as_millis() as u64,
                "transfer included"
            );
        } else {
            warn!(
                worker = self.index,
                txhash = %inclusion.tx_hash,
                block = ?inclusion.block_number,
                "transfer included but reverted"
            );
        }
    }
}
