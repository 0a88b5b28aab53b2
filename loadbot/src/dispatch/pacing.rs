//! Pacing arithmetic and cancellable waits

use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use super::types::DispatchError;

/// Shortens the cycle period to absorb per-send overhead (the round trip
/// that happens before the pacing window starts). Empirical.
pub const OVERHEAD_COMPENSATION: f64 = 0.95;

/// Per-account timing derived from the account count and target rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Time each account waits between the starts of consecutive sends
    pub cycle_period: Duration,
    /// Delay between successive worker launches
    pub start_stagger: Duration,
}

impl Pacing {
    /// `cycle = trunc(trunc(accounts * 1000 / rate) * 0.95)` ms, and the
    /// stagger spreads worker starts evenly across one cycle.
    ///
    /// An empty account list or a zero rate would divide by zero; both are
    /// rejected.
    pub fn new(account_count: usize, target_rate: u32) -> Result<Self, DispatchError> {
        if account_count == 0 {
            return Err(DispatchError::NoAccounts);
        }
        if target_rate == 0 {
            return Err(DispatchError::InvalidRate(target_rate));
        }

        let per_account_ms = (account_count as u64 * 1000) / u64::from(target_rate);
        let cycle_ms = (per_account_ms as f64 * OVERHEAD_COMPENSATION) as u64;
        let cycle_period = Duration::from_millis(cycle_ms);
        let start_stagger =
            Duration::from_nanos((cycle_period.as_nanos() / account_count as u128) as u64);

        Ok(Self {
            cycle_period,
            start_stagger,
        })
    }
}

/// Sleep until `deadline` unless `cancel` fires first.
///
/// A deadline in the past returns immediately. Cancellation wins ties.
pub async fn wait_until(cancel: &CancellationToken, deadline: Instant) -> Result<(), DispatchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DispatchError::Cancelled),
        _ = sleep_until(deadline) => Ok(()),
    }
}

/// Sleep for `duration` unless `cancel` fires first
pub async fn wait_for(cancel: &CancellationToken, duration: Duration) -> Result<(), DispatchError> {
    wait_until(cancel, Instant::now() + duration).await
}
