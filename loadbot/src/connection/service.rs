//! Connection trait definitions

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::types::{ConnectionError, Inclusion, Submission, TransferIntent};
use crate::account::Account;

/// A live client handle able to submit signed transfers and report inclusion.
///
/// One connection is driven by several workers at once, so both operations
/// must be safe to call concurrently.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Sign a transfer from `from` and submit it
    async fn submit(
        &self,
        from: &Account,
        intent: &TransferIntent,
    ) -> Result<Submission, ConnectionError>;

    /// Block until the submission is included or `cancel` fires.
    ///
    /// There is no timeout: a transaction that is never included keeps the
    /// caller waiting until cancellation.
    async fn await_inclusion(
        &self,
        submission: &Submission,
        cancel: &CancellationToken,
    ) -> Result<Inclusion, ConnectionError>;
}

/// Builds connections for the pool
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn Connection>, ConnectionError>;
}
