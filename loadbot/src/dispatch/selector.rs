//! Recipient selection
//!
//! Recipients are drawn uniformly from the full account list, the sender
//! included. The amount never varies within a run.

use alloy_primitives::{Address, U256};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex, PoisonError};

use crate::connection::TransferIntent;

/// Chooses the recipient and amount of each transfer.
///
/// Shared by every worker of a run; the random source sits behind a mutex
/// held only for a single draw.
#[derive(Debug)]
pub struct TargetSelector {
    recipients: Arc<[Address]>,
    amount: U256,
    rng: Mutex<ChaCha8Rng>,
}

impl TargetSelector {
    /// # Panics
    ///
    /// `next` panics if `recipients` is empty.
    pub fn new(recipients: impl Into<Arc<[Address]>>, amount: U256, rng: ChaCha8Rng) -> Self {
        Self {
            recipients: recipients.into(),
            amount,
            rng: Mutex::new(rng),
        }
    }

    /// Reproducible selector
    pub fn seeded(recipients: impl Into<Arc<[Address]>>, amount: U256, seed: u64) -> Self {
        Self::new(recipients, amount, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy(recipients: impl Into<Arc<[Address]>>, amount: U256) -> Self {
        Self::seeded(recipients, amount, rand::random())
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    /// Next transfer: uniformly random recipient, fixed amount
    pub fn next(&self) -> TransferIntent {
        let index = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.random_range(0..self.recipients.len())
        };
        TransferIntent {
            recipient: self.recipients[index],
            amount: self.amount,
        }
    }
}
