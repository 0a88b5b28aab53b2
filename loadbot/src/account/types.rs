//! Account types and error definitions

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when loading accounts
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Environment file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Malformed environment file {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Invalid private key for account {index}: {reason}")]
    InvalidKey { index: usize, reason: String },

    #[error("Account {index}: declared address {declared} does not match key address {derived}")]
    AddressMismatch {
        index: usize,
        declared: Address,
        derived: Address,
    },

    #[error("Environment defines no accounts")]
    NoAccounts,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A funded account: its public address and the key that signs its transfers.
///
/// Accounts are immutable for the duration of a run and are shared read-only
/// between the dispatcher and the workers.
#[derive(Clone)]
pub struct Account {
    address: Address,
    signer: PrivateKeySigner,
}

impl Account {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self {
            address: signer.address(),
            signer,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Signing credential for transfers sent from this account
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl From<PrivateKeySigner> for Account {
    fn from(signer: PrivateKeySigner) -> Self {
        Self::new(signer)
    }
}

impl FromStr for Account {
    type Err = String;

    /// Parse a hex-encoded private key (with or without `0x`)
    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let signer: PrivateKeySigner = key.trim().parse().map_err(|e| format!("{e}"))?;
        Ok(Self::new(signer))
    }
}

// Never print the key.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
