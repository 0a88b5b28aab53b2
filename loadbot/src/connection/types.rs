//! Connection-related types and error definitions

use alloy_primitives::{Address, TxHash, U256};
use serde::Serialize;
use thiserror::Error;

/// Errors reported by a connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Failed to sign transaction: {0}")]
    Signing(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Recipient and amount of the next transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferIntent {
    pub recipient: Address,
    pub amount: U256,
}

/// Result of a successful submission
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    /// Sending account
    pub from: Address,
    /// Receiving account
    pub to: Address,
    /// Transferred amount
    pub amount: U256,
    /// Hash of the submitted transaction
    #[serde(rename = "txhash")]
    pub tx_hash: TxHash,
    /// Implementation-specific view of the submitted transaction
    pub transaction: serde_json::Value,
}

/// Confirmation that a submitted transaction was included in a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inclusion {
    /// Hash of the included transaction
    pub tx_hash: TxHash,
    /// Block holding the transaction, when the node reports it
    pub block_number: Option<u64>,
    /// Execution status reported by the receipt
    pub success: bool,
}
