//! JSON-RPC connection to a ledger node
//!
//! Transfers are built as legacy transactions, signed locally with the
//! sending account's key and submitted raw. Inclusion is detected by polling
//! for the receipt.

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::{Ethereum, ReceiptResponse, TransactionBuilder, TxSignerSync};
use alloy_primitives::{Address, Bytes, TxHash, TxKind, U256, address};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::TransactionRequest;
use alloy_sol_types::{SolCall, sol};
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::service::{Connection, ConnectionFactory};
use super::types::{ConnectionError, Inclusion, Submission, TransferIntent};
use crate::account::Account;

sol! {
    function transfer(address to, uint256 value) external returns (bool);
}

/// Stable token contract deployed at genesis on development networks
pub const STABLE_TOKEN_ADDRESS: Address = address!("0x000000000000000000000000000000000000d008");

/// What a transfer moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Plain value transfer of the native currency
    Native,
    /// ERC-20 `transfer(address,uint256)` on the given token contract
    Token(Address),
}

impl Default for TransferKind {
    fn default() -> Self {
        Self::Token(STABLE_TOKEN_ADDRESS)
    }
}

impl FromStr for TransferKind {
    type Err = String;

    /// `native`, or the token contract address
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("native") {
            return Ok(Self::Native);
        }
        s.parse::<Address>()
            .map(Self::Token)
            .map_err(|e| format!("expected `native` or a token address, got {s:?}: {e}"))
    }
}

impl TransferKind {
    /// Call target, attached value and calldata for a transfer of `amount` to `recipient`
    fn call(&self, recipient: Address, amount: U256) -> (Address, U256, Bytes) {
        match *self {
            Self::Native => (recipient, amount, Bytes::new()),
            Self::Token(token) => {
                let call = transferCall {
                    to: recipient,
                    value: amount,
                };
                (token, U256::ZERO, Bytes::from(call.abi_encode()))
            }
        }
    }
}

/// Connection to a single JSON-RPC endpoint
#[derive(Debug)]
pub struct RpcConnection {
    endpoint: String,
    provider: RootProvider<Ethereum>,
    chain_id: u64,
    transfer: TransferKind,
    poll_interval: Duration,
}

impl RpcConnection {
    /// Dial `endpoint` and fetch its chain id
    pub async fn connect(
        endpoint: &str,
        transfer: TransferKind,
        poll_interval: Duration,
    ) -> Result<Self, ConnectionError> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|e| ConnectionError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        let provider = RootProvider::<Ethereum>::new(RpcClient::builder().http(url));

        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| ConnectionError::Transport(format!("eth_chainId on {endpoint}: {e}")))?;

        info!(endpoint, chain_id, "Connected to node");

        Ok(Self {
            endpoint: endpoint.to_string(),
            provider,
            chain_id,
            transfer,
            poll_interval,
        })
    }
}

#[async_trait]
impl Connection for RpcConnection {
    async fn submit(
        &self,
        from: &Account,
        intent: &TransferIntent,
    ) -> Result<Submission, ConnectionError> {
        let sender = from.address();
        let (to, value, input) = self.transfer.call(intent.recipient, intent.amount);

        let nonce = self
            .provider
            .get_transaction_count(sender)
            .pending()
            .await
            .map_err(|e| ConnectionError::Transport(format!("eth_getTransactionCount: {e}")))?;
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| ConnectionError::Transport(format!("eth_gasPrice: {e}")))?;

        let request = TransactionRequest::default()
            .with_from(sender)
            .with_to(to)
            .with_value(value)
            .with_input(input.clone());
        let gas_limit = self
            .provider
            .estimate_gas(request)
            .await
            .map_err(|e| ConnectionError::Rejected(format!("gas estimation failed: {e}")))?;

        let mut tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(to),
            value,
            input,
        };
        let signature = from
            .signer()
            .sign_transaction_sync(&mut tx)
            .map_err(|e| ConnectionError::Signing(e.to_string()))?;
        let envelope = TxEnvelope::Legacy(tx.into_signed(signature));
        let tx_hash = *envelope.tx_hash();

        self.provider
            .send_raw_transaction(&envelope.encoded_2718())
            .await
            .map_err(|e| ConnectionError::Rejected(e.to_string()))?;

        trace!(%tx_hash, nonce, gas_limit, gas_price, "Raw transaction sent");

        let transaction = transaction_json(tx_hash, &envelope);

        Ok(Submission {
            from: sender,
            to: intent.recipient,
            amount: intent.amount,
            tx_hash,
            transaction,
        })
    }

    async fn await_inclusion(
        &self,
        submission: &Submission,
        cancel: &CancellationToken,
    ) -> Result<Inclusion, ConnectionError> {
        let tx_hash = submission.tx_hash;
        loop {
            match cancellable(cancel, self.provider.get_transaction_receipt(tx_hash)).await? {
                Ok(Some(receipt)) => {
                    return Ok(Inclusion {
                        tx_hash,
                        block_number: receipt.block_number(),
                        success: receipt.status(),
                    });
                }
                Ok(None) => {}
                // Keep polling; only cancellation ends the wait.
                Err(e) => debug!(%tx_hash, endpoint = %self.endpoint, "Receipt poll failed: {}", e),
            }

            cancellable(cancel, tokio::time::sleep(self.poll_interval)).await?;
        }
    }
}

/// JSON view of a signed transaction; `null` (with a warning) if it cannot
/// be represented
fn transaction_json<T: Serialize>(tx_hash: TxHash, tx: &T) -> serde_json::Value {
    serde_json::to_value(tx).unwrap_or_else(|e| {
        warn!(%tx_hash, "Failed to serialize signed transaction: {}", e);
        serde_json::Value::Null
    })
}

async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, ConnectionError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ConnectionError::Cancelled),
        output = fut => Ok(output),
    }
}

/// Hands out `RpcConnection`s round-robin over a list of endpoints
#[derive(Debug)]
pub struct RpcConnectionFactory {
    endpoints: Vec<String>,
    transfer: TransferKind,
    poll_interval: Duration,
    next: AtomicUsize,
}

impl RpcConnectionFactory {
    pub fn new(
        endpoints: Vec<String>,
        transfer: TransferKind,
        poll_interval: Duration,
    ) -> Result<Self, ConnectionError> {
        if endpoints.is_empty() {
            return Err(ConnectionError::InvalidEndpoint(
                "no endpoints configured".to_string(),
            ));
        }
        Ok(Self {
            endpoints,
            transfer,
            poll_interval,
            next: AtomicUsize::new(0),
        })
    }

    /// Endpoint the next `connect` call will dial
    fn next_endpoint(&self) -> &str {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[index]
    }
}

#[async_trait]
impl ConnectionFactory for RpcConnectionFactory {
    async fn connect(&self) -> Result<Arc<dyn Connection>, ConnectionError> {
        let endpoint = self.next_endpoint();
        let connection = RpcConnection::connect(endpoint, self.transfer, self.poll_interval).await?;
        Ok(Arc::new(connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_kind_parsing() {
        assert_eq!("native".parse::<TransferKind>(), Ok(TransferKind::Native));
        assert_eq!("NATIVE".parse::<TransferKind>(), Ok(TransferKind::Native));
        assert_eq!(
            "0x000000000000000000000000000000000000d008".parse::<TransferKind>(),
            Ok(TransferKind::Token(STABLE_TOKEN_ADDRESS))
        );
        assert!("stable".parse::<TransferKind>().is_err());
    }

    #[test]
    fn test_default_transfer_is_stable_token() {
        assert_eq!(
            TransferKind::default(),
            TransferKind::Token(STABLE_TOKEN_ADDRESS)
        );
    }

    #[test]
    fn test_native_call_carries_value() {
        let recipient = Address::repeat_byte(0x11);
        let (to, value, input) = TransferKind::Native.call(recipient, U256::from(42));

        assert_eq!(to, recipient);
        assert_eq!(value, U256::from(42));
        assert!(input.is_empty());
    }

    #[test]
    fn test_token_call_encodes_erc20_transfer() {
        let recipient = Address::repeat_byte(0x11);
        let (to, value, input) =
            TransferKind::Token(STABLE_TOKEN_ADDRESS).call(recipient, U256::from(10_000_000));

        assert_eq!(to, STABLE_TOKEN_ADDRESS);
        assert_eq!(value, U256::ZERO, "Token transfers attach no native value");
        // transfer(address,uint256) selector + two 32-byte words
        assert_eq!(&input[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(input.len(), 4 + 32 + 32);

        let decoded = transferCall::abi_decode(&input).expect("calldata decodes");
        assert_eq!(decoded.to, recipient);
        assert_eq!(decoded.value, U256::from(10_000_000));
    }

    #[test]
    fn test_factory_requires_endpoints() {
        let result = RpcConnectionFactory::new(vec![], TransferKind::Native, Duration::from_secs(1));
        assert!(matches!(result, Err(ConnectionError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_factory_round_robins_endpoints() {
        let factory = RpcConnectionFactory::new(
            vec!["http://a:8545".to_string(), "http://b:8545".to_string()],
            TransferKind::Native,
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(factory.next_endpoint(), "http://a:8545");
        assert_eq!(factory.next_endpoint(), "http://b:8545");
        assert_eq!(factory.next_endpoint(), "http://a:8545");
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let result =
            RpcConnection::connect("not a url", TransferKind::Native, Duration::from_secs(1)).await;
        assert!(
            matches!(result, Err(ConnectionError::InvalidEndpoint(_))),
            "Malformed URL must fail before any network access"
        );
    }

    #[test]
    fn test_transaction_json_falls_back_to_null() {
        let tx_hash = TxHash::repeat_byte(0xab);
        let json = transaction_json(tx_hash, &serde_json::json!({ "nonce": 7 }));
        assert_eq!(json["nonce"], 7);

        // Non-string map keys cannot become a JSON object
        let unrepresentable: std::collections::BTreeMap<(u8, u8), u8> = [((1, 2), 3)].into();
        assert_eq!(
            transaction_json(tx_hash, &unrepresentable),
            serde_json::Value::Null
        );
    }

    #[tokio::test]
    async fn test_cancellable_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = cancellable(&cancel, std::future::ready(1)).await;
        assert_eq!(result, Err(ConnectionError::Cancelled));
    }
}
