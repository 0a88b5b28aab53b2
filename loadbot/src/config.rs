//! Load generator configuration
//!
//! Defaults, overridden by `LOADBOT_*` environment variables, overridden in
//! turn by command line flags (applied by the binary).

use alloy_primitives::U256;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::connection::TransferKind;

/// Default aggregate rate in transactions per second
pub const DEFAULT_TARGET_RATE: u32 = 20;

/// Default amount per transfer, in the token's smallest unit
pub const DEFAULT_AMOUNT: u64 = 10_000_000;

/// Run configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Aggregate transactions per second to approach
    pub target_rate: u32,
    /// Amount carried by every transfer
    pub amount: U256,
    /// JSON-RPC endpoints; when empty, the environment file's are used
    pub endpoints: Vec<String>,
    /// Native value transfers or ERC-20 token transfers
    pub transfer: TransferKind,
    /// Interval between receipt polls
    pub receipt_poll_interval: Duration,
    /// Seed for recipient selection
    pub seed: Option<u64>,
    /// Prometheus listener address; metrics are not exported when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_rate: DEFAULT_TARGET_RATE,
            amount: U256::from(DEFAULT_AMOUNT),
            endpoints: Vec::new(),
            transfer: TransferKind::default(),
            receipt_poll_interval: Duration::from_secs(1),
            seed: None,
            metrics_addr: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// Unparseable values are ignored and the default kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("LOADBOT_TPS")
            && let Ok(tps) = val.trim().parse()
        {
            config.target_rate = tps;
        }
        if let Some(val) = lookup("LOADBOT_AMOUNT")
            && let Ok(amount) = val.trim().parse::<U256>()
        {
            config.amount = amount;
        }
        if let Some(val) = lookup("LOADBOT_ENDPOINTS") {
            let endpoints: Vec<String> = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !endpoints.is_empty() {
                config.endpoints = endpoints;
            }
        }
        if let Some(val) = lookup("LOADBOT_TOKEN")
            && let Ok(kind) = val.parse()
        {
            config.transfer = kind;
        }
        if let Some(val) = lookup("LOADBOT_RECEIPT_POLL_MS")
            && let Ok(ms) = val.trim().parse::<u64>()
            && ms > 0
        {
            config.receipt_poll_interval = Duration::from_millis(ms);
        }
        if let Some(val) = lookup("LOADBOT_SEED")
            && let Ok(seed) = val.trim().parse()
        {
            config.seed = Some(seed);
        }
        if let Some(val) = lookup("LOADBOT_METRICS_ADDR")
            && let Ok(addr) = val.trim().parse()
        {
            config.metrics_addr = Some(addr);
        }

        config
    }
}
