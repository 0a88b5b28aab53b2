//! Loadbot Library
//!
//! Generates a steady stream of signed value transfers between a set of
//! funded accounts. Each account runs its own send loop, paced so the
//! aggregate rate approaches a target, over a bounded pool of shared node
//! connections.

pub mod account;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod shutdown;

// Re-export commonly used types
pub use account::{Account, AccountError, Environment, load_environment};
pub use config::Config;
pub use connection::{
    Connection, ConnectionError, ConnectionFactory, ConnectionPool, RpcConnectionFactory,
    TransferKind,
};
pub use dispatch::{DispatchError, Dispatcher, RunConfig, RunStats};
