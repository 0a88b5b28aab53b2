//! Network connections used to submit transfers
//!
//! This module provides:
//! - `Connection` and `ConnectionFactory` traits abstracting the node client
//! - `ConnectionPool`, a bounded set of connections shared by modulo assignment
//! - `RpcConnection` / `RpcConnectionFactory` talking JSON-RPC to a node

mod pool;
pub mod rpc;
mod service;
mod types;

pub use pool::{ConnectionPool, MAX_CONNECTIONS, pool_size};
pub use rpc::{RpcConnection, RpcConnectionFactory, STABLE_TOKEN_ADDRESS, TransferKind};
pub use service::{Connection, ConnectionFactory};
pub use types::{ConnectionError, Inclusion, Submission, TransferIntent};
