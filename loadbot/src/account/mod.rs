//! Funded accounts driving the load
//!
//! This module provides:
//! - `Account`, an address paired with the key that signs its transfers
//! - `load_environment` for reading accounts and node endpoints from an
//!   environment directory

mod loader;
mod types;

pub use loader::{ENV_FILE_NAME, Environment, load_environment};
pub use types::{Account, AccountError};
