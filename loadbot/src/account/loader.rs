//! Environment directory loading
//!
//! An environment directory holds an `env.json` describing the funded
//! developer accounts and, optionally, the node endpoints to dial:
//!
//! ```json
//! {
//!   "accounts": [{ "address": "0x…", "privateKey": "0x…" }],
//!   "endpoints": ["http://127.0.0.1:8545"]
//! }
//! ```

use alloy_primitives::Address;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::types::{Account, AccountError};

/// File name looked up inside the environment directory
pub const ENV_FILE_NAME: &str = "env.json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvironmentFile {
    #[serde(default)]
    accounts: Vec<AccountEntry>,
    #[serde(default)]
    endpoints: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountEntry {
    /// Optional; checked against the key-derived address when present
    #[serde(default)]
    address: Option<Address>,
    private_key: String,
}

/// Accounts and endpoints read from an environment directory
#[derive(Debug, Clone)]
pub struct Environment {
    /// Funded accounts, in file order
    pub accounts: Vec<Account>,
    /// Node JSON-RPC endpoints (may be empty)
    pub endpoints: Vec<String>,
}

/// Load `<dir>/env.json`
pub fn load_environment(dir: &Path) -> Result<Environment, AccountError> {
    let path = dir.join(ENV_FILE_NAME);
    if !path.is_file() {
        return Err(AccountError::NotFound(path));
    }

    let raw = fs::read_to_string(&path)?;
    let file: EnvironmentFile =
        serde_json::from_str(&raw).map_err(|e| AccountError::Malformed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    if file.accounts.is_empty() {
        return Err(AccountError::NoAccounts);
    }

    let accounts = file
        .accounts
        .into_iter()
        .enumerate()
        .map(|(index, entry)| parse_entry(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        "Loaded {} accounts and {} endpoints from {:?}",
        accounts.len(),
        file.endpoints.len(),
        path
    );

    Ok(Environment {
        accounts,
        endpoints: file.endpoints,
    })
}

fn parse_entry(index: usize, entry: AccountEntry) -> Result<Account, AccountError> {
    let account: Account = entry
        .private_key
        .parse()
        .map_err(|reason| AccountError::InvalidKey { index, reason })?;

    if let Some(declared) = entry.address
        && declared != account.address()
    {
        return Err(AccountError::AddressMismatch {
            index,
            declared,
            derived: account.address(),
        });
    }

    debug!(index, address = %account.address(), "Loaded account");
    Ok(account)
}
