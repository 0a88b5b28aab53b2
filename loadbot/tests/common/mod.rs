//! Common Test Utilities for Integration Tests
//!
//! Scripted connection doubles that record every submission with the
//! (paused) tokio clock, so pacing and binding can be asserted exactly.

#![allow(dead_code)]

use alloy_primitives::{Address, B256, U256};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use loadbot::account::Account;
use loadbot::connection::{
    Connection, ConnectionError, ConnectionFactory, Inclusion, Submission, TransferIntent,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// `n` distinct accounts with deterministic keys
pub fn test_accounts(n: usize) -> Vec<Account> {
    (0..n)
        .map(|i| {
            let mut key = [0u8; 32];
            key[0] = 0x01;
            key[24..].copy_from_slice(&(i as u64 + 1).to_be_bytes());
            let signer = PrivateKeySigner::from_bytes(&B256::from(key)).expect("valid test key");
            Account::new(signer)
        })
        .collect()
}

/// One accepted submission
#[derive(Debug, Clone)]
pub struct SendRecord {
    pub connection: usize,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub at: Instant,
}

/// Behaviour shared by every connection a factory builds
#[derive(Debug)]
pub struct Script {
    sends: Mutex<Vec<SendRecord>>,
    attempts: AtomicUsize,
    attempts_by_sender: Mutex<HashMap<Address, usize>>,
    /// 1-based submission attempt that fails, counted across all connections
    fail_on: Option<(usize, ConnectionError)>,
    /// 1-based submission attempt of one sender that fails
    fail_on_sender: Option<(Address, usize, ConnectionError)>,
    inclusion_delay: Duration,
}

impl Script {
    pub fn new() -> Self {
        Self {
            sends: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            attempts_by_sender: Mutex::new(HashMap::new()),
            fail_on: None,
            fail_on_sender: None,
            inclusion_delay: Duration::ZERO,
        }
    }

    pub fn failing_on(mut self, attempt: usize, error: ConnectionError) -> Self {
        self.fail_on = Some((attempt, error));
        self
    }

    pub fn failing_on_sender(mut self, from: Address, attempt: usize, error: ConnectionError) -> Self {
        self.fail_on_sender = Some((from, attempt, error));
        self
    }

    pub fn with_inclusion_delay(mut self, delay: Duration) -> Self {
        self.inclusion_delay = delay;
        self
    }

    pub fn sends(&self) -> Vec<SendRecord> {
        self.sends.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Send times of `from`, in order
    pub fn send_times(&self, from: Address) -> Vec<Instant> {
        self.sends()
            .into_iter()
            .filter(|r| r.from == from)
            .map(|r| r.at)
            .collect()
    }
}

pub struct ScriptedConnection {
    id: usize,
    script: Arc<Script>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn submit(
        &self,
        from: &Account,
        intent: &TransferIntent,
    ) -> Result<Submission, ConnectionError> {
        let attempt = self.script.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let sender_attempt = {
            let mut by_sender = self.script.attempts_by_sender.lock().unwrap();
            let count = by_sender.entry(from.address()).or_insert(0);
            *count += 1;
            *count
        };
        if let Some((fail_on, ref error)) = self.script.fail_on
            && attempt == fail_on
        {
            return Err(error.clone());
        }
        if let Some((sender, fail_on, ref error)) = self.script.fail_on_sender
            && sender == from.address()
            && sender_attempt == fail_on
        {
            return Err(error.clone());
        }

        self.script.sends.lock().unwrap().push(SendRecord {
            connection: self.id,
            from: from.address(),
            to: intent.recipient,
            amount: intent.amount,
            at: Instant::now(),
        });

        Ok(Submission {
            from: from.address(),
            to: intent.recipient,
            amount: intent.amount,
            tx_hash: B256::from(U256::from(attempt)),
            transaction: serde_json::json!({ "connection": self.id, "attempt": attempt }),
        })
    }

    async fn await_inclusion(
        &self,
        submission: &Submission,
        cancel: &CancellationToken,
    ) -> Result<Inclusion, ConnectionError> {
        if !self.script.inclusion_delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ConnectionError::Cancelled),
                _ = tokio::time::sleep(self.script.inclusion_delay) => {}
            }
        }
        Ok(Inclusion {
            tx_hash: submission.tx_hash,
            block_number: Some(1),
            success: true,
        })
    }
}

/// Factory numbering its connections in build order
pub struct ScriptedFactory {
    script: Arc<Script>,
    builds: AtomicUsize,
    /// 1-based build attempt that fails
    fail_at: Option<(usize, ConnectionError)>,
    connect_delay: Duration,
}

impl ScriptedFactory {
    pub fn new(script: Arc<Script>) -> Self {
        Self {
            script,
            builds: AtomicUsize::new(0),
            fail_at: None,
            connect_delay: Duration::ZERO,
        }
    }

    /// Every `connect` call takes `delay`
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn failing_at(mut self, build: usize, error: ConnectionError) -> Self {
        self.fail_at = Some((build, error));
        self
    }

    /// Build attempts so far, including a failed one
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for ScriptedFactory {
    async fn connect(&self) -> Result<Arc<dyn Connection>, ConnectionError> {
        let build = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if let Some((fail_at, ref error)) = self.fail_at
            && build == fail_at
        {
            return Err(error.clone());
        }
        Ok(Arc::new(ScriptedConnection {
            id: build - 1,
            script: Arc::clone(&self.script),
        }))
    }
}
