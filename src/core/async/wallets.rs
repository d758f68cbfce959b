//! Thread-safe in-memory wallets
//!
//! This module provides `InMemoryWallets`, a `TransferGateway` that simulates the
//! external value-transfer mechanism with a balance per identity.
//!
//! # Design
//!
//! Balances live in a `DashMap`, so transfers between unrelated identities do not
//! block each other. A transfer first debits the sender under the sender's entry
//! lock, then credits the recipient. Only one entry lock is held at a time, so
//! concurrent transfers in opposite directions cannot deadlock.

use crate::core::traits::TransferGateway;
use crate::types::{Identity, TransferError, TransferReceipt, TransferRequest};
use dashmap::{DashMap, DashSet};
use log::debug;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Simulated wallets keyed by identity
#[derive(Debug, Default)]
pub struct InMemoryWallets {
    balances: DashMap<Identity, Decimal>,
    /// Recipients whose transfers are rejected
    rejected: DashSet<Identity>,
    next_reference: AtomicU64,
    latency: Option<Duration>,
}

impl InMemoryWallets {
    /// Create wallets with no funds
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every transfer by `latency` before it settles
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add `amount` to the wallet of `identity`
    pub fn fund(&self, identity: &Identity, amount: Decimal) -> Result<(), TransferError> {
        if amount.is_sign_negative() {
            return Err(TransferError::new(format!(
                "cannot fund {identity} with negative amount {amount}"
            )));
        }
        let mut balance = self.balances.entry(identity.clone()).or_insert(Decimal::ZERO);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::new(format!("wallet of {identity} would overflow")))?;
        Ok(())
    }

    /// Current wallet balance, 0 for unknown identities
    pub fn balance(&self, identity: &Identity) -> Decimal {
        self.balances
            .get(identity)
            .map(|balance| *balance)
            .unwrap_or(Decimal::ZERO)
    }

    /// Make every future transfer addressed to `identity` fail
    pub fn reject_transfers_to(&self, identity: &Identity) {
        self.rejected.insert(identity.clone());
    }

    /// Snapshot of every wallet
    pub fn get_all_balances(&self) -> Vec<(Identity, Decimal)> {
        self.balances
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, TransferError> {
        if request.amount.is_sign_negative() {
            return Err(TransferError::new(format!(
                "negative transfer amount {}",
                request.amount
            )));
        }
        if self.rejected.contains(&request.to) {
            return Err(TransferError::new(format!(
                "recipient {} rejected the transfer",
                request.to
            )));
        }

        {
            let mut sender = self
                .balances
                .get_mut(&request.from)
                .ok_or_else(|| TransferError::new(format!("{} has no wallet", request.from)))?;
            if *sender < request.amount {
                return Err(TransferError::new(format!(
                    "insufficient funds: {} holds {}, needs {}",
                    request.from,
                    *sender,
                    request.amount
                )));
            }
            *sender -= request.amount;
        }

        let mut recipient = self
            .balances
            .entry(request.to.clone())
            .or_insert(Decimal::ZERO);
        // Cannot overflow: total funds in the system are bounded by earlier funding
        *recipient = recipient.saturating_add(request.amount);

        let reference = self.next_reference.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Transfer #{}: {} -> {} amount {} ({})",
            reference, request.from, request.to, request.amount, request.memo
        );
        Ok(TransferReceipt {
            reference,
            amount: request.amount,
        })
    }
}

impl TransferGateway for InMemoryWallets {
    async fn send(&self, request: TransferRequest) -> Result<TransferReceipt, TransferError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.transfer(&request)
    }
}
