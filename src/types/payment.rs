//! Payment-related types shared by the coordinator and transfer gateways

use super::expense::ExpenseId;
use super::identity::Identity;
use rust_decimal::Decimal;
use thiserror::Error;

/// One member's share of one expense, selected for payment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Obligation {
    pub expense: ExpenseId,
    pub payer: Identity,
}

impl Obligation {
    pub fn new(expense: ExpenseId, payer: Identity) -> Self {
        Obligation { expense, payer }
    }
}

/// A single value transfer handed to the external transfer mechanism
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub from: Identity,
    pub to: Identity,
    pub amount: Decimal,
    /// Human-readable note describing what the transfer pays for
    pub memo: String,
}

/// Confirmation returned by a transfer gateway once funds have moved
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    /// Gateway-assigned reference for the transfer
    pub reference: u64,
    pub amount: Decimal,
}

/// Failure reported by a transfer gateway
///
/// A gateway returning this error guarantees that no funds moved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct TransferError {
    pub reason: String,
}

impl TransferError {
    pub fn new(reason: impl Into<String>) -> Self {
        TransferError {
            reason: reason.into(),
        }
    }
}
