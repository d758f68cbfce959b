//! Reward credit management
//!
//! This module provides the `RewardLedger` struct which tracks the reward credit
//! each identity has earned by settling its shares.
//!
//! The RewardLedger is responsible for:
//! - Accumulating credit per identity (never decreasing)
//! - Keeping the history of individual awards
//! - Rebuilding the totals from the expense table for audits

use crate::core::ledger::ExpenseLedger;
use crate::types::{ExpenseId, Identity};
use std::collections::HashMap;

/// Credit awarded for each share marked paid
pub const REWARD_PER_PAYMENT: u64 = 100;

/// A single award of reward credit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardEntry {
    pub identity: Identity,
    /// Expense whose share earned the award
    pub expense: ExpenseId,
    pub amount: u64,
}

/// Accumulated reward credit per identity
#[derive(Debug, Default)]
pub struct RewardLedger {
    credits: HashMap<Identity, u64>,
    history: Vec<RewardEntry>,
}

impl RewardLedger {
    /// Create a new RewardLedger with no credit
    pub fn new() -> Self {
        RewardLedger {
            credits: HashMap::new(),
            history: Vec::new(),
        }
    }

    /// Add `amount` to the running total of `identity`
    ///
    /// Totals saturate instead of wrapping, so a credit never decreases.
    pub fn credit(&mut self, identity: &Identity, expense: ExpenseId, amount: u64) {
        let total = self.credits.entry(identity.clone()).or_insert(0);
        *total = total.saturating_add(amount);
        self.history.push(RewardEntry {
            identity: identity.clone(),
            expense,
            amount,
        });
    }

    /// Credit earned so far, 0 for identities never credited
    pub fn get_credit(&self, identity: &Identity) -> u64 {
        self.credits.get(identity).copied().unwrap_or(0)
    }

    /// Awards received by `identity`, oldest first
    pub fn history(&self, identity: &Identity) -> Vec<&RewardEntry> {
        self.history
            .iter()
            .filter(|entry| &entry.identity == identity)
            .collect()
    }

    /// Rebuild the credit totals from the expense table alone
    ///
    /// Every paid share is worth exactly one award, so the totals are fully
    /// determined by the `has_paid` flags. The award history is not recoverable
    /// from the table and is left empty.
    pub fn rebuild_from(ledger: &ExpenseLedger) -> Self {
        let mut credits: HashMap<Identity, u64> = HashMap::new();
        for expense in ledger.records() {
            for (member, paid) in expense.involved_members.iter().zip(&expense.has_paid) {
                if *paid {
                    let total = credits.entry(member.clone()).or_insert(0);
                    *total = total.saturating_add(REWARD_PER_PAYMENT);
                }
            }
        }
        RewardLedger {
            credits,
            history: Vec::new(),
        }
    }
}
