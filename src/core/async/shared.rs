//! Shared access to the settlement engine for concurrent callers
//!
//! This module provides the `SharedLedger` handle, which wraps a
//! `SettlementEngine` in a tokio `RwLock` so that any number of async tasks can
//! reach the same ledger.
//!
//! # Thread Safety
//!
//! Every mutating call holds the write lock for its whole duration, so mutations
//! are applied one at a time in a single global order. Reads take the read lock
//! and may run concurrently with each other, but never observe a half-applied
//! mutation. The handle is cheap to clone; clones share the same engine.

use crate::core::settlement::SettlementEngine;
use crate::types::{
    Expense, ExpenseFilter, ExpenseId, Identity, LedgerError, NewExpense, Obligation,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cloneable, thread-safe handle to one `SettlementEngine`
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<SettlementEngine>>,
}

impl SharedLedger {
    /// Create a handle over an empty engine
    pub fn new() -> Self {
        Self::from_engine(SettlementEngine::new())
    }

    pub fn from_engine(engine: SettlementEngine) -> Self {
        SharedLedger {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    /// Take the read lock for several consistent reads
    pub async fn read(&self) -> RwLockReadGuard<'_, SettlementEngine> {
        self.inner.read().await
    }

    /// Take the write lock for a sequence of mutations that must not interleave
    pub async fn write(&self) -> RwLockWriteGuard<'_, SettlementEngine> {
        self.inner.write().await
    }

    pub async fn create_expense(&self, new: NewExpense) -> Result<ExpenseId, LedgerError> {
        self.inner.write().await.create_expense(new)
    }

    pub async fn edit_expense(
        &self,
        id: ExpenseId,
        description: impl Into<String>,
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        self.inner.write().await.edit_expense(id, description, caller)
    }

    pub async fn delete_expense(
        &self,
        id: ExpenseId,
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        self.inner.write().await.delete_expense(id, caller)
    }

    pub async fn mark_paid(
        &self,
        expense: ExpenseId,
        payer: &Identity,
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        self.inner.write().await.mark_paid(expense, payer, caller)
    }

    pub async fn mark_paid_many(
        &self,
        expense: ExpenseId,
        payers: &[Identity],
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        self.inner.write().await.mark_paid_many(expense, payers, caller)
    }

    pub async fn mark_paid_many_expenses(
        &self,
        expenses: &[ExpenseId],
        payer: &Identity,
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        self.inner
            .write()
            .await
            .mark_paid_many_expenses(expenses, payer, caller)
    }

    pub async fn mark_paid_pairs(
        &self,
        pairs: &[Obligation],
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        self.inner.write().await.mark_paid_pairs(pairs, caller)
    }

    /// Snapshot of an active expense
    pub async fn get_expense(&self, id: ExpenseId) -> Result<Expense, LedgerError> {
        self.inner.read().await.get_expense(id).cloned()
    }

    pub async fn list_expenses_involving(
        &self,
        identity: &Identity,
        filter: ExpenseFilter,
    ) -> Vec<Expense> {
        self.inner
            .read()
            .await
            .list_expenses_involving(identity, filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn list_expenses_owned_by(
        &self,
        identity: &Identity,
        filter: ExpenseFilter,
    ) -> Vec<Expense> {
        self.inner
            .read()
            .await
            .list_expenses_owned_by(identity, filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn get_balance(&self, identity: &Identity) -> Decimal {
        self.inner.read().await.get_balance(identity)
    }

    pub async fn get_credit(&self, identity: &Identity) -> u64 {
        self.inner.read().await.get_credit(identity)
    }

    pub async fn verify_views(&self) -> Result<(), LedgerError> {
        self.inner.read().await.verify_views()
    }
}
