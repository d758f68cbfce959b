//! Batched payment with creditor-based grouping
//!
//! This module provides the `BatchPaymentCoordinator`, which pays a batch of
//! obligations with as few transfers as possible: obligations owed by the same
//! payer to the same creditor are summed into one transfer.
//!
//! # Design
//!
//! A batch goes through three steps:
//!
//! 1. **Plan**: under one read lock, every obligation is validated exactly as
//!    `mark_paid` would validate it and priced with interest. A single invalid
//!    obligation rejects the whole batch before any funds move.
//! 2. **Transfer**: one transfer per group, with up to `max_concurrent` groups in
//!    flight. Each transfer is bounded by `transfer_timeout`. No lock is held
//!    while a transfer is pending.
//! 3. **Mark**: after a group's transfer succeeds, all of its obligations are
//!    marked paid with one atomic call under the write lock.
//!
//! A failed group never affects the others.
//!
//! # Architecture
//!
//! ```text
//! BatchPaymentCoordinator
//!     ├── SharedLedger        (engine behind an RwLock)
//!     ├── Arc<G>              (transfer gateway)
//!     ├── Arc<dyn Clock>      (time source for interest)
//!     └── CoordinatorConfig   (concurrency and timeout)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use log::{debug, warn};
use rust_decimal::Decimal;

use super::SharedLedger;
use crate::core::interest::{self, InterestQuote};
use crate::core::traits::{Clock, TransferGateway};
use crate::types::{
    ExpenseId, Identity, LedgerError, Obligation, TransferReceipt, TransferRequest,
};

/// Default bound on a single transfer
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Concurrency and timeout settings for the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Maximum number of transfers in flight at once
    pub max_concurrent: usize,
    /// Upper bound on a single transfer
    pub transfer_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            max_concurrent: num_cpus::get(),
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
        }
    }
}

impl CoordinatorConfig {
    /// Build a config, replacing zero values with the defaults
    pub fn new(max_concurrent: usize, transfer_timeout_ms: u64) -> Self {
        let defaults = Self::default();

        let max_concurrent = if max_concurrent == 0 {
            warn!(
                "max_concurrent must be greater than 0, using default {}",
                defaults.max_concurrent
            );
            defaults.max_concurrent
        } else {
            max_concurrent
        };

        let transfer_timeout = if transfer_timeout_ms == 0 {
            warn!(
                "transfer timeout must be greater than 0, using default {}ms",
                defaults.transfer_timeout.as_millis()
            );
            defaults.transfer_timeout
        } else {
            Duration::from_millis(transfer_timeout_ms)
        };

        CoordinatorConfig {
            max_concurrent,
            transfer_timeout,
        }
    }
}

/// Obligations one payer owes one creditor, paid with a single transfer
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentGroup {
    pub payer: Identity,
    pub creditor: Identity,
    /// Obligations in input order
    pub obligations: Vec<Obligation>,
    /// One quote per obligation, same order
    pub quotes: Vec<InterestQuote>,
    /// Sum of the quoted totals
    pub amount: Decimal,
    pub memo: String,
}

impl PaymentGroup {
    pub fn expenses(&self) -> Vec<ExpenseId> {
        self.obligations.iter().map(|o| o.expense).collect()
    }
}

/// What is known about the funds of a group that did not settle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundsState {
    /// The gateway refused the transfer
    NotMoved,
    /// The transfer went through but marking failed, for example because a
    /// concurrent caller marked one of the pairs first
    Moved,
    /// The transfer was abandoned at its timeout and may still have landed
    Unknown,
}

/// How a group ended
#[derive(Debug, Clone, PartialEq)]
pub enum GroupStatus {
    /// Funds moved and every obligation of the group is marked paid
    Settled(TransferReceipt),
    /// The group did not settle
    ///
    /// The ledger never reverses a transfer; reconciling `Moved` and `Unknown`
    /// funds is up to the caller.
    Failed { error: LedgerError, funds: FundsState },
}

/// Outcome of one group of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    pub payer: Identity,
    pub creditor: Identity,
    pub amount: Decimal,
    pub obligations: Vec<Obligation>,
    pub status: GroupStatus,
}

impl GroupOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self.status, GroupStatus::Settled(_))
    }
}

/// Per-group outcomes of a batch, in group order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<GroupOutcome>,
}

impl BatchReport {
    pub fn settled(&self) -> impl Iterator<Item = &GroupOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_settled())
    }

    pub fn failed(&self) -> impl Iterator<Item = &GroupOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_settled())
    }

    pub fn is_fully_settled(&self) -> bool {
        self.outcomes.iter().all(GroupOutcome::is_settled)
    }
}

/// Pays batches of obligations against a shared ledger
pub struct BatchPaymentCoordinator<G> {
    ledger: SharedLedger,
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
    config: CoordinatorConfig,
}

impl<G> Clone for BatchPaymentCoordinator<G> {
    fn clone(&self) -> Self {
        BatchPaymentCoordinator {
            ledger: self.ledger.clone(),
            gateway: Arc::clone(&self.gateway),
            clock: Arc::clone(&self.clock),
            config: self.config,
        }
    }
}

impl<G: TransferGateway> BatchPaymentCoordinator<G> {
    pub fn new(
        ledger: SharedLedger,
        gateway: Arc<G>,
        clock: Arc<dyn Clock>,
        config: CoordinatorConfig,
    ) -> Self {
        BatchPaymentCoordinator {
            ledger,
            gateway,
            clock,
            config,
        }
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.config
    }

    /// Validate, price and group a batch without moving funds
    ///
    /// Each obligation is authorized as a payment made by its own payer.
    /// Groups are keyed by (payer, creditor) and ordered by first appearance.
    ///
    /// # Errors
    ///
    /// Any error `mark_paid` would return for one of the obligations (including a
    /// pair repeated within the batch), or `ArithmeticOverflow` while pricing.
    pub async fn plan(
        &self,
        obligations: &[Obligation],
    ) -> Result<Vec<PaymentGroup>, LedgerError> {
        let now = self.clock.now();
        let engine = self.ledger.read().await;

        // Validate per payer so duplicates within the batch are caught
        let mut by_payer: Vec<(Identity, Vec<Obligation>)> = Vec::new();
        for obligation in obligations {
            match by_payer.iter_mut().find(|(payer, _)| payer == &obligation.payer) {
                Some((_, list)) => list.push(obligation.clone()),
                None => by_payer.push((obligation.payer.clone(), vec![obligation.clone()])),
            }
        }
        for (payer, list) in &by_payer {
            engine.plan_payments(list, payer)?;
        }

        let mut groups: Vec<PaymentGroup> = Vec::new();
        let mut index: HashMap<(Identity, Identity), usize> = HashMap::new();

        for obligation in obligations {
            let expense = engine.get_expense(obligation.expense)?;
            let principal = expense
                .amount_owed_by(&obligation.payer)
                .ok_or_else(|| LedgerError::not_a_member(obligation.expense, &obligation.payer))?;
            let elapsed = interest::elapsed_seconds(expense.created_at, now);
            let quote = interest::quote(principal, expense.interest_rate, elapsed)?;
            let memo = quote.memo(&expense.description);

            let key = (obligation.payer.clone(), expense.owner.clone());
            let position = *index.entry(key).or_insert_with(|| {
                groups.push(PaymentGroup {
                    payer: obligation.payer.clone(),
                    creditor: expense.owner.clone(),
                    obligations: Vec::new(),
                    quotes: Vec::new(),
                    amount: Decimal::ZERO,
                    memo: String::new(),
                });
                groups.len() - 1
            });

            let group = &mut groups[position];
            group.amount = group
                .amount
                .checked_add(quote.total)
                .ok_or_else(|| LedgerError::arithmetic_overflow("batch total"))?;
            if !group.memo.is_empty() {
                group.memo.push_str("; ");
            }
            group.memo.push_str(&memo);
            group.obligations.push(obligation.clone());
            group.quotes.push(quote);
        }

        Ok(groups)
    }

    /// Pay a batch of obligations
    ///
    /// Returns `Err` only when the batch is rejected up front, in which case no
    /// transfer was attempted. Otherwise every group gets an outcome in the
    /// report, settled or failed, independently of the other groups.
    pub async fn pay_batch(&self, obligations: &[Obligation]) -> Result<BatchReport, LedgerError> {
        let groups = self.plan(obligations).await?;
        if groups.is_empty() {
            return Ok(BatchReport::default());
        }

        debug!(
            "Paying {} obligations in {} transfers",
            obligations.len(),
            groups.len()
        );

        let ordered = stream::iter(groups.into_iter().enumerate());
        let mut results: Vec<(usize, GroupOutcome)> = ordered
            .map(|(order, group)| async move { (order, self.settle_group(group).await) })
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        results.sort_by_key(|(order, _)| *order);
        Ok(BatchReport {
            outcomes: results.into_iter().map(|(_, outcome)| outcome).collect(),
        })
    }

    async fn settle_group(&self, group: PaymentGroup) -> GroupOutcome {
        let request = TransferRequest {
            from: group.payer.clone(),
            to: group.creditor.clone(),
            amount: group.amount,
            memo: group.memo.clone(),
        };

        // A timeout drops the pending transfer; whether it landed is unknown
        let transfer = self.gateway.send(request);
        let status = match tokio::time::timeout(self.config.transfer_timeout, transfer).await {
            Err(_) => {
                warn!(
                    "Transfer {} -> {} timed out after {}ms",
                    group.payer,
                    group.creditor,
                    self.config.transfer_timeout.as_millis()
                );
                GroupStatus::Failed {
                    error: LedgerError::transfer_failed(&group.creditor, "transfer timed out"),
                    funds: FundsState::Unknown,
                }
            }
            Ok(Err(error)) => {
                warn!(
                    "Transfer {} -> {} failed: {}",
                    group.payer, group.creditor, error
                );
                GroupStatus::Failed {
                    error: LedgerError::transfer_failed(&group.creditor, error.reason),
                    funds: FundsState::NotMoved,
                }
            }
            Ok(Ok(receipt)) => {
                match self
                    .ledger
                    .mark_paid_pairs(&group.obligations, &group.payer)
                    .await
                {
                    Ok(()) => GroupStatus::Settled(receipt),
                    Err(error) => {
                        warn!(
                            "Transfer #{} to {} succeeded but marking failed: {}",
                            receipt.reference, group.creditor, error
                        );
                        GroupStatus::Failed {
                            error,
                            funds: FundsState::Moved,
                        }
                    }
                }
            }
        };

        GroupOutcome {
            payer: group.payer,
            creditor: group.creditor,
            amount: group.amount,
            obligations: group.obligations,
            status,
        }
    }
}
