//! Settlement engine
//!
//! This module provides the SettlementEngine that orchestrates the ledger by
//! coordinating between the ExpenseLedger and RewardLedger components.
//!
//! The engine enforces business rules such as:
//! - Owner-only edits and deletes
//! - Who may mark a share paid (the expense owner, or the payer themselves)
//! - Each (expense, member) share moves from unpaid to paid exactly once
//! - An expense settles the instant its last share is paid
//! - One reward award per share marked paid
//!
//! # Atomicity
//!
//! Payment marking runs in two phases. The plan phase checks every pair against
//! the current state (plus the pairs already planned in the same call) and can
//! fail; the apply phase cannot. A batch call with one bad pair therefore changes
//! nothing: no flags, no balances, no credit, no events.

use crate::core::ledger::ExpenseLedger;
use crate::core::rewards::{RewardEntry, RewardLedger, REWARD_PER_PAYMENT};
use crate::types::{
    Expense, ExpenseFilter, ExpenseId, Identity, LedgerError, LedgerEvent, NewExpense,
    Obligation,
};
use log::debug;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashSet};

/// A share that passed validation and is ready to be marked paid
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPayment {
    pub expense: ExpenseId,
    pub position: usize,
    pub member: Identity,
}

/// Ledger state machine
///
/// Owns the expense table, the reward ledger and the event log. All mutations
/// go through `&mut self`, so wrapping the engine in a lock (see
/// [`crate::core::r#async::SharedLedger`]) gives each call exclusive access.
#[derive(Debug, Default)]
pub struct SettlementEngine {
    ledger: ExpenseLedger,
    rewards: RewardLedger,
    events: Vec<LedgerEvent>,
}

impl SettlementEngine {
    /// Create a new SettlementEngine with no expenses
    pub fn new() -> Self {
        SettlementEngine {
            ledger: ExpenseLedger::new(),
            rewards: RewardLedger::new(),
            events: Vec::new(),
        }
    }

    /// Record a new expense owned by `new.owner`
    ///
    /// # Errors
    ///
    /// See [`ExpenseLedger::create`].
    pub fn create_expense(&mut self, new: NewExpense) -> Result<ExpenseId, LedgerError> {
        let owner = new.owner.clone();
        let id = self.ledger.create(new)?;
        self.events.push(LedgerEvent::ExpenseCreated { expense: id, owner });
        Ok(id)
    }

    /// Look up an active expense
    pub fn get_expense(&self, id: ExpenseId) -> Result<&Expense, LedgerError> {
        self.ledger.get(id)
    }

    /// Replace the description of an expense (owner only)
    pub fn edit_expense(
        &mut self,
        id: ExpenseId,
        description: impl Into<String>,
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        self.ledger.edit(id, description, caller)?;
        self.events.push(LedgerEvent::ExpenseEdited { expense: id });
        Ok(())
    }

    /// Tombstone an expense (owner only)
    pub fn delete_expense(&mut self, id: ExpenseId, caller: &Identity) -> Result<(), LedgerError> {
        self.ledger.delete(id, caller)?;
        self.events.push(LedgerEvent::ExpenseDeleted { expense: id });
        debug!("Expense {} deleted by {}", id, caller);
        Ok(())
    }

    pub fn list_expenses_involving(
        &self,
        identity: &Identity,
        filter: ExpenseFilter,
    ) -> Vec<&Expense> {
        self.ledger.list_involving(identity, filter)
    }

    pub fn list_expenses_owned_by(
        &self,
        identity: &Identity,
        filter: ExpenseFilter,
    ) -> Vec<&Expense> {
        self.ledger.list_owned_by(identity, filter)
    }

    /// Outstanding amount `identity` owes
    pub fn get_balance(&self, identity: &Identity) -> Decimal {
        self.ledger.balance(identity)
    }

    /// Reward credit earned by `identity`
    pub fn get_credit(&self, identity: &Identity) -> u64 {
        self.rewards.get_credit(identity)
    }

    pub fn reward_history(&self, identity: &Identity) -> Vec<&RewardEntry> {
        self.rewards.history(identity)
    }

    /// Event log, oldest first
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Every identity known to the ledger, sorted
    pub fn identities(&self) -> BTreeSet<Identity> {
        self.ledger.identities()
    }

    pub fn ledger(&self) -> &ExpenseLedger {
        &self.ledger
    }

    /// Mark `payer`'s share of `expense` as paid
    ///
    /// # Errors
    ///
    /// - `NotFound` if the expense is unknown or deleted
    /// - `NotOwner` if `caller` is neither the owner nor `payer`
    /// - `NotAMember` if `payer` is not involved in the expense
    /// - `AlreadyPaid` if the share was already marked paid
    pub fn mark_paid(
        &mut self,
        expense: ExpenseId,
        payer: &Identity,
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        self.mark_paid_pairs(&[Obligation::new(expense, payer.clone())], caller)
    }

    /// Mark several members of one expense as paid, all or nothing
    pub fn mark_paid_many(
        &mut self,
        expense: ExpenseId,
        payers: &[Identity],
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        let pairs: Vec<Obligation> = payers
            .iter()
            .map(|payer| Obligation::new(expense, payer.clone()))
            .collect();
        self.mark_paid_pairs(&pairs, caller)
    }

    /// Mark one member as paid on several expenses, all or nothing
    pub fn mark_paid_many_expenses(
        &mut self,
        expenses: &[ExpenseId],
        payer: &Identity,
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        let pairs: Vec<Obligation> = expenses
            .iter()
            .map(|expense| Obligation::new(*expense, payer.clone()))
            .collect();
        self.mark_paid_pairs(&pairs, caller)
    }

    /// Mark arbitrary (expense, payer) pairs as paid, in input order, all or nothing
    ///
    /// The first failing pair fails the whole call with its error and nothing is
    /// applied. A pair repeated within the call fails with `AlreadyPaid`.
    pub fn mark_paid_pairs(
        &mut self,
        pairs: &[Obligation],
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        let planned = self.plan_payments(pairs, caller)?;
        self.apply_payments(planned);
        Ok(())
    }

    /// Validate `pairs` without changing anything
    ///
    /// Returns the shares that `mark_paid_pairs` would flip, in input order.
    pub fn plan_payments(
        &self,
        pairs: &[Obligation],
        caller: &Identity,
    ) -> Result<Vec<PlannedPayment>, LedgerError> {
        let mut staged: HashSet<(ExpenseId, usize)> = HashSet::with_capacity(pairs.len());
        let mut planned = Vec::with_capacity(pairs.len());

        for pair in pairs {
            let expense = self.ledger.get(pair.expense)?;

            if &expense.owner != caller && &pair.payer != caller {
                return Err(LedgerError::not_owner(pair.expense, caller));
            }

            let position = expense
                .position_of(&pair.payer)
                .ok_or_else(|| LedgerError::not_a_member(pair.expense, &pair.payer))?;

            if expense.has_paid[position] || !staged.insert((pair.expense, position)) {
                return Err(LedgerError::already_paid(pair.expense, &pair.payer));
            }

            planned.push(PlannedPayment {
                expense: pair.expense,
                position,
                member: pair.payer.clone(),
            });
        }

        Ok(planned)
    }

    fn apply_payments(&mut self, planned: Vec<PlannedPayment>) {
        for payment in planned {
            let (amount, settled_now) = self
                .ledger
                .mark_position_paid(payment.expense, payment.position);
            self.rewards
                .credit(&payment.member, payment.expense, REWARD_PER_PAYMENT);

            debug!(
                "{} paid {} on expense {}",
                payment.member, amount, payment.expense
            );
            self.events.push(LedgerEvent::MemberPaid {
                expense: payment.expense,
                member: payment.member.clone(),
                amount,
            });
            self.events.push(LedgerEvent::TokensRewarded {
                member: payment.member,
                amount: REWARD_PER_PAYMENT,
            });

            if settled_now {
                debug!("Expense {} settled", payment.expense);
                self.events.push(LedgerEvent::ExpenseSettled {
                    expense: payment.expense,
                });
            }
        }
    }

    /// Recompute balances and credits from the expense table and compare them
    /// with the cached views
    ///
    /// # Errors
    ///
    /// Returns `ViewDrift` for the first identity whose cached value differs.
    pub fn verify_views(&self) -> Result<(), LedgerError> {
        let rebuilt = RewardLedger::rebuild_from(&self.ledger);

        for identity in self.ledger.identities() {
            let cached = self.ledger.balance(&identity);
            let recomputed = self.ledger.recompute_balance(&identity);
            if cached != recomputed {
                return Err(LedgerError::view_drift(
                    &identity, "balance", cached, recomputed,
                ));
            }

            let cached = self.rewards.get_credit(&identity);
            let recomputed = rebuilt.get_credit(&identity);
            if cached != recomputed {
                return Err(LedgerError::view_drift(
                    &identity, "credit", cached, recomputed,
                ));
            }
        }

        Ok(())
    }
}
