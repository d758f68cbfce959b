//! Expense-related types for the shared expense ledger
//!
//! This module defines the Expense record, the input used to create one, and the
//! filter applied when listing expenses.

use super::identity::Identity;
use rust_decimal::Decimal;

/// Expense identifier
///
/// Assigned sequentially from 0 and never reused, even after a delete.
pub type ExpenseId = u64;

/// Point in time as unix seconds
pub type Timestamp = u64;

/// Decimal places of the ledger's smallest denomination (micro-units)
///
/// Amounts with more precision than this are rejected at creation, and interest
/// totals are rounded to it.
pub const AMOUNT_SCALE: u32 = 6;

/// Lifecycle status of an expense record
///
/// Deleting an expense never removes its slot: the record is kept with a
/// `Deleted` status so ids stay stable and paid/unpaid accounting survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseStatus {
    /// Visible to lookups and listings
    Active,
    /// Tombstoned by its owner
    Deleted,
}

/// A shared expense owed to its owner by one or more members
///
/// `involved_members`, `amounts_owed` and `has_paid` are positionally paired and
/// always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    /// Sequential identifier
    pub id: ExpenseId,

    /// Creator of the expense, and the creditor every member owes
    pub owner: Identity,

    /// Free-text label, cleared when the expense is deleted
    pub description: String,

    /// Percentage charged per elapsed day (non-negative)
    pub interest_rate: Decimal,

    /// Creation time, fixed for the life of the record
    pub created_at: Timestamp,

    /// Debtors, in the order they were given at creation
    pub involved_members: Vec<Identity>,

    /// Amount owed by the member at the same position
    pub amounts_owed: Vec<Decimal>,

    /// Whether the member at the same position has paid
    ///
    /// Once an entry becomes `true` it never goes back to `false`.
    pub has_paid: Vec<bool>,

    /// `true` once every member has paid; never reverts
    pub is_settled: bool,

    /// Active or tombstoned
    pub status: ExpenseStatus,
}

impl Expense {
    /// Position of `member` within the expense, if it is involved
    pub fn position_of(&self, member: &Identity) -> Option<usize> {
        self.involved_members.iter().position(|m| m == member)
    }

    /// Amount `member` owes on this expense, paid or not
    pub fn amount_owed_by(&self, member: &Identity) -> Option<Decimal> {
        self.position_of(member).map(|pos| self.amounts_owed[pos])
    }

    /// Whether `member` has paid, or `None` if it is not involved
    pub fn has_member_paid(&self, member: &Identity) -> Option<bool> {
        self.position_of(member).map(|pos| self.has_paid[pos])
    }

    /// Whether `identity` owns the expense or owes on it
    pub fn involves(&self, identity: &Identity) -> bool {
        &self.owner == identity || self.position_of(identity).is_some()
    }

    /// Whether the record is still active (not tombstoned)
    pub fn is_active(&self) -> bool {
        self.status == ExpenseStatus::Active
    }
}

/// Arguments for creating an expense
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub owner: Identity,
    pub members: Vec<Identity>,
    pub amounts: Vec<Decimal>,
    pub description: String,
    pub interest_rate: Decimal,
    pub created_at: Timestamp,
}

/// Settlement filter for expense listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpenseFilter {
    #[default]
    All,
    Settled,
    Unsettled,
}

impl ExpenseFilter {
    /// Whether `expense` passes the filter
    pub fn matches(self, expense: &Expense) -> bool {
        match self {
            ExpenseFilter::All => true,
            ExpenseFilter::Settled => expense.is_settled,
            ExpenseFilter::Unsettled => !expense.is_settled,
        }
    }
}
