//! Ledger events
//!
//! Every successful mutation of the ledger appends one or more events to an
//! append-only log. Failed calls append nothing.

use super::expense::ExpenseId;
use super::identity::Identity;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    ExpenseCreated {
        expense: ExpenseId,
        owner: Identity,
    },
    ExpenseEdited {
        expense: ExpenseId,
    },
    ExpenseDeleted {
        expense: ExpenseId,
    },
    /// A member's share was marked paid
    MemberPaid {
        expense: ExpenseId,
        member: Identity,
        amount: Decimal,
    },
    /// The last unpaid share of an expense was marked paid
    ExpenseSettled {
        expense: ExpenseId,
    },
    TokensRewarded {
        member: Identity,
        amount: u64,
    },
}
