//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `identity`: Party identifiers
//! - `expense`: Expense records and listing filters
//! - `event`: Ledger event log entries
//! - `payment`: Obligations and transfer requests
//! - `error`: Error types for the ledger and the journal replay

pub mod error;
pub mod event;
pub mod expense;
pub mod identity;
pub mod payment;

pub use error::{LedgerError, ReplayError};
pub use event::LedgerEvent;
pub use expense::{
    Expense, ExpenseFilter, ExpenseId, ExpenseStatus, NewExpense, Timestamp, AMOUNT_SCALE,
};
pub use identity::Identity;
pub use payment::{Obligation, TransferError, TransferReceipt, TransferRequest};
