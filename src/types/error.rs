//! Error types for the shared expense ledger
//!
//! This module defines all error types that can occur while operating the ledger
//! and while replaying a journal through the CLI.
//!
//! # Error Categories
//!
//! - **Ledger Errors** ([`LedgerError`]): invalid input, authorization failures,
//!   duplicate payment marking, failed transfers. Reported synchronously to the
//!   immediate caller and never retried by the core.
//! - **Replay Errors** ([`ReplayError`]): file I/O, CSV parsing, malformed journal
//!   rows, runtime failures.

use super::expense::ExpenseId;
use super::identity::Identity;
use thiserror::Error;

/// Main error type for ledger, settlement and coordinator operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Malformed arguments to expense creation
    #[error("Invalid expense input: {reason}")]
    InvalidExpenseInput {
        /// Which constraint was violated
        reason: String,
    },

    /// Unknown or tombstoned expense id
    #[error("Expense {expense} not found")]
    NotFound {
        /// Expense id that was looked up
        expense: ExpenseId,
    },

    /// Caller is not allowed to perform an owner-only operation
    #[error("Caller {caller} is not authorized on expense {expense}")]
    NotOwner {
        /// Expense id
        expense: ExpenseId,
        /// Identity that attempted the operation
        caller: Identity,
    },

    /// Payer is not one of the expense's involved members
    #[error("{member} is not a member of expense {expense}")]
    NotAMember {
        /// Expense id
        expense: ExpenseId,
        /// Identity that was looked up
        member: Identity,
    },

    /// The (expense, member) pair was already marked paid
    ///
    /// Inside a batch call this voids the entire call.
    #[error("{member} has already been marked as paid on expense {expense}")]
    AlreadyPaid {
        /// Expense id
        expense: ExpenseId,
        /// Member whose share was already paid
        member: Identity,
    },

    /// The external transfer for a creditor group did not complete
    ///
    /// Voids only the affected creditor group.
    #[error("Transfer to {creditor} failed: {reason}")]
    TransferFailed {
        /// Creditor the transfer was addressed to
        creditor: Identity,
        /// Reason reported by the gateway (or a timeout)
        reason: String,
    },

    /// Decimal arithmetic would overflow
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
    },

    /// A derived view no longer matches the expense table
    #[error("{view} view drifted for {identity}: cached {cached}, recomputed {recomputed}")]
    ViewDrift {
        /// Identity whose view diverged
        identity: Identity,
        /// Name of the view ("balance" or "credit")
        view: String,
        /// Value held in the cache
        cached: String,
        /// Value recomputed from the expense table
        recomputed: String,
    },

    /// Identity token is blank
    #[error("Invalid identity '{value}'")]
    InvalidIdentity {
        /// The rejected token
        value: String,
    },
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an InvalidExpenseInput error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        LedgerError::InvalidExpenseInput {
            reason: reason.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(expense: ExpenseId) -> Self {
        LedgerError::NotFound { expense }
    }

    /// Create a NotOwner error
    pub fn not_owner(expense: ExpenseId, caller: &Identity) -> Self {
        LedgerError::NotOwner {
            expense,
            caller: caller.clone(),
        }
    }

    /// Create a NotAMember error
    pub fn not_a_member(expense: ExpenseId, member: &Identity) -> Self {
        LedgerError::NotAMember {
            expense,
            member: member.clone(),
        }
    }

    /// Create an AlreadyPaid error
    pub fn already_paid(expense: ExpenseId, member: &Identity) -> Self {
        LedgerError::AlreadyPaid {
            expense,
            member: member.clone(),
        }
    }

    /// Create a TransferFailed error
    pub fn transfer_failed(creditor: &Identity, reason: impl Into<String>) -> Self {
        LedgerError::TransferFailed {
            creditor: creditor.clone(),
            reason: reason.into(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
        }
    }

    /// Create a ViewDrift error
    pub fn view_drift(
        identity: &Identity,
        view: &str,
        cached: impl ToString,
        recomputed: impl ToString,
    ) -> Self {
        LedgerError::ViewDrift {
            identity: identity.clone(),
            view: view.to_string(),
            cached: cached.to_string(),
            recomputed: recomputed.to_string(),
        }
    }

    /// Create an InvalidIdentity error
    pub fn invalid_identity(value: &str) -> Self {
        LedgerError::InvalidIdentity {
            value: value.to_string(),
        }
    }
}

/// Error type for journal replay
///
/// Fatal variants (`FileNotFound`, `IoError`, `Runtime`, `Ledger`) abort a replay.
/// `ParseError` and `InvalidRow` describe a single journal row; the replay logs
/// them and moves on to the next row.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    /// Journal file not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// A journal row parsed as CSV but does not describe a valid command
    #[error("Invalid journal row: {message}")]
    InvalidRow {
        /// What is wrong with the row
        message: String,
    },

    /// The async runtime could not be created or a task failed
    #[error("Runtime error: {message}")]
    Runtime {
        /// Description of the runtime failure
        message: String,
    },

    /// A fatal ledger error, such as a drifted view during the final audit
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ReplayError {
    /// Create an InvalidRow error
    pub fn invalid_row(message: impl Into<String>) -> Self {
        ReplayError::InvalidRow {
            message: message.into(),
        }
    }
}

// Conversion from io::Error to ReplayError
impl From<std::io::Error> for ReplayError {
    fn from(error: std::io::Error) -> Self {
        ReplayError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to ReplayError
impl From<csv::Error> for ReplayError {
    fn from(error: csv::Error) -> Self {
        // Extract line number if available
        let line = error.position().map(|pos| pos.line());

        ReplayError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for ReplayError {
    fn from(error: csv_async::Error) -> Self {
        ReplayError::ParseError {
            line: None,
            message: error.to_string(),
        }
    }
}
