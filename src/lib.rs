//! Shared Expense Ledger Library
//! # Overview
//!
//! This library records shared expenses between parties, tracks who owes whom,
//! settles debts with optional daily interest and awards reward credit for every
//! share settled. A CSV journal replay drives it from the command line.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Identity, Expense, LedgerEvent, errors)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::ledger`] - Expense table and cached balances
//!   - [`core::settlement`] - Payment marking and orchestration
//!   - [`core::rewards`] - Reward credit per identity
//!   - [`core::interest`] - Daily interest on outstanding shares
//!   - [`core::r#async`] - Shared ledger handle, batched payments, simulated wallets
//! - [`io`] - Journal parsing and account output
//! - [`replay`] - Journal replay pipeline
//!
//! # Payment Lifecycle
//!
//! Each share of an expense is either unpaid or paid, and only ever moves from
//! unpaid to paid:
//!
//! - **Create**: the owner records who owes what; every share starts unpaid
//! - **Mark paid**: the owner or the payer flips a share to paid, the payer's
//!   balance drops by the share and the payer earns 100 credit
//! - **Settle**: the expense settles the moment its last share is paid
//! - **Batch pay**: the coordinator sums a payer's shares per creditor, moves the
//!   funds with one transfer per creditor and then marks the shares paid
//!
//! # Identity Views
//!
//! Each identity has:
//! - `balance`: Total of its unpaid shares, deleted expenses included
//! - `credit`: Reward credit earned, never decreasing

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod replay;
pub mod types;

pub use crate::core::{
    BatchPaymentCoordinator, Clock, CoordinatorConfig, ExpenseLedger, InMemoryWallets,
    RewardLedger, SettlementEngine, SharedLedger, TransferGateway,
};
pub use io::write_accounts_csv;
pub use replay::{JournalReplay, ReplayConfig};
pub use types::{
    Expense, ExpenseFilter, ExpenseId, Identity, LedgerError, LedgerEvent, NewExpense,
    Obligation, ReplayError,
};
