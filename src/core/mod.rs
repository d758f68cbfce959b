//! Core business logic module
//!
//! This module contains the ledger and settlement components:
//! - `traits` - Seams for the transfer mechanism and the clock
//! - `clock` - System and fixed clocks
//! - `ledger` - Expense table and per-identity balance cache
//! - `rewards` - Reward credit per identity
//! - `interest` - Daily interest on outstanding shares
//! - `settlement` - Orchestration and payment marking
//! - `async` - Shared ledger handle, batched payments and simulated wallets

pub mod r#async;
pub mod clock;
pub mod interest;
pub mod ledger;
pub mod rewards;
pub mod settlement;
pub mod traits;

pub use clock::{FixedClock, SystemClock};
pub use ledger::ExpenseLedger;
pub use r#async::{BatchPaymentCoordinator, CoordinatorConfig, InMemoryWallets, SharedLedger};
pub use rewards::{RewardLedger, REWARD_PER_PAYMENT};
pub use settlement::SettlementEngine;
pub use traits::{Clock, TransferGateway};
