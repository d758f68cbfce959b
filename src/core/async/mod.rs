//! Asynchronous access to the ledger
//!
//! This module provides the pieces that let many async tasks work against one
//! settlement engine and pay through an external transfer mechanism.
//!
//! # Architecture
//!
//! - **SharedLedger**: cloneable handle to one `SettlementEngine` behind a tokio
//!   `RwLock` (single writer, many readers)
//! - **BatchPaymentCoordinator**: groups obligations by creditor, issues one
//!   transfer per group concurrently, then marks the group paid
//! - **InMemoryWallets**: `DashMap`-backed transfer gateway used by the replay
//!   CLI and tests
//!
//! # Thread Safety
//!
//! Mutations of the ledger are serialized by the write lock. Wallet balances use
//! fine-grained per-identity locking, so transfers between unrelated identities
//! proceed in parallel.

pub mod coordinator;
pub mod shared;
pub mod wallets;

pub use coordinator::{
    BatchPaymentCoordinator, BatchReport, CoordinatorConfig, FundsState, GroupOutcome,
    GroupStatus, PaymentGroup,
};
pub use shared::SharedLedger;
pub use wallets::InMemoryWallets;
