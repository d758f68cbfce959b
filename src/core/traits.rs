//! Core traits for the collaborators the ledger depends on
//!
//! This module defines the seams between the ledger and the outside world, so
//! that the coordinator and the replay CLI can run against real or simulated
//! implementations interchangeably.

use crate::types::{Timestamp, TransferError, TransferReceipt, TransferRequest};
use std::future::Future;

/// Trait for moving value between identities
///
/// One call per creditor group. A transfer either completes in full and returns
/// a receipt, or fails with no funds moved; there is no partial success.
pub trait TransferGateway: Send + Sync {
    /// Move `request.amount` from `request.from` to `request.to`
    fn send(
        &self,
        request: TransferRequest,
    ) -> impl Future<Output = Result<TransferReceipt, TransferError>> + Send;
}

/// Trait for reading the current time
///
/// Implementations can be backed by the system clock or fixed for tests and
/// journal replay.
pub trait Clock: Send + Sync {
    /// Current time as unix seconds
    fn now(&self) -> Timestamp;
}
