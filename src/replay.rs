//! Journal replay
//!
//! This module drives the ledger from a CSV journal the same way an interactive
//! front end would: every row becomes one call to the public ledger operations.
//! Transfers are simulated with in-memory wallets and time comes from the `at`
//! column of each row.
//!
//! # Architecture
//!
//! ```text
//! JournalReplay
//!     ├── ReplayConfig (batch_size, CoordinatorConfig)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── SharedLedger (settlement engine behind an RwLock)
//!     ├── BatchPaymentCoordinator (settle rows)
//!     ├── InMemoryWallets (fund rows, simulated transfers)
//!     └── FixedClock (advanced by each row's timestamp)
//! ```
//!
//! Rows are applied strictly in journal order, batch after batch. Rows that are
//! malformed or rejected by the ledger are logged and skipped. After the last
//! row the cached views are audited against the expense table; a drift aborts
//! the replay.

use crate::core::r#async::{
    BatchPaymentCoordinator, CoordinatorConfig, InMemoryWallets, SharedLedger,
};
use crate::core::{Clock, FixedClock};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::{write_accounts_csv, AccountView, LedgerCommand};
use crate::types::{Identity, NewExpense, Obligation, ReplayError};
use log::{info, warn};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Default number of journal rows read per batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Configuration for a replay
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Number of valid rows per batch
    pub batch_size: usize,
    /// Settings for settle rows; `max_concurrent` also sizes the runtime
    pub coordinator: CoordinatorConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl ReplayConfig {
    /// Create a config, replacing zero values with the defaults
    pub fn new(batch_size: usize, max_concurrent: usize, transfer_timeout_ms: u64) -> Self {
        let batch_size = if batch_size == 0 {
            warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size, DEFAULT_BATCH_SIZE
            );
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };

        Self {
            batch_size,
            coordinator: CoordinatorConfig::new(max_concurrent, transfer_timeout_ms),
        }
    }
}

/// Counters reported at the end of a replay
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Data rows consumed, including malformed ones
    pub rows_read: u64,
    pub commands_applied: u64,
    /// Well-formed commands the ledger refused
    pub commands_rejected: u64,
    pub transfers_settled: u64,
    pub transfers_failed: u64,
}

impl ReplaySummary {
    /// Malformed rows skipped by the reader
    pub fn rows_skipped(&self) -> u64 {
        self.rows_read
            .saturating_sub(self.commands_applied + self.commands_rejected)
    }
}

/// Everything a finished replay produced
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOutcome {
    pub accounts: Vec<AccountView>,
    pub summary: ReplaySummary,
}

/// Replays a journal against a fresh ledger
#[derive(Debug, Clone)]
pub struct JournalReplay {
    config: ReplayConfig,
}

impl JournalReplay {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    /// Replay the journal at `input_path` and write the final accounts to `output`
    ///
    /// Creates its own multi-threaded tokio runtime, so it must not be called
    /// from within an async context.
    ///
    /// # Errors
    ///
    /// Fatal errors only: missing or unreadable input, runtime creation failure,
    /// output failure, or a view drift found by the final audit.
    pub fn run(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplaySummary, ReplayError> {
        // Fields are public, so a literal config may hold zeros
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.coordinator.max_concurrent.max(1))
            .enable_all()
            .build()
            .map_err(|e| ReplayError::Runtime {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let outcome = runtime.block_on(self.replay(input_path))?;
        write_accounts_csv(&outcome.accounts, output)?;

        Ok(outcome.summary)
    }

    /// Replay the journal at `input_path` on the current runtime
    pub async fn replay(&self, input_path: &Path) -> Result<ReplayOutcome, ReplayError> {
        let file = tokio::fs::File::open(input_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ReplayError::FileNotFound {
                    path: input_path.display().to_string(),
                }
            } else {
                ReplayError::IoError {
                    message: format!("Failed to open file '{}': {}", input_path.display(), e),
                }
            }
        })?;

        // Wrap tokio file in a compatibility layer for csv-async
        let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
        let mut reader = AsyncReader::new(compat_file);

        let mut session = ReplaySession::new(self.config.coordinator);
        let batch_size = self.config.batch_size.max(1);

        loop {
            let batch = reader.read_batch(batch_size).await;

            // If batch is empty, we've reached end of file
            if batch.is_empty() {
                break;
            }

            for command in batch {
                session.apply(command).await;
            }
        }

        session.summary.rows_read = reader.rows_read();
        session.ledger.verify_views().await?;

        let summary = session.summary;
        info!(
            "Replayed {} rows: {} applied, {} rejected, {} skipped, {} transfers settled, {} failed",
            summary.rows_read,
            summary.commands_applied,
            summary.commands_rejected,
            summary.rows_skipped(),
            summary.transfers_settled,
            summary.transfers_failed
        );

        Ok(ReplayOutcome {
            accounts: session.accounts().await,
            summary,
        })
    }
}

/// Ledger, wallets and clock of one replay
struct ReplaySession {
    ledger: SharedLedger,
    wallets: Arc<InMemoryWallets>,
    clock: Arc<FixedClock>,
    coordinator: BatchPaymentCoordinator<InMemoryWallets>,
    summary: ReplaySummary,
}

impl ReplaySession {
    fn new(config: CoordinatorConfig) -> Self {
        let ledger = SharedLedger::new();
        let wallets = Arc::new(InMemoryWallets::new());
        let clock = Arc::new(FixedClock::new(0));
        let coordinator = BatchPaymentCoordinator::new(
            ledger.clone(),
            Arc::clone(&wallets),
            clock.clone(),
            config,
        );

        Self {
            ledger,
            wallets,
            clock,
            coordinator,
            summary: ReplaySummary::default(),
        }
    }

    async fn apply(&mut self, command: LedgerCommand) {
        match self.execute(command).await {
            Ok(()) => self.summary.commands_applied += 1,
            Err(e) => {
                warn!("Rejected journal command: {}", e);
                self.summary.commands_rejected += 1;
            }
        }
    }

    async fn execute(&mut self, command: LedgerCommand) -> Result<(), ReplayError> {
        match command {
            LedgerCommand::Fund { identity, amount } => {
                self.wallets
                    .fund(&identity, amount)
                    .map_err(|e| ReplayError::invalid_row(e.reason))?;
            }
            LedgerCommand::Create {
                owner,
                members,
                amounts,
                description,
                rate,
                at,
            } => {
                if let Some(at) = at {
                    self.clock.set(at);
                }
                self.ledger
                    .create_expense(NewExpense {
                        owner,
                        members,
                        amounts,
                        description,
                        interest_rate: rate,
                        created_at: self.clock.now(),
                    })
                    .await?;
            }
            LedgerCommand::Edit {
                caller,
                expense,
                description,
            } => {
                self.ledger
                    .edit_expense(expense, description, &caller)
                    .await?;
            }
            LedgerCommand::Delete { caller, expense } => {
                self.ledger.delete_expense(expense, &caller).await?;
            }
            LedgerCommand::Pay {
                caller,
                expense,
                members,
            } => match members.as_slice() {
                [] => self.ledger.mark_paid(expense, &caller, &caller).await?,
                [member] => self.ledger.mark_paid(expense, member, &caller).await?,
                _ => self.ledger.mark_paid_many(expense, &members, &caller).await?,
            },
            LedgerCommand::Settle {
                payer,
                expenses,
                at,
            } => {
                if let Some(at) = at {
                    self.clock.set(at);
                }
                let obligations: Vec<Obligation> = expenses
                    .into_iter()
                    .map(|expense| Obligation::new(expense, payer.clone()))
                    .collect();

                let report = self.coordinator.pay_batch(&obligations).await?;
                for outcome in report.failed() {
                    warn!(
                        "Settlement of {} -> {} for {} failed: {:?}",
                        outcome.payer, outcome.creditor, outcome.amount, outcome.status
                    );
                }
                self.summary.transfers_settled += report.settled().count() as u64;
                self.summary.transfers_failed += report.failed().count() as u64;
            }
        }

        Ok(())
    }

    /// Final view of every identity seen by the ledger or the wallets
    async fn accounts(&self) -> Vec<AccountView> {
        let engine = self.ledger.read().await;

        let mut identities: BTreeSet<Identity> = engine.identities();
        identities.extend(
            self.wallets
                .get_all_balances()
                .into_iter()
                .map(|(identity, _)| identity),
        );

        identities
            .into_iter()
            .map(|identity| AccountView {
                owed: engine.get_balance(&identity),
                credit: engine.get_credit(&identity),
                wallet: self.wallets.balance(&identity),
                identity,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tempfile::NamedTempFile;

    const HEADER: &str = "op,caller,expense,members,amounts,description,rate,at\n";

    fn create_temp_journal(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(format!("{HEADER}{rows}").as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn account<'a>(outcome: &'a ReplayOutcome, token: &str) -> &'a AccountView {
        let identity = Identity::new(token).unwrap();
        outcome
            .accounts
            .iter()
            .find(|account| account.identity == identity)
            .unwrap()
    }

    #[tokio::test]
    async fn test_settle_moves_funds_and_clears_debt() {
        let file = create_temp_journal(
            "fund,0xa,,,10,,,\n\
             create,0xo,,0xa;0xb,1;2,Dinner,0,0\n\
             create,0xo,,0xa,2,Taxi,0,0\n\
             settle,0xa,0;1,,,,,0\n",
        );

        let outcome = JournalReplay::new(ReplayConfig::new(2, 2, 1000))
            .replay(file.path())
            .await
            .unwrap();

        let payer = account(&outcome, "0xa");
        assert_eq!(payer.owed, Decimal::ZERO);
        assert_eq!(payer.credit, 200);
        assert_eq!(payer.wallet, Decimal::from(7));
        assert_eq!(account(&outcome, "0xo").wallet, Decimal::from(3));
        assert_eq!(account(&outcome, "0xb").owed, Decimal::from(2));
        assert_eq!(outcome.summary.transfers_settled, 1);
    }

    #[tokio::test]
    async fn test_rejected_and_malformed_rows_are_counted() {
        let file = create_temp_journal(
            "create,0xo,,0xa,5,Lunch,0,0\n\
             pay,0xb,0,0xa,,,,\n\
             bogus,0xa,,,,,,\n\
             pay,0xo,0,0xa,,,,\n",
        );

        let outcome = JournalReplay::new(ReplayConfig::default())
            .replay(file.path())
            .await
            .unwrap();

        assert_eq!(outcome.summary.rows_read, 4);
        assert_eq!(outcome.summary.commands_applied, 2);
        assert_eq!(outcome.summary.commands_rejected, 1);
        assert_eq!(outcome.summary.rows_skipped(), 1);
        assert_eq!(account(&outcome, "0xa").credit, 100);
    }

    #[tokio::test]
    async fn test_interest_uses_row_timestamps() {
        let file = create_temp_journal(
            "fund,0xa,,,200,,,\n\
             create,0xo,,0xa,100,Rent,5,0\n\
             settle,0xa,0,,,,,259200\n",
        );

        let outcome = JournalReplay::new(ReplayConfig::default())
            .replay(file.path())
            .await
            .unwrap();

        assert_eq!(account(&outcome, "0xa").wallet, Decimal::from(80));
        assert_eq!(account(&outcome, "0xo").wallet, Decimal::from(120));
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let result = JournalReplay::new(ReplayConfig::default())
            .replay(Path::new("nonexistent.csv"))
            .await;

        assert_eq!(
            result,
            Err(ReplayError::FileNotFound {
                path: "nonexistent.csv".to_string()
            })
        );
    }

    #[test]
    fn test_run_writes_sorted_csv() {
        let file = create_temp_journal(
            "create,0xo,,0xb;0xa,1;2.5,Dinner,0,0\n\
             pay,0xo,0,0xb,,,,\n",
        );
        let mut output = Vec::new();

        JournalReplay::new(ReplayConfig::default())
            .run(file.path(), &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "identity,owed,credit,wallet\n\
             0xa,2.500000,0,0.000000\n\
             0xb,0.000000,100,0.000000\n\
             0xo,0.000000,0,0.000000\n"
        );
    }

    #[tokio::test]
    async fn test_literal_zero_batch_size_still_reads_every_row() {
        let file = create_temp_journal("create,0xo,,0xa,5,Lunch,0,0\n");
        let config = ReplayConfig {
            batch_size: 0,
            ..ReplayConfig::default()
        };

        let outcome = JournalReplay::new(config)
            .replay(file.path())
            .await
            .unwrap();

        assert_eq!(outcome.summary.rows_read, 1);
        assert_eq!(outcome.summary.commands_applied, 1);
        assert_eq!(account(&outcome, "0xa").owed, Decimal::from(5));
    }

    #[test]
    fn test_literal_zero_max_concurrent_still_runs() {
        let file = create_temp_journal("create,0xo,,0xa,5,Lunch,0,0\n");
        let config = ReplayConfig {
            batch_size: 10,
            coordinator: CoordinatorConfig {
                max_concurrent: 0,
                ..CoordinatorConfig::default()
            },
        };
        let mut output = Vec::new();

        let summary = JournalReplay::new(config)
            .run(file.path(), &mut output)
            .unwrap();

        assert_eq!(summary.commands_applied, 1);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "identity,owed,credit,wallet\n\
             0xa,5.000000,0,0.000000\n\
             0xo,0.000000,0,0.000000\n"
        );
    }

    #[test]
    fn test_zero_batch_size_falls_back_to_default() {
        let config = ReplayConfig::new(0, 4, 100);

        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.coordinator.max_concurrent, 4);
    }
}
