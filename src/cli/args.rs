use crate::replay::ReplayConfig;
use clap::Parser;
use std::path::PathBuf;

/// Replay a shared-expense journal and print the final per-identity view
#[derive(Parser, Debug)]
#[command(name = "expense-ledger")]
#[command(about = "Replay a shared-expense journal and print balances, credits and wallets", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing journal rows
    #[arg(value_name = "INPUT", help = "Path to the input journal CSV file")]
    pub input_file: PathBuf,

    /// Number of journal rows per batch
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of journal rows read per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent transfers
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of transfers in flight and runtime worker threads (default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    /// Upper bound on a single simulated transfer
    #[arg(
        long = "transfer-timeout-ms",
        value_name = "MILLIS",
        help = "Timeout for a single transfer in milliseconds (default: 5000)"
    )]
    pub transfer_timeout_ms: Option<u64>,
}

impl CliArgs {
    /// Create a ReplayConfig from CLI arguments
    ///
    /// Missing options take their defaults. Zero values are replaced by the
    /// defaults with a warning.
    pub fn to_replay_config(&self) -> ReplayConfig {
        if self.batch_size.is_none()
            && self.max_concurrent.is_none()
            && self.transfer_timeout_ms.is_none()
        {
            return ReplayConfig::default();
        }

        let default = ReplayConfig::default();
        ReplayConfig::new(
            self.batch_size.unwrap_or(default.batch_size),
            self.max_concurrent
                .unwrap_or(default.coordinator.max_concurrent),
            self.transfer_timeout_ms
                .unwrap_or(default.coordinator.transfer_timeout.as_millis() as u64),
        )
    }
}
