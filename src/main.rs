//! Expense Ledger CLI
//!
//! Command-line interface for replaying a shared-expense journal.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- journal.csv > accounts.csv
//! cargo run -- --batch-size 2000 --max-concurrent 8 journal.csv > accounts.csv
//! RUST_LOG=debug cargo run -- --transfer-timeout-ms 1000 journal.csv
//! ```
//!
//! The program reads journal rows from the input CSV file, applies them to a
//! fresh ledger and prints the final owed amount, reward credit and simulated
//! wallet balance of every identity to stdout. Diagnostics go to stderr through
//! `env_logger`.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, view drift, etc.)

use expense_ledger::cli;
use expense_ledger::replay::JournalReplay;
use std::process;

fn main() {
    env_logger::init();

    // Parse command-line arguments using clap
    let args = cli::parse_args();
    let replay = JournalReplay::new(args.to_replay_config());

    // Output goes to stdout
    let mut output = std::io::stdout();
    if let Err(e) = replay.run(&args.input_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
