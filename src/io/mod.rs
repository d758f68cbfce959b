//! I/O module
//!
//! Handles journal parsing and account output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (row conversion, output serialization)
//! - `async_reader` - Asynchronous journal reader with batch reading interface

pub mod async_reader;
pub mod csv_format;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_journal_row, write_accounts_csv, AccountView, JournalRow, LedgerCommand,
};
