//! Asynchronous journal reader with batch interface
//!
//! Provides a streaming interface over ledger commands from a CSV journal.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - tokio for async runtime
//! - Batch reading so very large journals never sit in memory at once
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of LedgerCommands
//!                  ↓
//!           csv_format module
//!           (JournalRow, convert_journal_row)
//! ```

use crate::io::csv_format::{convert_journal_row, JournalRow, LedgerCommand};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use log::warn;

/// Asynchronous journal reader
///
/// Rows that fail to parse or to convert are logged and skipped, so a batch only
/// ever holds valid commands.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    /// Data rows consumed so far, valid or not
    rows_read: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a reader over a journal with a header row
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            rows_read: 0,
        }
    }

    /// Read up to `batch_size` valid commands
    ///
    /// Returns an empty vector once the end of the journal is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<LedgerCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut rows = self.csv_reader.deserialize::<JournalRow>();

        while batch.len() < batch_size {
            let next = rows.next().await;
            if next.is_some() {
                self.rows_read += 1;
            }
            match next {
                Some(Ok(row)) => match convert_journal_row(row) {
                    Ok(command) => batch.push(command),
                    Err(e) => warn!("Skipping journal row {}: {}", self.rows_read, e),
                },
                Some(Err(e)) => warn!("Skipping journal row {}: {}", self.rows_read, e),
                None => break,
            }
        }

        batch
    }

    /// Number of data rows consumed so far, including skipped ones
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Identity;
    use futures::io::Cursor;

    const HEADER: &str = "op,caller,expense,members,amounts,description,rate,at\n";

    fn reader(rows: &str) -> AsyncReader<Cursor<Vec<u8>>> {
        AsyncReader::new(Cursor::new(format!("{HEADER}{rows}").into_bytes()))
    }

    #[tokio::test]
    async fn test_read_batch_in_order() {
        let mut reader = reader(
            "fund,0xa,,,10,,,\n\
             create,0xo,,0xa,5,Dinner,1,0\n\
             settle,0xa,0,,,,,86400\n",
        );

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert!(matches!(batch[0], LedgerCommand::Fund { .. }));
        assert!(matches!(batch[1], LedgerCommand::Create { .. }));

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert!(matches!(batch[0], LedgerCommand::Settle { .. }));

        assert!(reader.read_batch(2).await.is_empty());
        assert_eq!(reader.rows_read(), 3);
    }

    #[tokio::test]
    async fn test_empty_journal() {
        let mut reader = reader("");

        assert!(reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_rows_are_skipped() {
        let mut reader = reader(
            "refund,0xa,,,10,,,\n\
             fund,,,,10,,,\n\
             delete,0xo,1,,,,,\n",
        );

        let batch = reader.read_batch(10).await;

        assert_eq!(
            batch,
            vec![LedgerCommand::Delete {
                caller: Identity::new("0xo").unwrap(),
                expense: 1,
            }]
        );
        assert_eq!(reader.rows_read(), 3);
    }

    #[tokio::test]
    async fn test_whitespace_and_case_are_ignored() {
        let mut reader = reader("  DELETE  ,  0xO  ,  4  ,,,,,\n");

        let batch = reader.read_batch(10).await;

        assert_eq!(
            batch,
            vec![LedgerCommand::Delete {
                caller: Identity::new("0xo").unwrap(),
                expense: 4,
            }]
        );
    }
}
