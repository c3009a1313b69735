//! Resilient batch writer: splits arbitrarily many items into store-sized
//! batches and resubmits partially processed batches with exponential backoff.
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod backoff;
mod error;

pub use backoff::Backoff;
pub use error::{Error, Result};

use std::time::Duration;

use cloudping_store::{Item, MAX_BATCH_ITEMS, TableStore};
use tracing::{debug, info, warn};

/// Options for a `BatchWriter`.
#[derive(Clone, Debug)]
pub struct WriterOptions {
    /// Items per batch call; clamped to `1..=MAX_BATCH_ITEMS`.
    pub chunk_size: usize,

    /// Resubmissions of unprocessed items per batch.
    pub max_retries: u32,

    /// Delay before the first resubmission; doubles each time.
    pub base_delay: Duration,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            chunk_size: MAX_BATCH_ITEMS,
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Outcome of a completed write.
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Items handed to the writer.
    pub submitted: usize,

    /// Batch calls made, retries included.
    pub calls: usize,

    /// Items still unprocessed once retries ran out. These are not persisted.
    pub dropped: Vec<Item>,
}

impl WriteReport {
    /// Items the store accepted.
    #[must_use]
    pub fn written(&self) -> usize {
        self.submitted - self.dropped.len()
    }
}

/// Writes items to a table store in chunks, retrying partial failures.
#[derive(Clone, Debug)]
pub struct BatchWriter<S>
where
    S: TableStore,
{
    store: S,
    options: WriterOptions,
}

impl<S> BatchWriter<S>
where
    S: TableStore,
{
    /// Creates a writer with default options.
    pub fn new(store: S) -> Self {
        Self::with_options(store, WriterOptions::default())
    }

    /// Creates a writer with custom options.
    pub fn with_options(store: S, options: WriterOptions) -> Self {
        Self { store, options }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Writes `items` to `table`.
    ///
    /// Chunks are sent strictly in order. Items a chunk leaves unprocessed are
    /// resubmitted after each backoff delay; whatever remains after the last
    /// retry is dropped with a warning and listed in the report.
    ///
    /// # Errors
    ///
    /// A failing store call aborts the whole write. Earlier chunks stay written.
    pub async fn write(&self, table: &str, items: Vec<Item>) -> Result<WriteReport> {
        let mut report = WriteReport {
            submitted: items.len(),
            ..WriteReport::default()
        };
        if items.is_empty() {
            debug!(table, "nothing to write");
            return Ok(report);
        }

        let chunk_size = self.options.chunk_size.clamp(1, MAX_BATCH_ITEMS);
        let chunks = items.len().div_ceil(chunk_size);
        debug!(table, items = items.len(), chunks, "splitting write into chunks");

        let mut items = items.into_iter().peekable();
        let mut chunk = 0;
        while items.peek().is_some() {
            chunk += 1;
            let batch = items.by_ref().take(chunk_size).collect::<Vec<_>>();
            debug!(table, chunk, chunks, size = batch.len(), "writing chunk");

            let store_error = |e: S::Error| Error::Store {
                table: table.to_string(),
                chunk,
                chunks,
                source: Box::new(e),
            };

            report.calls += 1;
            let mut pending = self
                .store
                .batch_put(table, batch)
                .await
                .map_err(store_error)?;

            let mut retry = 0;
            let mut delays = Backoff::new(self.options.base_delay, self.options.max_retries);
            while !pending.is_empty() {
                let Some(delay) = delays.next() else {
                    break;
                };
                tokio::time::sleep(delay).await;

                retry += 1;
                report.calls += 1;
                pending = self
                    .store
                    .batch_put(table, pending)
                    .await
                    .map_err(store_error)?;

                if !pending.is_empty() {
                    info!(
                        table,
                        chunk,
                        retry,
                        remaining = pending.len(),
                        "items still unprocessed"
                    );
                }
            }

            if !pending.is_empty() {
                warn!(
                    table,
                    chunk,
                    dropped = pending.len(),
                    "items remained unprocessed after all retries"
                );
                report.dropped.append(&mut pending);
            }
        }

        Ok(report)
    }
}
