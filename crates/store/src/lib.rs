//! Abstract interface for the keyed tables that hold raw samples, aggregates and
//! region status.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod query;

pub use query::{KeyCondition, Query, SortCondition};

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;

/// The largest number of items a single batch-put call accepts.
pub const MAX_BATCH_ITEMS: usize = 25;

/// A stored item: attribute name to JSON-shaped value.
pub type Item = serde_json::Map<String, serde_json::Value>;

/// Marker trait for `TableStore` errors.
pub trait StoreError: Debug + Error + Send + Sync + 'static {}

/// One page of query or scan results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Items in this page.
    pub items: Vec<Item>,

    /// Cursor to pass as `exclusive_start_key` for the next page, if any.
    pub last_evaluated_key: Option<Item>,
}

/// A trait representing a set of keyed tables with asynchronous operations.
///
/// Puts are upserts keyed by each table's primary key, so repeating a write
/// converges to the last value written.
#[async_trait]
pub trait TableStore: Clone + Send + Sync + 'static {
    /// The error type for store operations.
    type Error: StoreError;

    /// Writes up to [`MAX_BATCH_ITEMS`] items to `table`.
    ///
    /// A partial failure is not an error: the items the store did not process
    /// are returned and may be resubmitted. An `Err` means the call itself failed.
    async fn batch_put(&self, table: &str, items: Vec<Item>) -> Result<Vec<Item>, Self::Error>;

    /// Reads one page of `query` against `table`.
    async fn query(&self, table: &str, query: &Query) -> Result<Page, Self::Error>;

    /// Reads one page of every item in `table`.
    async fn scan(&self, table: &str, exclusive_start_key: Option<Item>)
    -> Result<Page, Self::Error>;

    /// Follows `query` through every page.
    async fn query_all(&self, table: &str, query: &Query) -> Result<Vec<Item>, Self::Error> {
        let mut query = query.clone();
        let mut items = Vec::new();

        loop {
            let page = self.query(table, &query).await?;
            items.extend(page.items);

            match page.last_evaluated_key {
                Some(key) => query.exclusive_start_key = Some(key),
                None => return Ok(items),
            }
        }
    }

    /// Follows a scan of `table` through every page.
    async fn scan_all(&self, table: &str) -> Result<Vec<Item>, Self::Error> {
        let mut start = None;
        let mut items = Vec::new();

        loop {
            let page = self.scan(table, start).await?;
            items.extend(page.items);

            match page.last_evaluated_key {
                Some(key) => start = Some(key),
                None => return Ok(items),
            }
        }
    }
}
