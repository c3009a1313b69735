use cloudping_store::StoreError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// More items than a single batch accepts.
    #[error("batch of {0} items exceeds the batch limit")]
    BatchTooLarge(usize),

    /// An item lacks one of its table's key attributes.
    #[error("item is missing key attribute {0}")]
    MissingKey(String),

    /// The table was never declared.
    #[error("unknown table {0}")]
    UnknownTable(String),
}

impl StoreError for Error {}
