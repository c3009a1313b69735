use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop a probe run. Unreachable destinations are not errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A result could not be encoded as a store item.
    #[error(transparent)]
    Record(#[from] cloudping_records::Error),

    /// The destination catalogue could not be read.
    #[error("failed to read destinations: {0}")]
    Store(Box<dyn std::error::Error + Send + Sync>),

    /// Persisting results failed.
    #[error(transparent)]
    Write(#[from] cloudping_writer::Error),
}
