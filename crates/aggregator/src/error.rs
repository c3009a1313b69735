use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that fail an aggregation.
#[derive(Debug, Error)]
pub enum Error {
    /// A required request field was absent.
    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    /// A raw sample could not be decoded.
    #[error(transparent)]
    Record(#[from] cloudping_records::Error),

    /// The raw sample store failed.
    #[error("raw sample query failed: {0}")]
    Store(Box<dyn std::error::Error + Send + Sync>),
}
