use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a status refresh.
#[derive(Debug, Error)]
pub enum Error {
    /// The account API could not list regions.
    #[error("could not list regions: {0}")]
    Account(#[from] aws_sdk_account::Error),

    /// A status record could not be encoded.
    #[error(transparent)]
    Record(#[from] cloudping_records::Error),

    /// Status records could not be written.
    #[error(transparent)]
    Write(#[from] cloudping_writer::Error),
}
