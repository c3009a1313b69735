use cloudping_store::StoreError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A request could not be assembled.
    #[error(transparent)]
    Build(#[from] aws_sdk_dynamodb::error::BuildError),

    /// The service call failed.
    #[error(transparent)]
    DynamoDb(#[from] aws_sdk_dynamodb::Error),

    /// A stored attribute has a type with no JSON counterpart.
    #[error("unsupported attribute type in {0}")]
    UnsupportedAttribute(String),

    /// A number attribute could not be parsed.
    #[error("invalid number attribute {0}")]
    InvalidNumber(String),
}

impl StoreError for Error {}
