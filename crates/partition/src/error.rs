use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving partitions or fetching cross-partition credentials.
#[derive(Debug, Error)]
pub enum Error {
    /// The secret exists but holds no string payload.
    #[error("secret {0} has no string value")]
    EmptySecret(String),

    /// The secret payload is not the expected credential document.
    #[error("malformed credential secret: {0}")]
    MalformedSecret(#[from] serde_json::Error),

    /// The secret store could not be read.
    #[error(transparent)]
    SecretsManager(#[from] aws_sdk_secretsmanager::Error),

    /// The secret store could not be read (non-AWS sources).
    #[error("secret store error: {0}")]
    SecretSource(String),

    /// A partition identifier did not name a known partition.
    #[error("unknown partition: {0}")]
    UnknownPartition(String),
}
