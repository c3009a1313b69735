use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("record did not serialize to an object")]
    NotAnObject,

    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown timeframe: {0}")]
    UnknownTimeframe(String),

    #[error("unknown region opt status: {0}")]
    UnknownOptStatus(String),
}
