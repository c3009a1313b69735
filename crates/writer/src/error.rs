use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a write.
#[derive(Debug, Error)]
pub enum Error {
    /// The store call itself failed (as opposed to leaving items unprocessed).
    #[error("batch {chunk} of {chunks} to {table} failed: {source}")]
    Store {
        table: String,
        chunk: usize,
        chunks: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
