use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an orchestration run.
#[derive(Debug, Error)]
pub enum Error {
    /// The in-process aggregator failed.
    #[error(transparent)]
    Aggregate(#[from] cloudping_aggregator::Error),

    /// The Lambda API call failed.
    #[error("lambda invocation failed: {0}")]
    Lambda(#[from] aws_sdk_lambda::Error),

    /// The request payload could not be encoded.
    #[error("could not encode aggregation request: {0}")]
    Payload(#[from] serde_json::Error),

    /// An aggregate record could not be built.
    #[error(transparent)]
    Record(#[from] cloudping_records::Error),

    /// The remote aggregator ran but did not succeed.
    #[error("{function} did not succeed: {reason}")]
    RemoteInvocation {
        /// Name of the aggregator that was invoked.
        function: String,

        /// What went wrong.
        reason: String,
    },

    /// The status table could not be read.
    #[error("region status scan failed: {0}")]
    Store(Box<dyn std::error::Error + Send + Sync>),

    /// Aggregates could not be written.
    #[error(transparent)]
    Write(#[from] cloudping_writer::Error),
}
