use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use cloudping_aggregator::{AggregateRequest, AggregateResponse, Aggregator};
use cloudping_records::Clock;
use cloudping_store::TableStore;
use tracing::debug;

use crate::{Error, Result};

/// Runs one aggregation and waits for its outcome.
#[async_trait]
pub trait AggregatorInvoker: Clone + Send + Sync + 'static {
    /// Invokes the aggregator with `request`.
    async fn invoke(&self, request: &AggregateRequest) -> Result<AggregateResponse>;
}

/// Calls an [`Aggregator`] in process.
#[derive(Clone, Debug)]
pub struct LocalInvoker<S, C>
where
    S: TableStore,
    C: Clock,
{
    aggregator: Aggregator<S, C>,
}

impl<S, C> LocalInvoker<S, C>
where
    S: TableStore,
    C: Clock,
{
    /// Wraps `aggregator`.
    pub const fn new(aggregator: Aggregator<S, C>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl<S, C> AggregatorInvoker for LocalInvoker<S, C>
where
    S: TableStore,
    C: Clock,
{
    async fn invoke(&self, request: &AggregateRequest) -> Result<AggregateResponse> {
        Ok(self.aggregator.aggregate(request).await?)
    }
}

/// Invokes an aggregator deployed as a Lambda function and waits for the response.
#[derive(Clone, Debug)]
pub struct LambdaInvoker {
    client: aws_sdk_lambda::Client,
    function_name: String,
}

impl LambdaInvoker {
    /// Creates a new `LambdaInvoker` for `function_name` in `region`.
    pub async fn new(region: String, function_name: String) -> Self {
        let config = aws_config::from_env()
            .region(Region::new(region))
            .load()
            .await;

        Self {
            client: aws_sdk_lambda::Client::new(&config),
            function_name,
        }
    }

    fn failure(&self, reason: impl Into<String>) -> Error {
        Error::RemoteInvocation {
            function: self.function_name.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl AggregatorInvoker for LambdaInvoker {
    async fn invoke(&self, request: &AggregateRequest) -> Result<AggregateResponse> {
        let payload = serde_json::to_vec(request)?;
        debug!(function = %self.function_name, "invoking aggregator");

        let output = self
            .client
            .invoke()
            .function_name(&self.function_name)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| Error::Lambda(e.into()))?;

        let body = output.payload().map_or(&[][..], |blob| blob.as_ref());

        if output.status_code() != 200 {
            return Err(self.failure(format!("status code {}", output.status_code())));
        }
        if let Some(kind) = output.function_error() {
            return Err(self.failure(format!("{kind}: {}", String::from_utf8_lossy(body))));
        }

        decode_response(body).map_err(|e| self.failure(format!("undecodable response: {e}")))
    }
}

/// Decodes an aggregator response body. Statistics may be numbers or decimal
/// strings.
fn decode_response(body: &[u8]) -> serde_json::Result<AggregateResponse> {
    serde_json::from_slice(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_string_valued_statistics() {
        let body = br#"{"us-east-1": [{"region_to": "eu-west-1", "avg_latency": "50.5",
            "p_10": "49.3", "p_25": "49.75", "p_50": "50.5", "p_75": "51.25",
            "p_90": "51.7", "p_98": "51.94", "p_99": "51.97"}]}"#;

        let response = decode_response(body).unwrap();

        let stats = &response["us-east-1"][0];
        assert_eq!(stats.region_to, "eu-west-1");
        assert!((stats.avg_latency - 50.5).abs() < 1e-9);
        assert!((stats.p_99 - 51.97).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_error_bodies() {
        let body = br#"{"errorMessage": "missing required input: region"}"#;

        assert!(decode_response(body).is_err());
    }
}
