use async_trait::async_trait;
use aws_config::Region;
use cloudping_partition::Partition;
use tracing::{debug, warn};

/// Name the prober function is deployed under in `partition`.
#[must_use]
pub const fn prober_function_name(partition: Partition) -> &'static str {
    match partition {
        Partition::Aws => "ping_from_region-prod-ping",
        Partition::AwsEusc => "ping_from_region-eusc-ping",
    }
}

/// Tells whether the prober is deployed in a region.
#[async_trait]
pub trait DeploymentProbe: Clone + Send + Sync + 'static {
    /// Whether the prober exists in `region`. Failures count as "not deployed".
    async fn is_deployed(&self, region: &str) -> bool;
}

/// Looks the prober function up with the Lambda API of each region.
#[derive(Clone, Debug)]
pub struct LambdaDeploymentProbe {
    function_name: String,
}

impl LambdaDeploymentProbe {
    /// Probes for the prober function of `partition`.
    #[must_use]
    pub fn for_partition(partition: Partition) -> Self {
        Self::new(prober_function_name(partition))
    }

    /// Probes for `function_name`.
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
        }
    }
}

#[async_trait]
impl DeploymentProbe for LambdaDeploymentProbe {
    async fn is_deployed(&self, region: &str) -> bool {
        let config = aws_config::from_env()
            .region(Region::new(region.to_string()))
            .load()
            .await;
        let client = aws_sdk_lambda::Client::new(&config);

        match client
            .get_function_configuration()
            .function_name(&self.function_name)
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception());
                if not_found {
                    debug!(region, function = %self.function_name, "prober not deployed");
                } else {
                    warn!(region, function = %self.function_name, "could not check prober: {}", e);
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_names() {
        assert_eq!(prober_function_name(Partition::Aws), "ping_from_region-prod-ping");
        assert_eq!(prober_function_name(Partition::AwsEusc), "ping_from_region-eusc-ping");
    }
}
