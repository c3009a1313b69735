use std::fmt::{Debug, Formatter, Result as FmtResult};

use async_trait::async_trait;
use aws_config::Region;
use serde::Deserialize;

use crate::{Error, Result};

/// Credentials a writer should use for a target partition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WriteCredentials {
    /// The process's own identity (default credential chain).
    Ambient,

    /// Long-lived keys for the target partition, fetched from the secret store.
    Static(StaticCredentials),
}

/// Access key pair stored as the cross-partition secret.
#[derive(Clone, Deserialize, Eq, PartialEq)]
pub struct StaticCredentials {
    /// Access key id.
    pub access_key_id: String,

    /// Secret access key.
    pub secret_access_key: String,
}

impl Debug for StaticCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// A store of named string secrets.
#[async_trait]
pub trait SecretSource: Clone + Send + Sync + 'static {
    /// Fetches the string value of `secret_id`.
    async fn secret_string(&self, secret_id: &str) -> Result<String>;
}

/// [`SecretSource`] backed by AWS Secrets Manager in the caller's region.
#[derive(Clone, Debug)]
pub struct SecretsManagerSource {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerSource {
    /// Creates a new `SecretsManagerSource` for `region`.
    pub async fn new(region: String) -> Self {
        let config = aws_config::from_env()
            .region(Region::new(region))
            .load()
            .await;

        Self {
            client: aws_sdk_secretsmanager::Client::new(&config),
        }
    }
}

#[async_trait]
impl SecretSource for SecretsManagerSource {
    async fn secret_string(&self, secret_id: &str) -> Result<String> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| Error::SecretsManager(e.into()))?;

        response
            .secret_string
            .ok_or_else(|| Error::EmptySecret(secret_id.to_string()))
    }
}
