//! Partition detection, partition-aware endpoint construction, and selection of
//! write credentials for stores that may live across a partition boundary.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::result_large_err)]

mod credentials;
mod error;

pub use credentials::{SecretSource, SecretsManagerSource, StaticCredentials, WriteCredentials};
pub use error::{Error, Result};

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Secret holding the main-partition credentials used by sovereign-partition writers.
pub const CROSS_PARTITION_SECRET_ID: &str = "cloudping/cross-partition-credentials";

/// An isolated administrative/network boundary with its own DNS suffix and
/// credential domain.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Partition {
    /// The main commercial partition.
    #[default]
    Aws,

    /// The European Sovereign Cloud partition.
    AwsEusc,
}

impl Partition {
    /// Every known partition.
    pub const ALL: [Self; 2] = [Self::Aws, Self::AwsEusc];

    /// Classifies a region name by its prefix.
    #[must_use]
    pub fn from_region(region: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|partition| {
                partition
                    .region_prefix()
                    .is_some_and(|prefix| region.starts_with(prefix))
            })
            .unwrap_or_default()
    }

    /// The partition identifier as stored in records.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::AwsEusc => "aws-eusc",
        }
    }

    /// DNS suffix used to build service endpoints.
    #[must_use]
    pub const fn dns_suffix(self) -> &'static str {
        match self {
            Self::Aws => "amazonaws.com",
            Self::AwsEusc => "amazonaws.eu",
        }
    }

    /// Partition segment of resource ARNs.
    #[must_use]
    pub const fn arn_prefix(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::AwsEusc => "aws-eusc",
        }
    }

    /// Region-name prefix that identifies the partition. The main partition is
    /// the fallback and has none.
    const fn region_prefix(self) -> Option<&'static str> {
        match self {
            Self::Aws => None,
            Self::AwsEusc => Some("eusc-"),
        }
    }
}

impl Display for Partition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.id())
    }
}

impl FromStr for Partition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|partition| partition.id() == s)
            .ok_or_else(|| Error::UnknownPartition(s.to_string()))
    }
}

impl Serialize for Partition {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for Partition {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = String::deserialize(deserializer)?;
        id.parse().map_err(serde::de::Error::custom)
    }
}

/// Builds `"<service>.<region>.<dns-suffix>"`. When `partition` is `None` it is
/// inferred from the region name.
#[must_use]
pub fn endpoint_for(service: &str, region: &str, partition: Option<Partition>) -> String {
    let partition = partition.unwrap_or_else(|| Partition::from_region(region));
    format!("{service}.{region}.{}", partition.dns_suffix())
}

/// Like [`endpoint_for`] but as an HTTPS URL suitable for SDK endpoint overrides.
#[must_use]
pub fn endpoint_url(service: &str, region: &str, partition: Option<Partition>) -> String {
    format!("https://{}", endpoint_for(service, region, partition))
}

/// Resolves the runtime partition and the credentials needed to write into a
/// target partition.
#[derive(Clone, Debug)]
pub struct PartitionResolver<S>
where
    S: SecretSource,
{
    current_region: String,
    secret_id: String,
    secrets: S,
}

impl<S> PartitionResolver<S>
where
    S: SecretSource,
{
    /// Creates a resolver for a process running in `current_region`.
    pub fn new(current_region: impl Into<String>, secrets: S) -> Self {
        Self {
            current_region: current_region.into(),
            secret_id: CROSS_PARTITION_SECRET_ID.to_string(),
            secrets,
        }
    }

    /// Overrides the secret holding cross-partition credentials.
    #[must_use]
    pub fn with_secret_id(mut self, secret_id: impl Into<String>) -> Self {
        self.secret_id = secret_id.into();
        self
    }

    /// The partition this process runs in.
    #[must_use]
    pub fn current_partition(&self) -> Partition {
        Partition::from_region(&self.current_region)
    }

    /// Credentials for writing into `target`.
    ///
    /// Within the same partition this is ambient identity and touches no secret
    /// store. Crossing partitions fetches fresh credentials every call; nothing is
    /// cached between calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret cannot be read or does not hold a
    /// credential document.
    pub async fn write_credentials_for(&self, target: Partition) -> Result<WriteCredentials> {
        let current = self.current_partition();
        if current == target {
            return Ok(WriteCredentials::Ambient);
        }

        debug!(
            from = %current,
            to = %target,
            secret_id = %self.secret_id,
            "fetching cross-partition credentials"
        );

        let secret = self.secrets.secret_string(&self.secret_id).await?;
        let credentials: StaticCredentials = serde_json::from_str(&secret)?;

        Ok(WriteCredentials::Static(credentials))
    }
}
