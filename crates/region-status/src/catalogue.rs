use async_trait::async_trait;
use aws_config::Region;
use cloudping_partition::Partition;
use cloudping_records::OptStatus;
use tracing::warn;

use crate::{Error, Result};

/// Regions the sovereign partition is known to have. The account API does not
/// exist there, so new regions are added here by hand.
pub const SOVEREIGN_REGIONS: [&str; 1] = ["eusc-de-east-1"];

/// A region and its enablement state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CatalogueEntry {
    /// Region id.
    pub region_name: String,

    /// Enablement state.
    pub status: OptStatus,
}

/// Lists the regions of one partition.
#[async_trait]
pub trait RegionCatalogue: Clone + Send + Sync + 'static {
    /// Partition the listed regions belong to.
    fn partition(&self) -> Partition;

    /// Every known region.
    async fn regions(&self) -> Result<Vec<CatalogueEntry>>;
}

/// Lists regions with the account API.
#[derive(Clone, Debug)]
pub struct AccountRegionCatalogue {
    client: aws_sdk_account::Client,
}

impl AccountRegionCatalogue {
    /// Creates a new `AccountRegionCatalogue`.
    pub async fn new(region: String) -> Self {
        let config = aws_config::from_env()
            .region(Region::new(region))
            .load()
            .await;

        Self {
            client: aws_sdk_account::Client::new(&config),
        }
    }
}

#[async_trait]
impl RegionCatalogue for AccountRegionCatalogue {
    fn partition(&self) -> Partition {
        Partition::Aws
    }

    async fn regions(&self) -> Result<Vec<CatalogueEntry>> {
        let mut pages = self.client.list_regions().into_paginator().send();
        let mut entries = Vec::new();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| Error::Account(e.into()))?;

            for region in page.regions() {
                let (Some(name), Some(status)) = (region.region_name(), region.region_opt_status())
                else {
                    continue;
                };

                match status.as_str().parse::<OptStatus>() {
                    Ok(status) => entries.push(CatalogueEntry {
                        region_name: name.to_string(),
                        status,
                    }),
                    Err(e) => warn!(region = name, "skipping region: {}", e),
                }
            }
        }

        Ok(entries)
    }
}

/// A fixed region list for partitions without a region-enumeration API.
#[derive(Clone, Debug)]
pub struct StaticRegionCatalogue {
    partition: Partition,
    entries: Vec<CatalogueEntry>,
}

impl StaticRegionCatalogue {
    /// Lists `regions` of `partition`, all with `status`.
    pub fn new<I, R>(partition: Partition, regions: I, status: OptStatus) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            partition,
            entries: regions
                .into_iter()
                .map(|region| CatalogueEntry {
                    region_name: region.into(),
                    status,
                })
                .collect(),
        }
    }

    /// The sovereign partition's regions, all enabled.
    #[must_use]
    pub fn sovereign() -> Self {
        Self::new(Partition::AwsEusc, SOVEREIGN_REGIONS, OptStatus::Enabled)
    }
}

#[async_trait]
impl RegionCatalogue for StaticRegionCatalogue {
    fn partition(&self) -> Partition {
        self.partition
    }

    async fn regions(&self) -> Result<Vec<CatalogueEntry>> {
        Ok(self.entries.clone())
    }
}
