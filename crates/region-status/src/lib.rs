//! Region status tracker: records, for every region of a partition, whether
//! the prober is deployed there and how far back its raw samples reach.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::result_large_err)]

mod catalogue;
mod deployment;
mod error;

pub use catalogue::{
    AccountRegionCatalogue, CatalogueEntry, RegionCatalogue, SOVEREIGN_REGIONS,
    StaticRegionCatalogue,
};
pub use deployment::{DeploymentProbe, LambdaDeploymentProbe, prober_function_name};
pub use error::{Error, Result};

use cloudping_partition::Partition;
use cloudping_records::{RAW_SAMPLE_INDEX, RegionStatus, to_item};
use cloudping_store::{Query, TableStore};
use cloudping_writer::BatchWriter;
use tracing::{debug, info, warn};

/// Outcome of a status refresh.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RefreshReport {
    /// Regions in the catalogue.
    pub regions: usize,

    /// Status records the store accepted.
    pub written: usize,

    /// Timestamp lookups that failed and were recorded as absent.
    pub lookup_failures: usize,
}

/// Refreshes the status table for one partition.
#[derive(Clone, Debug)]
pub struct RegionStatusTracker<S, R, D>
where
    S: TableStore,
    R: RegionCatalogue,
    D: DeploymentProbe,
{
    writer: BatchWriter<S>,
    catalogue: R,
    deployment: D,
    raw_table: String,
    status_table: String,
}

impl<S, R, D> RegionStatusTracker<S, R, D>
where
    S: TableStore,
    R: RegionCatalogue,
    D: DeploymentProbe,
{
    /// Creates a tracker reading samples from `raw_table` and writing to
    /// `status_table`.
    pub fn new(
        writer: BatchWriter<S>,
        catalogue: R,
        deployment: D,
        raw_table: impl Into<String>,
        status_table: impl Into<String>,
    ) -> Self {
        Self {
            writer,
            catalogue,
            deployment,
            raw_table: raw_table.into(),
            status_table: status_table.into(),
        }
    }

    /// Builds and writes one status record per catalogued region.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalogue cannot be listed or the write fails.
    /// Failed timestamp lookups only blank that region's timestamps.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let partition = self.catalogue.partition();
        let entries = self.catalogue.regions().await?;
        info!(%partition, regions = entries.len(), "refreshing region status");

        let mut report = RefreshReport {
            regions: entries.len(),
            ..RefreshReport::default()
        };
        let mut items = Vec::with_capacity(entries.len());

        for entry in entries {
            let region = entry.region_name.as_str();
            let ping_function_exists = self.deployment.is_deployed(region).await;

            let failures = &mut report.lookup_failures;
            let earliest = self.lookup_timestamp(region, true, failures).await;
            let latest = self.lookup_timestamp(region, false, failures).await;

            let status = RegionStatus {
                region_name: entry.region_name.clone(),
                partition,
                status: entry.status,
                is_opt_in: partition == Partition::AwsEusc || entry.status.is_opt_in(),
                ping_function_exists,
                earliest_data_timestamp: earliest,
                most_recent_data_timestamp: latest,
            };
            debug!(?status, "region status");

            items.push(to_item(&status)?);
        }

        report.written = self.writer.write(&self.status_table, items).await?.written();

        Ok(report)
    }

    async fn lookup_timestamp(
        &self,
        region: &str,
        ascending: bool,
        failures: &mut usize,
    ) -> Option<String> {
        match self.data_timestamp(region, ascending).await {
            Ok(timestamp) => timestamp,
            Err(e) => {
                warn!(region, ascending, "timestamp lookup failed: {}", e);
                *failures += 1;
                None
            }
        }
    }

    /// Timestamp of the oldest (`ascending`) or newest raw sample from `region`.
    async fn data_timestamp(
        &self,
        region: &str,
        ascending: bool,
    ) -> std::result::Result<Option<String>, S::Error> {
        let mut query =
            Query::on_index(RAW_SAMPLE_INDEX, "region", region, "timestamp").with_limit(1);
        if !ascending {
            query = query.descending();
        }

        let page = self.writer.store().query(&self.raw_table, &query).await?;

        Ok(page
            .items
            .first()
            .and_then(|item| item.get("timestamp"))
            .and_then(|timestamp| timestamp.as_str())
            .map(String::from))
    }
}
