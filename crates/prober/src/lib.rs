//! TCP latency prober: measures connect-handshake latency from the current
//! region to every enabled destination and stores one raw sample record per
//! reachable destination.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod dialer;
mod error;

pub use dialer::{DialError, Dialer, TcpDialer};
pub use error::{Error, Result};

use std::time::Duration;

use cloudping_partition::{Partition, endpoint_for};
use cloudping_records::{Clock, OptStatus, ProbeResult, Sample, format_timestamp, to_item};
use cloudping_store::TableStore;
use cloudping_writer::BatchWriter;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// A region to measure latency to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Destination {
    /// Region id.
    pub region: String,

    /// Partition of the region.
    pub partition: Partition,
}

/// Options for a `Prober`.
#[derive(Clone, Debug)]
pub struct ProberOptions {
    /// Connect attempts per destination.
    pub attempts: u32,

    /// Per-attempt connect timeout.
    pub connect_timeout: Duration,

    /// Pause between consecutive attempts to the same destination.
    pub pacing: Duration,

    /// Port dialed on every destination.
    pub port: u16,

    /// Service whose regional endpoint is dialed.
    pub service: String,
}

impl Default for ProberOptions {
    fn default() -> Self {
        Self {
            attempts: 5,
            connect_timeout: Duration::from_secs(1),
            pacing: Duration::from_secs(1),
            port: 443,
            service: "dynamodb".to_string(),
        }
    }
}

/// Outcome of a probe run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProbeReport {
    /// Destinations probed.
    pub destinations: usize,

    /// Destinations with at least one successful attempt.
    pub reachable: usize,

    /// Raw sample records the store accepted.
    pub written: usize,
}

#[derive(Deserialize)]
struct CatalogueRow {
    region_name: String,
    status: OptStatus,
    #[serde(default)]
    partition: Partition,
}

/// Reads the enabled regions of both partitions from the status table.
///
/// # Errors
///
/// Returns an error if the table cannot be scanned. Rows that do not decode
/// are skipped.
pub async fn destinations<S>(store: &S, status_table: &str) -> Result<Vec<Destination>>
where
    S: TableStore,
{
    let items = store
        .scan_all(status_table)
        .await
        .map_err(|e| Error::Store(Box::new(e)))?;

    let mut destinations = items
        .into_iter()
        .filter_map(|item| match cloudping_records::from_item::<CatalogueRow>(item) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("skipping malformed region row: {}", e);
                None
            }
        })
        .filter(|row| row.status.is_enabled())
        .map(|row| Destination {
            region: row.region_name,
            partition: row.partition,
        })
        .collect::<Vec<_>>();
    destinations.sort_by(|a, b| a.region.cmp(&b.region));

    Ok(destinations)
}

/// Measures latency from one source region.
#[derive(Clone, Debug)]
pub struct Prober<D, C>
where
    D: Dialer,
    C: Clock,
{
    source_region: String,
    dialer: D,
    clock: C,
    options: ProberOptions,
}

impl<D, C> Prober<D, C>
where
    D: Dialer,
    C: Clock,
{
    /// Creates a prober running in `source_region` with default options.
    pub fn new(source_region: impl Into<String>, dialer: D, clock: C) -> Self {
        Self::with_options(source_region, dialer, clock, ProberOptions::default())
    }

    /// Creates a prober with custom options.
    pub fn with_options(
        source_region: impl Into<String>,
        dialer: D,
        clock: C,
        options: ProberOptions,
    ) -> Self {
        Self {
            source_region: source_region.into(),
            dialer,
            clock,
            options,
        }
    }

    /// Probes one destination. Returns `None` when every attempt failed.
    pub async fn probe(&self, destination: &Destination) -> Option<ProbeResult> {
        let address = endpoint_for(
            &self.options.service,
            &destination.region,
            Some(destination.partition),
        );
        let port = self.options.port;
        let mut samples = Vec::new();

        for seq in 0..self.options.attempts {
            match self
                .dialer
                .dial(&address, port, self.options.connect_timeout)
                .await
            {
                Ok(elapsed) => {
                    let time = round_millis(elapsed);
                    debug!("connected to {}[{}]: tcp_seq={} time={} ms", address, port, seq, time);
                    samples.push(Sample { seq, time });
                }
                Err(e) => {
                    debug!("attempt {} to {}[{}] failed: {}", seq, address, port, e);
                }
            }

            if seq + 1 < self.options.attempts {
                tokio::time::sleep(self.options.pacing).await;
            }
        }

        self.summarize(&destination.region, samples.len());

        ProbeResult::from_samples(
            self.source_region.clone(),
            Partition::from_region(&self.source_region),
            destination.region.clone(),
            destination.partition,
            address,
            port,
            self.options.attempts,
            samples,
            format_timestamp(self.clock.now()),
        )
    }

    /// Probes every destination in order, one at a time.
    pub async fn probe_all(&self, destinations: &[Destination]) -> Vec<ProbeResult> {
        let mut results = Vec::with_capacity(destinations.len());
        for destination in destinations {
            if let Some(result) = self.probe(destination).await {
                results.push(result);
            }
        }
        results
    }

    /// Probes every enabled destination listed in `status_table` and writes the
    /// results to `raw_table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination list cannot be read or the write
    /// fails. Unreachable destinations are simply left out.
    pub async fn run<S>(
        &self,
        writer: &BatchWriter<S>,
        status_table: &str,
        raw_table: &str,
    ) -> Result<ProbeReport>
    where
        S: TableStore,
    {
        let destinations = destinations(writer.store(), status_table).await?;
        info!(
            source = %self.source_region,
            destinations = destinations.len(),
            "probing destinations"
        );

        let results = self.probe_all(&destinations).await;
        let items = results
            .iter()
            .map(to_item)
            .collect::<cloudping_records::Result<Vec<_>>>()?;
        let written = writer.write(raw_table, items).await?.written();

        Ok(ProbeReport {
            destinations: destinations.len(),
            reachable: results.len(),
            written,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn summarize(&self, destination: &str, passed: usize) {
        let total = self.options.attempts as usize;
        let failed = total.saturating_sub(passed);
        let failure_rate = if total == 0 {
            0.0
        } else {
            failed as f64 / total as f64 * 100.0
        };

        info!(
            destination,
            total,
            passed,
            failed,
            "TCP ping results: failed {:.2}%",
            failure_rate
        );
    }
}

/// Milliseconds rounded to two decimals.
fn round_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}
