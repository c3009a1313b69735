use cloudping_partition::Partition;
use serde::{Deserialize, Serialize};

/// Secondary index on the raw sample table: hash `region`, range `timestamp`.
pub const RAW_SAMPLE_INDEX: &str = "region-timestamp-index";

/// One successful connect attempt.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Sample {
    /// Zero-based attempt number.
    pub seq: u32,

    /// Round-trip time in milliseconds.
    pub time: f64,
}

/// One source to destination measurement, as stored in the raw sample table.
///
/// Only built through [`ProbeResult::from_samples`], which refuses to build a
/// result without at least one successful attempt.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ProbeResult {
    /// Source region.
    #[serde(rename = "region")]
    pub source: String,

    /// Destination region.
    #[serde(rename = "regionTo")]
    pub destination: String,

    /// Partition of the source region.
    #[serde(rename = "partition")]
    pub source_partition: Partition,

    /// Partition of the destination region.
    #[serde(rename = "partitionTo")]
    pub destination_partition: Partition,

    /// Mean of the successful samples, in milliseconds.
    pub avg: f64,

    /// Fastest successful sample.
    pub min: f64,

    /// Slowest successful sample.
    pub max: f64,

    /// Port that was dialed.
    pub port: u16,

    /// Endpoint that was dialed.
    pub address: String,

    /// Attempts made.
    pub attempts: u32,

    /// Attempts that connected.
    #[serde(rename = "attemptsSuccess")]
    pub attempts_success: u32,

    /// Successful samples in attempt order.
    pub results: Vec<Sample>,

    /// When the measurement finished, `YYYY-MM-DDTHH:MM:SS.sssZ`.
    pub timestamp: String,
}

impl ProbeResult {
    /// Summarizes `samples` out of `attempts` tries. Returns `None` when nothing
    /// connected.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_samples(
        source: String,
        source_partition: Partition,
        destination: String,
        destination_partition: Partition,
        address: String,
        port: u16,
        attempts: u32,
        samples: Vec<Sample>,
        timestamp: String,
    ) -> Option<Self> {
        let first = samples.first()?.time;
        let (min, max, sum) = samples.iter().fold((first, first, 0.0), |(min, max, sum), s| {
            (min.min(s.time), max.max(s.time), sum + s.time)
        });
        #[allow(clippy::cast_precision_loss)]
        let avg = sum / samples.len() as f64;
        let attempts_success = u32::try_from(samples.len()).ok()?;

        Some(Self {
            source,
            destination,
            source_partition,
            destination_partition,
            avg,
            min,
            max,
            port,
            address,
            attempts: attempts.max(attempts_success),
            attempts_success,
            results: samples,
            timestamp,
        })
    }
}
