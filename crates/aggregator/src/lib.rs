//! Percentile aggregator: reads the raw samples a source region produced in a
//! time window and summarizes the latency to each destination.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod number;
mod stats;
mod window;

pub use error::{Error, Result};
pub use stats::{percentile, summarize};
pub use window::window;

use std::collections::BTreeMap;

use cloudping_records::{Clock, LatencyStats, RAW_SAMPLE_INDEX, Timeframe, from_item};
use cloudping_store::{Query, TableStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use number::lenient_f64;

/// Explicit bounds for a [`Timeframe::Range`] aggregation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CustomRange {
    /// Inclusive start, `YYYY-MM-DDTHH:MM:SS.sssZ`.
    pub range_start_timestamp: String,

    /// Inclusive end, `YYYY-MM-DDTHH:MM:SS.sssZ`.
    pub range_end_timestamp: String,
}

/// Aggregation payload. Fields are optional on the wire so that an absent one
/// is reported as missing input rather than a decoding error.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AggregateRequest {
    /// Source region whose samples are aggregated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Who asked, e.g. `scheduled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_source: Option<String>,

    /// Window to aggregate over.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_range: Option<Timeframe>,

    /// Bounds, required when `latency_range` is `RANGE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_range: Option<CustomRange>,
}

impl AggregateRequest {
    /// The request a scheduled run sends for `region` over `timeframe`.
    pub fn scheduled(region: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            region: Some(region.into()),
            execution_source: Some("scheduled".to_string()),
            latency_range: Some(timeframe),
            custom_range: None,
        }
    }
}

/// Statistics for one destination in an aggregation response.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DestinationStats {
    /// Destination region.
    pub region_to: String,

    /// Mean latency in milliseconds.
    #[serde(deserialize_with = "lenient_f64")]
    pub avg_latency: f64,

    /// 10th percentile.
    #[serde(deserialize_with = "lenient_f64")]
    pub p_10: f64,
    /// 25th percentile.
    #[serde(deserialize_with = "lenient_f64")]
    pub p_25: f64,
    /// 50th percentile.
    #[serde(deserialize_with = "lenient_f64")]
    pub p_50: f64,
    /// 75th percentile.
    #[serde(deserialize_with = "lenient_f64")]
    pub p_75: f64,
    /// 90th percentile.
    #[serde(deserialize_with = "lenient_f64")]
    pub p_90: f64,
    /// 98th percentile.
    #[serde(deserialize_with = "lenient_f64")]
    pub p_98: f64,
    /// 99th percentile.
    #[serde(deserialize_with = "lenient_f64")]
    pub p_99: f64,
}

impl DestinationStats {
    /// Pairs `stats` with the destination they describe.
    pub fn new(region_to: impl Into<String>, stats: &LatencyStats) -> Self {
        Self {
            region_to: region_to.into(),
            avg_latency: stats.mean,
            p_10: stats.p_10,
            p_25: stats.p_25,
            p_50: stats.p_50,
            p_75: stats.p_75,
            p_90: stats.p_90,
            p_98: stats.p_98,
            p_99: stats.p_99,
        }
    }

    /// The statistics without the destination.
    #[must_use]
    pub const fn stats(&self) -> LatencyStats {
        LatencyStats {
            mean: self.avg_latency,
            p_10: self.p_10,
            p_25: self.p_25,
            p_50: self.p_50,
            p_75: self.p_75,
            p_90: self.p_90,
            p_98: self.p_98,
            p_99: self.p_99,
        }
    }
}

/// The part of a raw sample the aggregation reads. Rows from before the
/// partition attributes existed decode just as well.
#[derive(Deserialize)]
struct RawLatency {
    #[serde(rename = "regionTo")]
    destination: String,

    #[serde(deserialize_with = "lenient_f64")]
    avg: f64,
}

/// Aggregation response: the source region mapped to per-destination statistics,
/// ordered by destination.
pub type AggregateResponse = BTreeMap<String, Vec<DestinationStats>>;

/// Computes latency percentiles from the raw sample table.
#[derive(Clone, Debug)]
pub struct Aggregator<S, C>
where
    S: TableStore,
    C: Clock,
{
    store: S,
    clock: C,
    raw_table: String,
}

impl<S, C> Aggregator<S, C>
where
    S: TableStore,
    C: Clock,
{
    /// Creates an aggregator reading samples from `raw_table`.
    pub fn new(store: S, clock: C, raw_table: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            raw_table: raw_table.into(),
        }
    }

    /// Validates `request` and aggregates the requested window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingInput`] before touching the store if a required
    /// field is absent, or an error if the samples cannot be read.
    pub async fn aggregate(&self, request: &AggregateRequest) -> Result<AggregateResponse> {
        let region = request
            .region
            .as_deref()
            .ok_or(Error::MissingInput("region"))?;
        let source = request
            .execution_source
            .as_deref()
            .ok_or(Error::MissingInput("execution_source"))?;
        let timeframe = request
            .latency_range
            .ok_or(Error::MissingInput("latency_range"))?;
        let condition = window(timeframe, self.clock.now(), request.custom_range.as_ref())?;

        info!(region, timeframe = %timeframe, source, "aggregating latency");

        let query = Query::on_index(RAW_SAMPLE_INDEX, "region", region, "timestamp")
            .with_sort(condition);
        let items = self
            .store
            .query_all(&self.raw_table, &query)
            .await
            .map_err(|e| Error::Store(Box::new(e)))?;
        debug!(region, samples = items.len(), "read raw samples");

        let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for item in items {
            let sample: RawLatency = from_item(item)?;
            grouped
                .entry(sample.destination)
                .or_default()
                .push(sample.avg);
        }

        let destinations = grouped
            .into_iter()
            .filter_map(|(destination, values)| {
                summarize(values).map(|stats| DestinationStats::new(destination, &stats))
            })
            .collect();

        Ok(BTreeMap::from([(region.to_string(), destinations)]))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use cloudping_records::FixedClock;
    use cloudping_store_memory::{KeySchema, MemoryStore};
    use serde_json::{Value, json};

    use super::*;

    const RAW: &str = "PingTest";

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 5, 17, 6, 10, 0).unwrap())
    }

    fn sample(from: &str, to: &str, avg: f64, timestamp: &str) -> cloudping_store::Item {
        let Value::Object(item) = json!({
            "region": from,
            "regionTo": to,
            "partition": "aws",
            "partitionTo": "aws",
            "avg": avg,
            "min": avg,
            "max": avg,
            "port": 443,
            "address": format!("dynamodb.{to}.amazonaws.com"),
            "attempts": 5,
            "attemptsSuccess": 5,
            "results": [{"seq": 0, "time": avg}],
            "timestamp": timestamp
        }) else {
            unreachable!()
        };
        item
    }

    async fn store(samples: Vec<cloudping_store::Item>) -> MemoryStore {
        let store = MemoryStore::new().with_page_size(2);
        store
            .create_table(RAW, KeySchema::composite("regionTo", "timestamp"))
            .await;
        store.batch_put(RAW, samples).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_groups_by_destination_within_window() {
        let store = store(vec![
            sample("us-east-1", "eu-west-1", 10.0, "2024-05-17T00:00:00.000Z"),
            sample("us-east-1", "eu-west-1", 20.0, "2024-05-16T18:00:00.000Z"),
            sample("us-east-1", "eu-west-1", 30.0, "2024-05-16T12:00:00.000Z"),
            sample("us-east-1", "eu-west-1", 900.0, "2024-05-10T00:00:00.000Z"),
            sample("us-east-1", "ap-south-1", 200.0, "2024-05-17T00:00:00.000Z"),
            sample("eu-west-1", "us-east-1", 75.0, "2024-05-17T00:00:00.000Z"),
        ])
        .await;
        let aggregator = Aggregator::new(store, clock(), RAW);

        let response = aggregator
            .aggregate(&AggregateRequest::scheduled("us-east-1", Timeframe::OneDay))
            .await
            .unwrap();

        let destinations = &response["us-east-1"];
        assert_eq!(response.len(), 1);
        assert_eq!(
            destinations.iter().map(|d| d.region_to.as_str()).collect::<Vec<_>>(),
            ["ap-south-1", "eu-west-1"]
        );
        assert!((destinations[1].avg_latency - 20.0).abs() < 1e-9);
        assert!((destinations[1].p_50 - 20.0).abs() < 1e-9);
        assert!((destinations[1].p_25 - 15.0).abs() < 1e-9);
        assert!((destinations[0].p_99 - 200.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rows_without_partition_attributes_are_aggregated() {
        let mut legacy = sample("us-east-1", "eu-west-1", 30.0, "2024-05-16T18:00:00.000Z");
        legacy.remove("partition");
        legacy.remove("partitionTo");
        legacy.remove("results");
        let store = store(vec![
            sample("us-east-1", "eu-west-1", 10.0, "2024-05-17T00:00:00.000Z"),
            legacy,
        ])
        .await;
        let aggregator = Aggregator::new(store, clock(), RAW);

        let response = aggregator
            .aggregate(&AggregateRequest::scheduled("us-east-1", Timeframe::OneDay))
            .await
            .unwrap();

        assert!((response["us-east-1"][0].avg_latency - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_wider_timeframe_includes_older_samples() {
        let store = store(vec![
            sample("us-east-1", "eu-west-1", 10.0, "2024-05-17T00:00:00.000Z"),
            sample("us-east-1", "eu-west-1", 40.0, "2024-05-12T00:00:00.000Z"),
        ])
        .await;
        let aggregator = Aggregator::new(store, clock(), RAW);

        let response = aggregator
            .aggregate(&AggregateRequest::scheduled("us-east-1", Timeframe::OneWeek))
            .await
            .unwrap();

        assert!((response["us-east-1"][0].avg_latency - 25.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_no_samples_no_destinations() {
        let aggregator = Aggregator::new(store(Vec::new()).await, clock(), RAW);

        let response = aggregator
            .aggregate(&AggregateRequest::scheduled("us-east-1", Timeframe::OneDay))
            .await
            .unwrap();

        assert!(response["us-east-1"].is_empty());
    }

    #[tokio::test]
    async fn test_custom_range() {
        let store = store(vec![
            sample("us-east-1", "eu-west-1", 10.0, "2024-02-10T00:00:00.000Z"),
            sample("us-east-1", "eu-west-1", 99.0, "2024-03-10T00:00:00.000Z"),
        ])
        .await;
        let aggregator = Aggregator::new(store, clock(), RAW);
        let request = AggregateRequest {
            latency_range: Some(Timeframe::Range),
            custom_range: Some(CustomRange {
                range_start_timestamp: "2024-02-01T00:00:00.000Z".into(),
                range_end_timestamp: "2024-02-29T23:59:59.999Z".into(),
            }),
            ..AggregateRequest::scheduled("us-east-1", Timeframe::Range)
        };

        let response = aggregator.aggregate(&request).await.unwrap();

        assert!((response["us-east-1"][0].p_50 - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_input_is_reported_by_name() {
        let aggregator = Aggregator::new(store(Vec::new()).await, clock(), RAW);
        let complete = AggregateRequest::scheduled("us-east-1", Timeframe::OneDay);

        let missing = |request: AggregateRequest| {
            let aggregator = aggregator.clone();
            async move { aggregator.aggregate(&request).await }
        };

        assert_matches!(
            missing(AggregateRequest { region: None, ..complete.clone() }).await,
            Err(Error::MissingInput("region"))
        );
        assert_matches!(
            missing(AggregateRequest { execution_source: None, ..complete.clone() }).await,
            Err(Error::MissingInput("execution_source"))
        );
        assert_matches!(
            missing(AggregateRequest { latency_range: None, ..complete.clone() }).await,
            Err(Error::MissingInput("latency_range"))
        );
        assert_matches!(
            missing(AggregateRequest { latency_range: Some(Timeframe::Range), ..complete }).await,
            Err(Error::MissingInput("custom_range"))
        );
    }

    #[test]
    fn test_response_accepts_string_statistics() {
        let response: AggregateResponse = serde_json::from_value(json!({
            "us-east-1": [{
                "region_to": "eu-west-1",
                "avg_latency": "50.5",
                "p_10": "49.3",
                "p_25": "50",
                "p_50": 50.5,
                "p_75": "51.0",
                "p_90": "51.6",
                "p_98": "51.92",
                "p_99": 52
            }]
        }))
        .unwrap();

        let stats = &response["us-east-1"][0];
        assert!((stats.avg_latency - 50.5).abs() < 1e-9);
        assert!((stats.p_25 - 50.0).abs() < 1e-9);
        assert!((stats.p_99 - 52.0).abs() < 1e-9);

        let garbage = serde_json::from_value::<DestinationStats>(json!({
            "region_to": "eu-west-1",
            "avg_latency": "fast",
            "p_10": 1, "p_25": 1, "p_50": 1, "p_75": 1, "p_90": 1, "p_98": 1, "p_99": 1
        }));
        assert!(garbage.is_err());
    }

    #[test]
    fn test_payload_shape() {
        let request: AggregateRequest = serde_json::from_value(json!({
            "region": "us-east-1",
            "execution_source": "scheduled",
            "latency_range": "1W"
        }))
        .unwrap();
        assert_eq!(request, AggregateRequest::scheduled("us-east-1", Timeframe::OneWeek));

        let unknown = serde_json::from_value::<AggregateRequest>(json!({"latency_range": "2D"}));
        assert!(unknown.is_err());
    }
}
