//! Orchestrator: recomputes the stored aggregates of every eligible source
//! region for each scheduled timeframe.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::result_large_err)]

mod error;
mod invoker;

pub use error::{Error, Result};
pub use invoker::{AggregatorInvoker, LambdaInvoker, LocalInvoker};

use cloudping_aggregator::AggregateRequest;
use cloudping_records::{AggregateRecord, RegionStatus, Timeframe, from_item, to_item};
use cloudping_store::TableStore;
use cloudping_writer::BatchWriter;
use tracing::{error, info, warn};

/// Outcome of an orchestration run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OrchestrationReport {
    /// Region status records read.
    pub regions: usize,

    /// Regions eligible for aggregation.
    pub eligible: usize,

    /// Aggregator invocations that succeeded.
    pub invocations: usize,

    /// Aggregate records the store accepted.
    pub written: usize,
}

/// Drives the aggregator over eligible regions and stores the results.
#[derive(Clone, Debug)]
pub struct Orchestrator<S, I>
where
    S: TableStore,
    I: AggregatorInvoker,
{
    writer: BatchWriter<S>,
    invoker: I,
    status_table: String,
    aggregate_table: String,
}

impl<S, I> Orchestrator<S, I>
where
    S: TableStore,
    I: AggregatorInvoker,
{
    /// Creates an orchestrator reading regions from `status_table` and writing
    /// aggregates to `aggregate_table`.
    pub fn new(
        writer: BatchWriter<S>,
        invoker: I,
        status_table: impl Into<String>,
        aggregate_table: impl Into<String>,
    ) -> Self {
        Self {
            writer,
            invoker,
            status_table: status_table.into(),
            aggregate_table: aggregate_table.into(),
        }
    }

    /// Regions whose status makes them eligible for aggregation, in name order.
    ///
    /// # Errors
    ///
    /// Returns an error if the status table cannot be scanned.
    pub async fn eligible_regions(&self) -> Result<(usize, Vec<RegionStatus>)> {
        let items = self
            .writer
            .store()
            .scan_all(&self.status_table)
            .await
            .map_err(|e| Error::Store(Box::new(e)))?;
        let total = items.len();

        let mut eligible = items
            .into_iter()
            .filter_map(|item| match from_item::<RegionStatus>(item) {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!("skipping malformed region status: {}", e);
                    None
                }
            })
            .filter(RegionStatus::is_eligible)
            .collect::<Vec<_>>();
        eligible.sort_by(|a, b| a.region_name.cmp(&b.region_name));

        Ok((total, eligible))
    }

    /// Aggregates every eligible region over each of `timeframes`, one
    /// invocation at a time, writing each invocation's records as one batch.
    ///
    /// # Errors
    ///
    /// The first failed invocation or write aborts the run. Records written
    /// for earlier invocations stay in place.
    pub async fn run(&self, timeframes: &[Timeframe]) -> Result<OrchestrationReport> {
        let (regions, eligible) = self.eligible_regions().await?;
        info!(regions, eligible = eligible.len(), "orchestrating aggregation");

        let mut report = OrchestrationReport {
            regions,
            eligible: eligible.len(),
            ..OrchestrationReport::default()
        };

        for status in &eligible {
            let region = status.region_name.as_str();

            for &timeframe in timeframes {
                let request = AggregateRequest::scheduled(region, timeframe);
                let mut response = self.invoker.invoke(&request).await.inspect_err(|e| {
                    error!(region, timeframe = %timeframe, "aggregation failed: {}", e);
                })?;
                report.invocations += 1;

                let destinations = response.remove(region).ok_or_else(|| Error::RemoteInvocation {
                    function: "aggregator".to_string(),
                    reason: format!("response has no entry for {region}"),
                })?;

                let items = destinations
                    .iter()
                    .map(|d| {
                        let record =
                            AggregateRecord::new(region, &d.region_to, timeframe, &d.stats());
                        to_item(&record)
                    })
                    .collect::<cloudping_records::Result<Vec<_>>>()?;

                report.written += self.writer.write(&self.aggregate_table, items).await?.written();
            }
        }

        info!(
            invocations = report.invocations,
            written = report.written,
            "aggregation complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use cloudping_aggregator::{AggregateResponse, DestinationStats};
    use cloudping_partition::Partition;
    use cloudping_records::{LatencyStats, OptStatus};
    use cloudping_store_memory::{KeySchema, MemoryStore};
    use serde_json::Value;

    use super::*;

    const STATUS: &str = "cloudping_regions_enhanced";
    const AVGS: &str = "cloudping_stored_avgs";

    #[derive(Clone, Default)]
    struct RecordingInvoker {
        calls: Arc<Mutex<Vec<AggregateRequest>>>,
        fail_on: Option<(String, Timeframe)>,
    }

    #[async_trait]
    impl AggregatorInvoker for RecordingInvoker {
        async fn invoke(&self, request: &AggregateRequest) -> Result<AggregateResponse> {
            self.calls.lock().unwrap().push(request.clone());

            let region = request.region.clone().unwrap();
            let timeframe = request.latency_range.unwrap();
            if self.fail_on == Some((region.clone(), timeframe)) {
                return Err(Error::RemoteInvocation {
                    function: "aggregator".into(),
                    reason: "status code 500".into(),
                });
            }

            let latency = match timeframe {
                Timeframe::OneDay => 10.0,
                _ => 20.0,
            };
            let stats = LatencyStats {
                mean: latency,
                p_50: latency,
                ..LatencyStats::default()
            };

            Ok(BTreeMap::from([(
                region,
                vec![
                    DestinationStats::new("eu-west-1", &stats),
                    DestinationStats::new("ap-south-1", &stats),
                ],
            )]))
        }
    }

    fn status(
        region: &str,
        status: OptStatus,
        deployed: bool,
        earliest: Option<&str>,
    ) -> RegionStatus {
        RegionStatus {
            region_name: region.into(),
            partition: Partition::Aws,
            status,
            is_opt_in: status.is_opt_in(),
            ping_function_exists: deployed,
            earliest_data_timestamp: earliest.map(String::from),
            most_recent_data_timestamp: earliest.map(String::from),
        }
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_table(STATUS, KeySchema::hash("region_name")).await;
        store.create_table(AVGS, KeySchema::hash("index")).await;

        let ts = Some("2024-01-01T00:00:00.000Z");
        let rows = [
            status("us-east-1", OptStatus::EnabledByDefault, true, ts),
            status("ap-east-1", OptStatus::Enabled, true, ts),
            status("me-south-1", OptStatus::Disabled, true, ts),
            status("af-south-1", OptStatus::Enabled, false, ts),
            status("il-central-1", OptStatus::Enabled, true, None),
        ]
        .iter()
        .map(|row| to_item(row).unwrap())
        .collect();
        store.batch_put(STATUS, rows).await.unwrap();

        store
    }

    #[tokio::test]
    async fn test_aggregates_eligible_regions_for_each_timeframe() {
        let store = store().await;
        let invoker = RecordingInvoker::default();
        let orchestrator =
            Orchestrator::new(BatchWriter::new(store.clone()), invoker.clone(), STATUS, AVGS);

        let report = orchestrator.run(&Timeframe::SCHEDULED).await.unwrap();

        assert_eq!(
            report,
            OrchestrationReport {
                regions: 5,
                eligible: 2,
                invocations: 8,
                written: 16
            }
        );

        let calls = invoker.calls.lock().unwrap().clone();
        assert_eq!(calls[0], AggregateRequest::scheduled("ap-east-1", Timeframe::OneDay));
        assert_eq!(calls[7], AggregateRequest::scheduled("us-east-1", Timeframe::OneYear));

        let stored = store.items(AVGS).await.unwrap();
        assert_eq!(stored.len(), 16);
        let one_day = stored
            .iter()
            .find(|item| item["index"] == "us-east-1_eu-west-1_1D")
            .unwrap();
        assert_eq!(one_day["region_from"], "us-east-1");
        assert_eq!(one_day["timeframe"], "1D");
        assert_eq!(one_day["latency"], Value::from(10.0));
    }

    #[tokio::test]
    async fn test_rerun_overwrites_in_place() {
        let store = store().await;
        let orchestrator = Orchestrator::new(
            BatchWriter::new(store.clone()),
            RecordingInvoker::default(),
            STATUS,
            AVGS,
        );

        orchestrator.run(&Timeframe::SCHEDULED).await.unwrap();
        orchestrator.run(&Timeframe::SCHEDULED).await.unwrap();

        assert_eq!(store.items(AVGS).await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_failed_invocation_aborts_but_keeps_earlier_writes() {
        let store = store().await;
        let invoker = RecordingInvoker {
            fail_on: Some(("ap-east-1".into(), Timeframe::OneMonth)),
            ..RecordingInvoker::default()
        };
        let orchestrator =
            Orchestrator::new(BatchWriter::new(store.clone()), invoker.clone(), STATUS, AVGS);

        let result = orchestrator.run(&Timeframe::SCHEDULED).await;

        assert_matches!(result, Err(Error::RemoteInvocation { .. }));
        assert_eq!(invoker.calls.lock().unwrap().len(), 3);
        // 1D and 1W for ap-east-1 landed before the failure.
        assert_eq!(store.items(AVGS).await.unwrap().len(), 4);
    }
}
