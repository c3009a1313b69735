use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use cloudping_aggregator::{AggregateRequest, Aggregator};
use cloudping_orchestrator::{LocalInvoker, Orchestrator};
use cloudping_partition::Partition;
use cloudping_prober::{DialError, Dialer, Prober};
use cloudping_records::{FixedClock, OptStatus, ProbeResult, RegionStatus, Timeframe, from_item};
use cloudping_region_status::{DeploymentProbe, RegionStatusTracker, StaticRegionCatalogue};
use cloudping_store::{Item, TableStore};
use cloudping_store_memory::{KeySchema, MemoryStore};
use cloudping_writer::BatchWriter;
use serde_json::{Value, json};

const RAW: &str = "PingTest";
const AVGS: &str = "cloudping_stored_avgs";
const STATUS: &str = "cloudping_regions_enhanced";

/// Connect time in milliseconds, or `None` for a timeout.
#[derive(Clone, Default)]
struct ScriptedDialer {
    script: Arc<Mutex<VecDeque<Option<f64>>>>,
    dialed: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDialer {
    fn new(script: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Dialer for ScriptedDialer {
    async fn dial(&self, host: &str, _port: u16, _limit: Duration) -> Result<Duration, DialError> {
        self.dialed.lock().unwrap().push(host.to_string());

        match self.script.lock().unwrap().pop_front().flatten() {
            Some(ms) => Ok(Duration::from_secs_f64(ms / 1000.0)),
            None => Err(DialError::Timeout),
        }
    }
}

#[derive(Clone)]
struct Deployed;

#[async_trait]
impl DeploymentProbe for Deployed {
    async fn is_deployed(&self, _region: &str) -> bool {
        true
    }
}

fn object(value: Value) -> Item {
    let Value::Object(item) = value else {
        unreachable!()
    };
    item
}

async fn shared_store() -> MemoryStore {
    let store = MemoryStore::new().with_page_size(3);
    store
        .create_table(RAW, KeySchema::composite("regionTo", "timestamp"))
        .await;
    store.create_table(AVGS, KeySchema::hash("index")).await;
    store.create_table(STATUS, KeySchema::hash("region_name")).await;

    let regions = [
        ("us-east-1", "ENABLED_BY_DEFAULT", Some("aws")),
        ("eu-west-1", "ENABLED", None),
        ("eusc-de-east-1", "ENABLED", Some("aws-eusc")),
        ("ap-east-1", "DISABLED", Some("aws")),
    ]
    .into_iter()
    .map(|(region, status, partition)| {
        let mut item = object(json!({
            "region_name": region,
            "status": status,
            "is_opt_in": status != "ENABLED_BY_DEFAULT",
            "ping_function_exists": false
        }));
        if let Some(partition) = partition {
            item.insert("partition".into(), partition.into());
        }
        item
    })
    .collect();
    store.batch_put(STATUS, regions).await.unwrap();

    store
}

#[tokio::test(start_paused = true)]
async fn test_probe_refresh_and_aggregate() {
    let store = shared_store().await;
    let writer = BatchWriter::new(store.clone());

    // Destinations in name order: eu-west-1, eusc-de-east-1, us-east-1.
    let script = [Some(50.0), Some(52.0), None, Some(49.0), Some(51.0)]
        .into_iter()
        .chain([None; 5])
        .chain([Some(1.0); 5]);
    let dialer = ScriptedDialer::new(script);
    let probed_at = FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap());
    let prober = Prober::new("us-east-1", dialer.clone(), probed_at);

    let report = prober.run(&writer, STATUS, RAW).await.unwrap();
    assert_eq!(report.destinations, 3);
    assert_eq!(report.reachable, 2);

    let dialed = dialer.dialed.lock().unwrap().clone();
    assert_eq!(dialed.len(), 15);
    assert_eq!(dialed[5], "dynamodb.eusc-de-east-1.amazonaws.eu");

    let samples = store
        .items(RAW)
        .await
        .unwrap()
        .into_iter()
        .map(|item| from_item::<ProbeResult>(item).unwrap())
        .collect::<Vec<_>>();
    let to_ireland = samples.iter().find(|s| s.destination == "eu-west-1").unwrap();
    assert_eq!(to_ireland.attempts, 5);
    assert_eq!(to_ireland.attempts_success, 4);
    assert!((to_ireland.avg - 50.5).abs() < 1e-9);
    assert!((to_ireland.min - 49.0).abs() < 1e-9);
    assert!((to_ireland.max - 52.0).abs() < 1e-9);
    assert_eq!(to_ireland.timestamp, "2024-05-01T06:00:00.000Z");

    let tracker = RegionStatusTracker::new(
        writer.clone(),
        StaticRegionCatalogue::new(Partition::Aws, ["us-east-1", "eu-west-1"], OptStatus::Enabled),
        Deployed,
        RAW,
        STATUS,
    );
    tracker.refresh().await.unwrap();

    let statuses = store
        .items(STATUS)
        .await
        .unwrap()
        .into_iter()
        .map(|item| from_item::<RegionStatus>(item).unwrap())
        .collect::<Vec<_>>();
    let eligible = statuses
        .iter()
        .filter(|s| s.is_eligible())
        .map(|s| s.region_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(eligible, ["us-east-1"]);

    let aggregated_at = FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 6, 10, 0).unwrap());
    let invoker = LocalInvoker::new(Aggregator::new(store.clone(), aggregated_at, RAW));
    let orchestrator = Orchestrator::new(writer, invoker, STATUS, AVGS);

    let report = orchestrator.run(&Timeframe::SCHEDULED).await.unwrap();
    assert_eq!(report.eligible, 1);
    assert_eq!(report.invocations, 4);
    assert_eq!(report.written, 8);

    let aggregates = store.items(AVGS).await.unwrap();
    let one_day = aggregates
        .iter()
        .find(|item| item["index"] == "us-east-1_eu-west-1_1D")
        .unwrap();
    assert_eq!(one_day["region_from"], "us-east-1");
    assert_eq!(one_day["region_to"], "eu-west-1");
    assert!((one_day["p_50"].as_f64().unwrap() - 50.5).abs() < 1e-9);
    assert!((one_day["latency"].as_f64().unwrap() - 50.5).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_probes_accumulate_into_percentiles() {
    let store = shared_store().await;
    let writer = BatchWriter::new(store.clone());

    // Five runs, six hours apart; only eu-west-1 answers.
    for (run, ms) in [10.0, 20.0, 30.0, 40.0, 50.0].into_iter().enumerate() {
        let script = [Some(ms); 5].into_iter().chain([None; 10]);
        let hour = u32::try_from(run * 6 % 24).unwrap();
        let day = 1 + u32::try_from(run * 6 / 24).unwrap();
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap());

        Prober::new("us-east-1", ScriptedDialer::new(script), clock)
            .run(&writer, STATUS, RAW)
            .await
            .unwrap();
    }

    let aggregator = Aggregator::new(
        store,
        FixedClock(Utc.with_ymd_and_hms(2024, 5, 2, 6, 10, 0).unwrap()),
        RAW,
    );
    let response = aggregator
        .aggregate(&AggregateRequest::scheduled("us-east-1", Timeframe::OneWeek))
        .await
        .unwrap();

    let stats = &response["us-east-1"];
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].region_to, "eu-west-1");
    assert!((stats[0].p_25 - 20.0).abs() < 1e-9);
    assert!((stats[0].p_50 - 30.0).abs() < 1e-9);
    assert!((stats[0].p_75 - 40.0).abs() < 1e-9);
}
