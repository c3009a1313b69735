//! `cloudping` binary: runs one scheduled unit of the latency pipeline.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::result_large_err)]

use clap::{Parser, Subcommand};
use cloudping_aggregator::{AggregateRequest, Aggregator, CustomRange};
use cloudping_orchestrator::{LambdaInvoker, LocalInvoker, Orchestrator};
use cloudping_partition::{
    CROSS_PARTITION_SECRET_ID, Partition, PartitionResolver, SecretsManagerSource,
};
use cloudping_prober::{Prober, TcpDialer};
use cloudping_records::{SystemClock, Timeframe};
use cloudping_region_status::{
    AccountRegionCatalogue, LambdaDeploymentProbe, RegionCatalogue, RegionStatusTracker,
    StaticRegionCatalogue,
};
use cloudping_store_dynamodb::{DynamoStore, DynamoStoreOptions};
use cloudping_writer::BatchWriter;
use tracing::{Level, error, info};

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Aggregation failed
    #[error(transparent)]
    Aggregate(#[from] cloudping_aggregator::Error),

    /// Response could not be printed
    #[error("could not encode response: {0}")]
    Json(#[from] serde_json::Error),

    /// Orchestration failed
    #[error(transparent)]
    Orchestrate(#[from] cloudping_orchestrator::Error),

    /// Credentials could not be resolved
    #[error(transparent)]
    Partition(#[from] cloudping_partition::Error),

    /// Probing failed
    #[error(transparent)]
    Probe(#[from] cloudping_prober::Error),

    /// Status refresh failed
    #[error(transparent)]
    RegionStatus(#[from] cloudping_region_status::Error),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Region this process runs in
    #[arg(long, env = "AWS_REGION")]
    region: String,

    /// Region hosting the shared tables
    #[arg(long, default_value = "us-east-2", env = "CLOUDPING_STORE_REGION")]
    store_region: String,

    /// Raw sample table
    #[arg(long, default_value = "PingTest", env = "CLOUDPING_RAW_TABLE")]
    raw_table: String,

    /// Aggregate table
    #[arg(
        long,
        default_value = "cloudping_stored_avgs",
        env = "CLOUDPING_AGGREGATE_TABLE"
    )]
    aggregate_table: String,

    /// Region status table
    #[arg(
        long,
        default_value = "cloudping_regions_enhanced",
        env = "CLOUDPING_STATUS_TABLE"
    )]
    status_table: String,

    /// Secret holding cross-partition credentials
    #[arg(long, default_value = CROSS_PARTITION_SECRET_ID, env = "CLOUDPING_SECRET_ID")]
    secret_id: String,

    /// Lambda function to invoke for aggregation; aggregates in process when unset
    #[arg(long, env = "CLOUDPING_AGGREGATOR_FUNCTION")]
    aggregator_function: Option<String>,

    /// Maximum log level
    #[arg(long, default_value_t = Level::INFO, env = "CLOUDPING_LOG_LEVEL")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Measure latency from this region to every enabled region
    Probe,

    /// Aggregate one source region and print the result as JSON
    Aggregate {
        /// Source region to aggregate
        #[arg(long)]
        source_region: String,

        /// Window: 1D, 1W, 1M, 1Y, MTD, YTD or RANGE
        #[arg(long)]
        timeframe: Timeframe,

        /// Start of a RANGE window
        #[arg(long, requires = "range_end")]
        range_start: Option<String>,

        /// End of a RANGE window
        #[arg(long, requires = "range_start")]
        range_end: Option<String>,
    },

    /// Recompute stored aggregates for every eligible region
    Orchestrate,

    /// Refresh the status record of every region in this partition
    RefreshStatus,
}

/// Connects to the shared tables, with cross-partition credentials when this
/// process runs outside the tables' partition.
async fn connect_store(args: &Args) -> Result<DynamoStore, Error> {
    let secrets = SecretsManagerSource::new(args.region.clone()).await;
    let resolver = PartitionResolver::new(&args.region, secrets).with_secret_id(&args.secret_id);
    let partition = Partition::from_region(&args.store_region);
    let credentials = resolver.write_credentials_for(partition).await?;

    info!(
        from = %resolver.current_partition(),
        store_region = %args.store_region,
        "connecting to shared tables"
    );

    Ok(DynamoStore::connect(DynamoStoreOptions {
        region: args.store_region.clone(),
        partition,
        credentials,
    })
    .await)
}

async fn refresh<R>(args: &Args, store: DynamoStore, catalogue: R) -> Result<(), Error>
where
    R: RegionCatalogue,
{
    let deployment = LambdaDeploymentProbe::for_partition(catalogue.partition());
    let tracker = RegionStatusTracker::new(
        BatchWriter::new(store),
        catalogue,
        deployment,
        &args.raw_table,
        &args.status_table,
    );

    let report = tracker.refresh().await?;
    info!(
        regions = report.regions,
        written = report.written,
        lookup_failures = report.lookup_failures,
        "region status refreshed"
    );

    Ok(())
}

async fn run(args: Args) -> Result<(), Error> {
    let store = connect_store(&args).await?;

    match args.command.clone() {
        Command::Probe => {
            let prober = Prober::new(&args.region, TcpDialer, SystemClock);
            let report = prober
                .run(&BatchWriter::new(store), &args.status_table, &args.raw_table)
                .await?;
            info!(
                destinations = report.destinations,
                reachable = report.reachable,
                written = report.written,
                "probe complete"
            );
        }
        Command::Aggregate {
            source_region,
            timeframe,
            range_start,
            range_end,
        } => {
            let custom_range = range_start.zip(range_end).map(|(start, end)| CustomRange {
                range_start_timestamp: start,
                range_end_timestamp: end,
            });
            let request = AggregateRequest {
                region: Some(source_region),
                execution_source: Some("cli".to_string()),
                latency_range: Some(timeframe),
                custom_range,
            };

            let response = Aggregator::new(store, SystemClock, &args.raw_table)
                .aggregate(&request)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Orchestrate => {
            let writer = BatchWriter::new(store.clone());
            let report = if let Some(function) = args.aggregator_function.clone() {
                let invoker = LambdaInvoker::new(args.region.clone(), function).await;
                Orchestrator::new(writer, invoker, &args.status_table, &args.aggregate_table)
                    .run(&Timeframe::SCHEDULED)
                    .await?
            } else {
                let invoker =
                    LocalInvoker::new(Aggregator::new(store, SystemClock, &args.raw_table));
                Orchestrator::new(writer, invoker, &args.status_table, &args.aggregate_table)
                    .run(&Timeframe::SCHEDULED)
                    .await?
            };
            info!(
                regions = report.regions,
                eligible = report.eligible,
                written = report.written,
                "orchestration complete"
            );
        }
        Command::RefreshStatus => match Partition::from_region(&args.region) {
            Partition::Aws => {
                let catalogue = AccountRegionCatalogue::new(args.region.clone()).await;
                refresh(&args, store, catalogue).await?;
            }
            Partition::AwsEusc => refresh(&args, store, StaticRegionCatalogue::sovereign()).await?,
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    tracing_subscriber::fmt().with_max_level(args.log_level).init();

    if let Err(e) = run(args).await {
        error!("{}", e);
        return Err(e);
    }

    Ok(())
}
