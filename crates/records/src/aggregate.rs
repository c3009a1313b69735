use serde::{Deserialize, Serialize};

use crate::Timeframe;

/// Mean and percentiles of a set of latencies, in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatencyStats {
    pub mean: f64,
    pub p_10: f64,
    pub p_25: f64,
    pub p_50: f64,
    pub p_75: f64,
    pub p_90: f64,
    pub p_98: f64,
    pub p_99: f64,
}

/// Latest statistic for one (source, destination, timeframe). The `index`
/// is a deterministic function of the three, so rewrites replace in place.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AggregateRecord {
    pub index: String,
    pub region_from: String,
    pub region_to: String,
    pub timeframe: Timeframe,
    pub latency: f64,
    pub p_10: f64,
    pub p_25: f64,
    pub p_50: f64,
    pub p_75: f64,
    pub p_90: f64,
    pub p_98: f64,
    pub p_99: f64,
}

impl AggregateRecord {
    /// Builds the record keyed `{region_from}_{region_to}_{timeframe}`.
    #[must_use]
    pub fn new(
        region_from: &str,
        region_to: &str,
        timeframe: Timeframe,
        stats: &LatencyStats,
    ) -> Self {
        Self {
            index: Self::key(region_from, region_to, timeframe),
            region_from: region_from.to_string(),
            region_to: region_to.to_string(),
            timeframe,
            latency: stats.mean,
            p_10: stats.p_10,
            p_25: stats.p_25,
            p_50: stats.p_50,
            p_75: stats.p_75,
            p_90: stats.p_90,
            p_98: stats.p_98,
            p_99: stats.p_99,
        }
    }

    #[must_use]
    pub fn key(region_from: &str, region_to: &str, timeframe: Timeframe) -> String {
        format!("{region_from}_{region_to}_{timeframe}")
    }
}
