//! Records persisted by the latency pipeline and the conversions between them
//! and store items.
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod aggregate;
mod clock;
mod error;
mod probe;
mod status;
mod timeframe;

pub use aggregate::{AggregateRecord, LatencyStats};
pub use clock::{Clock, FixedClock, SystemClock, format_timestamp};
pub use error::{Error, Result};
pub use probe::{ProbeResult, RAW_SAMPLE_INDEX, Sample};
pub use status::{OptStatus, RegionStatus};
pub use timeframe::Timeframe;

use cloudping_store::Item;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Converts a record into a store item.
pub fn to_item<T: Serialize>(record: &T) -> Result<Item> {
    match serde_json::to_value(record)? {
        Value::Object(item) => Ok(item),
        _ => Err(Error::NotAnObject),
    }
}

/// Reads a record back out of a store item.
pub fn from_item<T: DeserializeOwned>(item: Item) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(item))?)
}
