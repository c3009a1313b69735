use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use cloudping_records::{Timeframe, format_timestamp};
use cloudping_store::SortCondition;

use crate::{CustomRange, Error, Result};

/// Sort key condition selecting the samples in `timeframe` as seen at `now`.
///
/// # Errors
///
/// Returns [`Error::MissingInput`] for [`Timeframe::Range`] without `custom`.
pub fn window(
    timeframe: Timeframe,
    now: DateTime<Utc>,
    custom: Option<&CustomRange>,
) -> Result<SortCondition> {
    let since = |start: DateTime<Utc>| Ok(SortCondition::AtLeast(format_timestamp(start)));

    match timeframe {
        Timeframe::OneDay => since(now - Duration::days(1)),
        Timeframe::OneWeek => since(now - Duration::days(7)),
        Timeframe::OneMonth => since(now - Duration::days(30)),
        Timeframe::OneYear => since(now - Duration::days(365)),
        Timeframe::MonthToDate => since(midnight(now.year(), now.month())),
        Timeframe::YearToDate => since(midnight(now.year(), 1)),
        Timeframe::Range => {
            let range = custom.ok_or(Error::MissingInput("custom_range"))?;
            Ok(SortCondition::Between(
                range.range_start_timestamp.clone(),
                range.range_end_timestamp.clone(),
            ))
        }
    }
}

fn midnight(year: i32, month: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
        .and_utc()
}
