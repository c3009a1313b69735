use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A named lookback window, or an explicit custom range.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Timeframe {
    /// Last 24 hours.
    #[serde(rename = "1D")]
    OneDay,

    /// Last 7 days.
    #[serde(rename = "1W")]
    OneWeek,

    /// Last 30 days.
    #[serde(rename = "1M")]
    OneMonth,

    /// Last 365 days.
    #[serde(rename = "1Y")]
    OneYear,

    /// Since the first day of the current month.
    #[serde(rename = "MTD")]
    MonthToDate,

    /// Since the first day of the current year.
    #[serde(rename = "YTD")]
    YearToDate,

    /// Explicit start and end timestamps.
    #[serde(rename = "RANGE")]
    Range,
}

impl Timeframe {
    /// Timeframes recomputed on every scheduled aggregation run.
    pub const SCHEDULED: [Self; 4] = [Self::OneDay, Self::OneWeek, Self::OneMonth, Self::OneYear];

    const ALL: [Self; 7] = [
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
        Self::OneYear,
        Self::MonthToDate,
        Self::YearToDate,
        Self::Range,
    ];

    /// Wire label, e.g. `1D`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OneDay => "1D",
            Self::OneWeek => "1W",
            Self::OneMonth => "1M",
            Self::OneYear => "1Y",
            Self::MonthToDate => "MTD",
            Self::YearToDate => "YTD",
            Self::Range => "RANGE",
        }
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|timeframe| timeframe.label() == s)
            .ok_or_else(|| Error::UnknownTimeframe(s.to_string()))
    }
}
