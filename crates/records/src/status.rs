use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use cloudping_partition::Partition;
use serde::{Deserialize, Deserializer, Serialize};

use crate::Error;

/// Enablement state of a region for the account.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptStatus {
    /// Opted in and usable.
    Enabled,

    /// Opt-in in progress.
    Enabling,

    /// Opt-out in progress.
    Disabling,

    /// Not enabled.
    Disabled,

    /// Usable without opting in.
    EnabledByDefault,
}

impl OptStatus {
    const ALL: [Self; 5] = [
        Self::Enabled,
        Self::Enabling,
        Self::Disabling,
        Self::Disabled,
        Self::EnabledByDefault,
    ];

    /// Wire name, e.g. `ENABLED_BY_DEFAULT`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "ENABLED",
            Self::Enabling => "ENABLING",
            Self::Disabling => "DISABLING",
            Self::Disabled => "DISABLED",
            Self::EnabledByDefault => "ENABLED_BY_DEFAULT",
        }
    }

    /// Whether the region can be used right now.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled | Self::EnabledByDefault)
    }

    /// Whether the region had to be explicitly enabled.
    #[must_use]
    pub const fn is_opt_in(self) -> bool {
        !matches!(self, Self::EnabledByDefault)
    }
}

impl Display for OptStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::UnknownOptStatus(s.to_string()))
    }
}

/// Deployment and data-freshness state of one region.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RegionStatus {
    /// Region id.
    pub region_name: String,

    /// Partition the region belongs to.
    #[serde(default)]
    pub partition: Partition,

    /// Enablement state.
    pub status: OptStatus,

    /// Whether the region is opt-in.
    pub is_opt_in: bool,

    /// Whether the prober is deployed in the region.
    pub ping_function_exists: bool,

    /// Oldest raw sample from the region.
    #[serde(
        default,
        deserialize_with = "optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub earliest_data_timestamp: Option<String>,

    /// Newest raw sample from the region.
    #[serde(
        default,
        deserialize_with = "optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub most_recent_data_timestamp: Option<String>,
}

impl RegionStatus {
    /// Whether aggregates should be computed for this region.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        self.status.is_enabled()
            && self.ping_function_exists
            && self.earliest_data_timestamp.is_some()
    }
}

// Older status rows spelled an absent timestamp as the string "None".
fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty() && s != "None"))
}
