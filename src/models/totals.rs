use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::pickup::{CourierId, PickupStatus};

/// Aggregate field each status is counted under.
pub const fn bucket_name(status: PickupStatus) -> &'static str {
    match status {
        PickupStatus::Requested => "total_requested",
        PickupStatus::Accepted => "total_delivered",
        PickupStatus::Cancelled => "total_cancelled",
        PickupStatus::Completed => "total_completed",
        PickupStatus::Finished => "total_finished",
    }
}

pub const STATUS_BUCKETS: [(PickupStatus, &str); 5] = [
    (PickupStatus::Requested, bucket_name(PickupStatus::Requested)),
    (PickupStatus::Accepted, bucket_name(PickupStatus::Accepted)),
    (PickupStatus::Cancelled, bucket_name(PickupStatus::Cancelled)),
    (PickupStatus::Completed, bucket_name(PickupStatus::Completed)),
    (PickupStatus::Finished, bucket_name(PickupStatus::Finished)),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeFrame {
    Day,
    Week,
    Month,
    Year,
}

impl TimeFrame {
    pub const ALL: [TimeFrame; 4] = [TimeFrame::Day, TimeFrame::Week, TimeFrame::Month, TimeFrame::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::Day => "day",
            TimeFrame::Week => "week",
            TimeFrame::Month => "month",
            TimeFrame::Year => "year",
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFrame {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        TimeFrame::ALL
            .into_iter()
            .find(|frame| frame.as_str() == normalized)
            .ok_or_else(|| format!("unknown time frame '{raw}'"))
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TotalsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TotalsWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PickupTotals {
    pub courier_id: CourierId,
    pub time_frame: Option<TimeFrame>,
    pub window: TotalsWindow,
    #[serde(flatten)]
    pub buckets: BTreeMap<String, u64>,
    pub point_balance: i64,
}

impl PickupTotals {
    pub fn count_for(&self, status: PickupStatus) -> u64 {
        self.buckets.get(bucket_name(status)).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DetailedPickupTotals {
    pub day: PickupTotals,
    pub week: PickupTotals,
    pub month: PickupTotals,
    pub year: PickupTotals,
}
