use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use super::lighting::LightingCondition;

const SECS_PER_HOUR: f64 = 3600.0;

/// Estimated time spent under one lighting condition on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBucket {
    pub day: NaiveDate,
    /// Full English weekday name, e.g. `Monday`.
    pub weekday: String,
    pub condition: LightingCondition,
    pub samples: u64,
    pub hours: f64,
}

/// Count labels per (local day, condition) and turn counts into hours.
///
/// Days come from `offset`, so one reading lands in exactly one day. Every
/// day that has at least one sample reports all four conditions; absent
/// conditions get zero hours. Rows are ordered by condition (legend order)
/// and then by day.
pub fn aggregate_daily<I>(labels: I, interval_secs: f64, offset: &FixedOffset) -> Vec<DailyBucket>
where
    I: IntoIterator<Item = (DateTime<Utc>, LightingCondition)>,
{
    let mut counts: BTreeMap<NaiveDate, [u64; 4]> = BTreeMap::new();
    for (timestamp, condition) in labels {
        let day = timestamp.with_timezone(offset).date_naive();
        counts.entry(day).or_insert([0; 4])[condition.index()] += 1;
    }

    let mut buckets = Vec::with_capacity(counts.len() * LightingCondition::ALL.len());
    for condition in LightingCondition::ALL {
        for (day, per_condition) in &counts {
            let samples = per_condition[condition.index()];
            buckets.push(DailyBucket {
                day: *day,
                weekday: day.format("%A").to_string(),
                condition,
                samples,
                hours: samples as f64 * interval_secs / SECS_PER_HOUR,
            });
        }
    }
    buckets
}

/// The `days` complete calendar days before `today`, as a UTC `[start, end)`
/// range: from local midnight `days` days ago up to local midnight today.
pub fn history_range(
    today: NaiveDate,
    days: u32,
    offset: &FixedOffset,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = today.and_time(NaiveTime::MIN);
    let end = Utc.from_utc_datetime(&(local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()))));
    let start = end - Duration::days(i64::from(days));
    (start, end)
}
