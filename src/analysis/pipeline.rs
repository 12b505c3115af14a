use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use serde::Serialize;

use super::anomaly::{detect_anomalies, AnomalySeries};
use super::config::AnalysisConfig;
use super::daily::{aggregate_daily, history_range, DailyBucket};
use super::error::StoreError;
use super::lighting::label_readings;
use super::snapshot::{sensor_series, Snapshot};
use super::source::ReadingSource;

/// One dashboard section. `NoData` means the fetch window was empty, which a
/// renderer should treat differently from a computed result with nothing in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "camelCase")]
pub enum Panel<T> {
    NoData,
    Ready(T),
}

impl<T> Panel<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Panel::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(value) => Some(value),
            Panel::NoData => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LightingSummary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub buckets: Vec<DailyBucket>,
}

/// Everything a renderer needs for one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub today: NaiveDate,
    pub current: Panel<Snapshot>,
    pub sensors: Panel<Vec<Snapshot>>,
    pub anomalies: Panel<AnomalySeries>,
    pub lighting: Panel<LightingSummary>,
}

/// Fetch every panel's window from `source` and recompute the dashboard from
/// scratch. `today` fixes the lighting history window, so the result depends
/// only on the arguments and the store contents.
///
/// Any store failure aborts the whole build; no partial dashboard is returned.
pub async fn build_dashboard<S: ReadingSource>(
    source: &S,
    config: &AnalysisConfig,
    today: NaiveDate,
) -> Result<Dashboard, StoreError> {
    let current = source.latest(1).await?;
    let sensor_rows = source.latest(config.windows.sensor_window).await?;
    let anomaly_rows = source.latest(config.windows.anomaly_window).await?;

    let offset = config.utc_offset();
    let (start, end) = history_range(today, config.windows.history_days, &offset);
    let history_rows = source.between(start, end).await?;

    debug!(
        "dashboard windows: sensors={}, anomaly={} ({}), history={} ({start} .. {end})",
        sensor_rows.len(),
        anomaly_rows.len(),
        config.anomaly.signal.as_str(),
        history_rows.len()
    );

    let current = match current.first() {
        Some(reading) => Panel::Ready(Snapshot::from_reading(reading, &config.calibration)),
        None => Panel::NoData,
    };

    let sensors = if sensor_rows.is_empty() {
        Panel::NoData
    } else {
        Panel::Ready(sensor_series(&sensor_rows, &config.calibration))
    };

    let anomalies = if anomaly_rows.is_empty() {
        Panel::NoData
    } else {
        Panel::Ready(detect_anomalies(&anomaly_rows, &config.anomaly))
    };

    let lighting = if history_rows.is_empty() {
        Panel::NoData
    } else {
        let labeled = label_readings(&history_rows, &config.lighting);
        let buckets = aggregate_daily(
            labeled.iter().map(|l| (l.timestamp, l.condition)),
            config.sample_interval_secs,
            &offset,
        );
        Panel::Ready(LightingSummary {
            start,
            end,
            buckets,
        })
    };

    Ok(Dashboard {
        today,
        current,
        sensors,
        anomalies,
        lighting,
    })
}
