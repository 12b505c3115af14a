use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{Acceleration, Reading, Rgb};

use super::config::CalibrationConfig;

/// A reading with the board's fixed corrections applied: ambient temperature
/// minus the self-heating offset, pressure in hPa.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub ambient_temp: f64,
    pub cpu_temp: f64,
    pub light: f64,
    pub pressure: f64,
    pub rgb: Rgb,
    pub accelerometer: Acceleration,
}

impl Snapshot {
    pub fn from_reading(reading: &Reading, calibration: &CalibrationConfig) -> Self {
        Self {
            timestamp: reading.timestamp,
            ambient_temp: reading.ambient_temp - calibration.temp_offset,
            cpu_temp: reading.cpu_temp,
            light: reading.light,
            pressure: reading.pressure / calibration.pressure_divisor,
            rgb: reading.rgb,
            accelerometer: reading.accelerometer,
        }
    }

    /// Card texts for the summary row.
    pub fn labels(&self) -> SnapshotLabels {
        SnapshotLabels {
            ambient_temperature: format!("{} ° C", round_2(self.ambient_temp)),
            cpu_temperature: format!("{} ° C", round_2(self.cpu_temp)),
            light: format!("{} Lux", round_2(self.light)),
            pressure: format!("{} hPa", round_2(self.pressure)),
            rgb: self.rgb.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotLabels {
    pub ambient_temperature: String,
    pub cpu_temperature: String,
    pub light: String,
    pub pressure: String,
    pub rgb: String,
}

/// Calibrated copy of a reading window in ascending timestamp order, for the
/// live sensor charts.
pub fn sensor_series(readings: &[Reading], calibration: &CalibrationConfig) -> Vec<Snapshot> {
    let mut series: Vec<Snapshot> = readings
        .iter()
        .map(|reading| Snapshot::from_reading(reading, calibration))
        .collect();
    series.sort_by_key(|s| s.timestamp);
    series
}

/// Two decimals at most, one at least: `17.25`, `48.5`, `20.0`.
fn round_2(value: f64) -> String {
    let fixed = format!("{value:.2}");
    if !value.is_finite() {
        return fixed;
    }
    let trimmed = fixed.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}
