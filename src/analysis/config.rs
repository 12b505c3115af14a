use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Reading;

use super::error::ConfigError;

/// Tunables for the dashboard analytics. Every constant the pipeline uses
/// lives here so it can be overridden from the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub anomaly: AnomalyConfig,
    pub lighting: LightingThresholds,
    pub calibration: CalibrationConfig,
    pub windows: WindowConfig,

    /// Seconds between consecutive stored readings, used to turn sample
    /// counts into durations.
    pub sample_interval_secs: f64,

    /// Offset that defines calendar days for the daily aggregation.
    pub utc_offset_secs: i32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            anomaly: AnomalyConfig::default(),
            lighting: LightingThresholds::default(),
            calibration: CalibrationConfig::default(),
            windows: WindowConfig::default(),
            sample_interval_secs: 6.7,
            utc_offset_secs: 0,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.anomaly.validate()?;
        self.lighting.validate()?;
        self.calibration.validate()?;
        self.windows.validate()?;
        positive("sampleIntervalSecs", self.sample_interval_secs)?;
        if FixedOffset::east_opt(self.utc_offset_secs).is_none() {
            return Err(ConfigError::InvalidUtcOffset(self.utc_offset_secs));
        }
        Ok(())
    }

    /// The day boundary offset; UTC when the configured value is out of range.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| Utc.fix())
    }
}

/// Rolling-baseline anomaly detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnomalyConfig {
    /// Trailing window size, in readings.
    pub lag: usize,
    /// Standard deviations from the moving average before a reading is flagged.
    pub threshold: f64,
    pub signal: Signal,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            lag: 50,
            threshold: 3.5,
            signal: Signal::CpuTemp,
        }
    }
}

impl AnomalyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lag == 0 {
            return Err(ConfigError::ZeroLag);
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

/// Lux breakpoints and the red/blue ratio that separates LED light from
/// daylight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LightingThresholds {
    /// At or below: no light.
    pub dark_lux: f64,
    /// Upper bound of low natural light.
    pub dim_lux: f64,
    /// Upper bound of the LED band; anything brighter is high natural light.
    pub bright_lux: f64,
    pub red_blue_ratio: f64,
}

impl Default for LightingThresholds {
    fn default() -> Self {
        Self {
            dark_lux: 0.0,
            dim_lux: 100.0,
            bright_lux: 130.0,
            red_blue_ratio: 1.7,
        }
    }
}

impl LightingThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.dark_lux >= 0.0
            && self.dark_lux <= self.dim_lux
            && self.dim_lux < self.bright_lux
            && self.bright_lux.is_finite();
        if !ordered {
            return Err(ConfigError::UnorderedBreakpoints {
                dark: self.dark_lux,
                dim: self.dim_lux,
                bright: self.bright_lux,
            });
        }
        positive("redBlueRatio", self.red_blue_ratio)
    }
}

/// Fixed corrections applied to the raw board values before display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalibrationConfig {
    /// Subtracted from ambient temperature to cancel heat from the Pi's CPU.
    pub temp_offset: f64,
    /// Raw pressure is divided by this to get hPa.
    pub pressure_divisor: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            temp_offset: 6.0,
            pressure_divisor: 100.0,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.temp_offset.is_finite() {
            return Err(ConfigError::NonPositive {
                name: "tempOffset",
                value: self.temp_offset,
            });
        }
        positive("pressureDivisor", self.pressure_divisor)
    }
}

/// How much history each dashboard panel fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowConfig {
    /// Rows behind the live sensor charts.
    pub sensor_window: usize,
    /// Rows behind the anomaly chart.
    pub anomaly_window: usize,
    /// Complete days behind the lighting analytics.
    pub history_days: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            sensor_window: 150,
            anomaly_window: 300,
            history_days: 4,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor_window == 0 {
            return Err(ConfigError::EmptyWindow { name: "sensorWindow" });
        }
        if self.anomaly_window == 0 {
            return Err(ConfigError::EmptyWindow { name: "anomalyWindow" });
        }
        if self.history_days == 0 {
            return Err(ConfigError::EmptyWindow { name: "historyDays" });
        }
        Ok(())
    }
}

/// A numeric channel of a [`Reading`] that can be run through the anomaly
/// detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Signal {
    Light,
    AmbientTemp,
    Pressure,
    CpuTemp,
    Red,
    Green,
    Blue,
    AccelX,
    AccelY,
    AccelZ,
}

impl Signal {
    /// Raw channel value; `NaN` when the component failed to parse.
    pub fn extract(&self, reading: &Reading) -> f64 {
        let int = |value: Option<i64>| value.map_or(f64::NAN, |v| v as f64);
        let float = |value: Option<f64>| value.unwrap_or(f64::NAN);

        match self {
            Signal::Light => reading.light,
            Signal::AmbientTemp => reading.ambient_temp,
            Signal::Pressure => reading.pressure,
            Signal::CpuTemp => reading.cpu_temp,
            Signal::Red => int(reading.rgb.red),
            Signal::Green => int(reading.rgb.green),
            Signal::Blue => int(reading.rgb.blue),
            Signal::AccelX => float(reading.accelerometer.x),
            Signal::AccelY => float(reading.accelerometer.y),
            Signal::AccelZ => float(reading.accelerometer.z),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Light => "light",
            Signal::AmbientTemp => "temp",
            Signal::Pressure => "pressure",
            Signal::CpuTemp => "cputemp",
            Signal::Red => "red",
            Signal::Green => "green",
            Signal::Blue => "blue",
            Signal::AccelX => "accel_x",
            Signal::AccelY => "accel_y",
            Signal::AccelZ => "accel_z",
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}
