//! Sensor reading data model.
//!
//! One row of `enviro_log`. The RGB and accelerometer channels are stored as
//! comma-delimited text; components that are absent or not numeric decode to
//! `None` instead of rejecting the row.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped snapshot of every Enviro pHAT channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    /// Lux.
    pub light: f64,
    pub rgb: Rgb,
    pub accelerometer: Acceleration,
    /// Raw sensor temperature in °C, before self-heating correction.
    pub ambient_temp: f64,
    /// Raw pressure as reported by the board (hPa * 100).
    pub pressure: f64,
    pub cpu_temp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub red: Option<i64>,
    pub green: Option<i64>,
    pub blue: Option<i64>,
}

impl Rgb {
    pub fn new(red: i64, green: i64, blue: i64) -> Self {
        Self {
            red: Some(red),
            green: Some(green),
            blue: Some(blue),
        }
    }

    pub fn parse(text: &str) -> Self {
        let [red, green, blue] = parse_components::<i64>(text);
        Self { red, green, blue }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_components(f, &[self.red, self.green, self.blue])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl Acceleration {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    pub fn parse(text: &str) -> Self {
        let [x, y, z] = parse_components::<f64>(text).map(|v| v.filter(|v| v.is_finite()));
        Self { x, y, z }
    }
}

impl fmt::Display for Acceleration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_components(f, &[self.x, self.y, self.z])
    }
}

/// Splits `"a,b,c"` into three optional numbers. Missing trailing parts and
/// unparsable parts become `None`; anything past the third part is ignored.
fn parse_components<T: FromStr>(text: &str) -> [Option<T>; 3] {
    let mut parts = text.split(',').map(|part| part.trim().parse::<T>().ok());
    [
        parts.next().flatten(),
        parts.next().flatten(),
        parts.next().flatten(),
    ]
}

fn write_components<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[Option<T>]) -> fmt::Result {
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            f.write_str(",")?;
        }
        if let Some(value) = value {
            write!(f, "{value}")?;
        }
    }
    Ok(())
}
