use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Timelike, Utc};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sysinfo::Components;

use crate::db::{Acceleration, Reading, Rgb};

/// Everything the sensor board reports in one poll. CPU temperature comes
/// from the host, not the board.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSample {
    pub light: f64,
    pub rgb: Rgb,
    pub accelerometer: Acceleration,
    pub temperature: f64,
    /// Raw units as reported by the barometer (hPa * 100).
    pub pressure: f64,
}

/// A sensor board that can be polled for one sample. Polling blocks (I2C),
/// so the harvester calls it from a blocking worker.
pub trait SensorBoard: Send + 'static {
    fn sample(&mut self) -> Result<BoardSample>;
}

/// Synthetic board with a day/night light cycle and slow random drift, for
/// running the harvester on a machine without the pHAT.
pub struct SimulatedBoard {
    rng: StdRng,
    temperature: f64,
    pressure: f64,
    clock: fn() -> DateTime<Utc>,
}

impl SimulatedBoard {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            temperature: 28.0,
            pressure: 101_325.0,
            clock: Utc::now,
        }
    }

    fn daylight(&mut self, now: DateTime<Utc>) -> (f64, Rgb) {
        let hour = now.hour();
        let jitter: f64 = self.rng.gen_range(-5.0..5.0);
        match hour {
            0..=5 | 23 => (0.0, Rgb::new(0, 0, 0)),
            6..=8 => (
                (60.0 + jitter).max(1.0),
                Rgb::new(
                    self.rng.gen_range(40..60),
                    self.rng.gen_range(45..65),
                    self.rng.gen_range(50..70),
                ),
            ),
            9..=17 => (
                250.0 + jitter * 10.0,
                Rgb::new(
                    self.rng.gen_range(150..190),
                    self.rng.gen_range(170..210),
                    self.rng.gen_range(180..230),
                ),
            ),
            // Evening under LED strips: mid-band lux, warm red/blue.
            _ => (
                115.0 + jitter,
                Rgb::new(
                    self.rng.gen_range(200..240),
                    self.rng.gen_range(120..150),
                    self.rng.gen_range(90..110),
                ),
            ),
        }
    }
}

impl Default for SimulatedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBoard for SimulatedBoard {
    fn sample(&mut self) -> Result<BoardSample> {
        let (light, rgb) = self.daylight((self.clock)());

        self.temperature = (self.temperature + self.rng.gen_range(-0.05..0.05)).clamp(15.0, 40.0);
        self.pressure = (self.pressure + self.rng.gen_range(-5.0..5.0)).clamp(95_000.0, 105_000.0);

        let accelerometer = Acceleration::new(
            self.rng.gen_range(-0.02..0.02),
            self.rng.gen_range(-0.02..0.02),
            1.0 + self.rng.gen_range(-0.02..0.02),
        );

        Ok(BoardSample {
            light,
            rgb,
            accelerometer,
            temperature: self.temperature,
            pressure: self.pressure,
        })
    }
}

/// Reads the SoC temperature, preferring the kernel thermal zone and falling
/// back to whatever sensors `sysinfo` can find.
pub struct CpuThermometer {
    zone_path: PathBuf,
    components: Option<Components>,
}

impl CpuThermometer {
    pub fn new(zone_path: PathBuf) -> Self {
        Self {
            zone_path,
            components: None,
        }
    }

    pub fn read(&mut self) -> Result<f64> {
        match read_thermal_zone(&self.zone_path) {
            Ok(celsius) => Ok(celsius),
            Err(err) => {
                debug!("thermal zone unavailable ({err:#}); trying sysinfo components");
                self.read_components()
            }
        }
    }

    fn read_components(&mut self) -> Result<f64> {
        let components = self
            .components
            .get_or_insert_with(Components::new_with_refreshed_list);
        components.refresh();

        let hottest = components
            .iter()
            .map(|component| f64::from(component.temperature()))
            .filter(|celsius| celsius.is_finite() && *celsius > 0.0)
            .fold(None, |max: Option<f64>, celsius| {
                Some(max.map_or(celsius, |m| m.max(celsius)))
            });

        hottest.ok_or_else(|| anyhow!("no CPU temperature source available"))
    }
}

/// Thermal zone files hold millidegrees Celsius.
fn read_thermal_zone(path: &Path) -> Result<f64> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let millidegrees: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("unexpected thermal zone contents '{}'", raw.trim()))?;
    if !millidegrees.is_finite() {
        bail!("thermal zone reported {millidegrees}");
    }
    Ok(millidegrees / 1000.0)
}

/// A board plus the host thermometer: one call yields a complete reading.
pub struct Probe<B: SensorBoard> {
    board: B,
    thermometer: CpuThermometer,
}

impl<B: SensorBoard> Probe<B> {
    pub fn new(board: B, thermometer: CpuThermometer) -> Self {
        Self { board, thermometer }
    }

    pub fn read(&mut self, timestamp: DateTime<Utc>) -> Result<Reading> {
        let sample = self.board.sample().context("sensor board poll failed")?;
        let cpu_temp = self.thermometer.read().context("CPU temperature read failed")?;

        // The store has no representation for NaN in these columns.
        for (name, value) in [
            ("light", sample.light),
            ("temperature", sample.temperature),
            ("pressure", sample.pressure),
            ("cpu temperature", cpu_temp),
        ] {
            if !value.is_finite() {
                bail!("board reported non-finite {name} ({value})");
            }
        }

        Ok(Reading {
            id: None,
            timestamp,
            light: sample.light,
            rgb: sample.rgb,
            accelerometer: sample.accelerometer,
            ambient_temp: sample.temperature,
            pressure: sample.pressure,
            cpu_temp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn zone_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("enviro-zone-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn thermal_zone_is_millidegrees() {
        let path = zone_file("ok", "48250\n");
        let mut thermometer = CpuThermometer::new(path.clone());
        assert_eq!(thermometer.read().unwrap(), 48.25);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn garbage_zone_is_an_error() {
        let path = zone_file("garbage", "hot");
        assert!(read_thermal_zone(&path).is_err());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn simulated_evening_looks_like_led() {
        let mut board = SimulatedBoard::with_seed(7);
        board.clock = || Utc.with_ymd_and_hms(2019, 8, 12, 20, 0, 0).unwrap();

        let sample = board.sample().unwrap();
        assert!(sample.light > 100.0 && sample.light <= 130.0);
        let ratio = sample.rgb.red.unwrap() as f64 / sample.rgb.blue.unwrap() as f64;
        assert!(ratio > 1.7);
    }

    #[test]
    fn simulated_morning_is_dim_daylight() {
        let mut board = SimulatedBoard::with_seed(11);
        board.clock = || Utc.with_ymd_and_hms(2019, 8, 12, 7, 0, 0).unwrap();

        let sample = board.sample().unwrap();
        assert!(sample.light >= 55.0 && sample.light < 65.0);
        let ratio = sample.rgb.red.unwrap() as f64 / sample.rgb.blue.unwrap() as f64;
        assert!(ratio < 1.7);
    }

    #[test]
    fn seeded_boards_repeat() {
        let mut a = SimulatedBoard::with_seed(42);
        let mut b = SimulatedBoard::with_seed(42);
        a.clock = || Utc.with_ymd_and_hms(2019, 8, 12, 12, 0, 0).unwrap();
        b.clock = a.clock;
        assert_eq!(a.sample().unwrap(), b.sample().unwrap());
    }

    struct GlitchyBoard;

    impl SensorBoard for GlitchyBoard {
        fn sample(&mut self) -> Result<BoardSample> {
            Ok(BoardSample {
                light: f64::NAN,
                rgb: Rgb::new(1, 2, 3),
                accelerometer: Acceleration::default(),
                temperature: 25.0,
                pressure: 101_000.0,
            })
        }
    }

    #[test]
    fn probe_rejects_non_finite_samples() {
        let path = zone_file("nan", "50000");
        let mut probe = Probe::new(GlitchyBoard, CpuThermometer::new(path.clone()));
        let at = Utc.with_ymd_and_hms(2019, 8, 12, 12, 0, 0).unwrap();

        let err = probe.read(at).unwrap_err();
        assert!(format!("{err:#}").contains("non-finite light"));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn probe_combines_board_and_host() {
        let path = zone_file("probe", "51000");
        let mut probe = Probe::new(SimulatedBoard::with_seed(1), CpuThermometer::new(path.clone()));
        let at = Utc.with_ymd_and_hms(2019, 8, 12, 12, 0, 0).unwrap();

        let reading = probe.read(at).unwrap();
        assert_eq!(reading.timestamp, at);
        assert_eq!(reading.cpu_temp, 51.0);
        assert!(reading.id.is_none());
        fs::remove_file(path).unwrap();
    }
}
