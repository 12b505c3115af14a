pub mod board;
pub mod controller;
pub mod led;
pub mod loop_worker;

pub use board::{BoardSample, CpuThermometer, Probe, SensorBoard, SimulatedBoard};
pub use controller::HarvestController;
pub use led::{LedSignal, NoLed, StatusLed, SysfsLed};

use std::time::Duration;

use anyhow::{Context, Result};

use crate::analysis::AnalysisConfig;
use crate::settings::HarvestSettings;

impl StatusLed for Box<dyn StatusLed> {
    fn set(&mut self, on: bool) -> anyhow::Result<()> {
        (**self).set(on)
    }
}

/// The LED named in `settings`, or a silent stand-in.
pub fn status_signal(settings: &HarvestSettings) -> LedSignal<Box<dyn StatusLed>> {
    let led: Box<dyn StatusLed> = match &settings.led_path {
        Some(dir) => Box::new(SysfsLed::new(dir.clone())),
        None => Box::new(NoLed),
    };
    LedSignal::new(
        led,
        Duration::from_millis(settings.long_blink_ms),
        Duration::from_millis(settings.short_blink_ms),
    )
}

/// One capture per `sample_interval_secs`, so stored counts convert back to
/// the time they cover.
pub fn capture_interval(config: &AnalysisConfig) -> Result<Duration> {
    Duration::try_from_secs_f64(config.sample_interval_secs).with_context(|| {
        format!(
            "sample interval {} is not a usable capture period",
            config.sample_interval_secs
        )
    })
}
