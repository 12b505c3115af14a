use std::{fs, path::PathBuf, thread, time::Duration};

use anyhow::{Context, Result};
use log::warn;

/// Something that can switch the board's status LED.
pub trait StatusLed: Send + 'static {
    fn set(&mut self, on: bool) -> Result<()>;
}

/// An LED exposed through the kernel LED class (`<dir>/brightness`).
pub struct SysfsLed {
    brightness: PathBuf,
}

impl SysfsLed {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            brightness: dir.join("brightness"),
        }
    }
}

impl StatusLed for SysfsLed {
    fn set(&mut self, on: bool) -> Result<()> {
        fs::write(&self.brightness, if on { "1" } else { "0" })
            .with_context(|| format!("failed to write {}", self.brightness.display()))
    }
}

/// Stand-in when no LED is configured.
pub struct NoLed;

impl StatusLed for NoLed {
    fn set(&mut self, _on: bool) -> Result<()> {
        Ok(())
    }
}

/// Blink patterns for the harvester. The LED is switched off when the signal
/// is dropped, whatever state a blink was interrupted in.
pub struct LedSignal<L: StatusLed> {
    led: L,
    long: Duration,
    short: Duration,
}

impl<L: StatusLed> LedSignal<L> {
    pub fn new(led: L, long: Duration, short: Duration) -> Self {
        Self { led, long, short }
    }

    /// One long pulse: a reading was stored.
    pub fn blink_long(&mut self) -> Result<()> {
        self.pulse(self.long)
    }

    /// Three short pulses: the harvester is exiting.
    pub fn blink_three_times(&mut self) -> Result<()> {
        for _ in 0..3 {
            self.pulse(self.short)?;
            thread::sleep(self.short);
        }
        Ok(())
    }

    fn pulse(&mut self, length: Duration) -> Result<()> {
        self.led.set(true)?;
        thread::sleep(length);
        self.led.set(false)
    }
}

impl<L: StatusLed> Drop for LedSignal<L> {
    fn drop(&mut self) {
        if let Err(err) = self.led.set(false) {
            warn!("failed to switch status LED off: {err:#}");
        }
    }
}
