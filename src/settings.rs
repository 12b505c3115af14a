use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::analysis::AnalysisConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HarvestSettings {
    /// LED on-time after each stored reading.
    pub long_blink_ms: u64,
    /// On/off time of each of the three shutdown blinks.
    pub short_blink_ms: u64,
    /// sysfs LED directory (e.g. `/sys/class/leds/led0`); no LED when unset.
    pub led_path: Option<PathBuf>,
    pub thermal_zone_path: PathBuf,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            long_blink_ms: 1500,
            short_blink_ms: 200,
            led_path: None,
            thermal_zone_path: PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardSettings {
    pub refresh_interval_ms: u64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UserSettings {
    analysis: AnalysisConfig,
    harvest: HarvestSettings,
    dashboard: DashboardSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unreadable settings at {}: {err}; using defaults",
                    path.display()
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        data.analysis
            .validate()
            .with_context(|| format!("Invalid analysis settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn analysis(&self) -> AnalysisConfig {
        self.read().analysis.clone()
    }

    pub fn harvest(&self) -> HarvestSettings {
        self.read().harvest.clone()
    }

    pub fn dashboard(&self) -> DashboardSettings {
        self.read().dashboard.clone()
    }

    pub fn update_analysis(&self, config: AnalysisConfig) -> Result<()> {
        config.validate().context("Refusing to store invalid analysis settings")?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.analysis = config;
        self.persist(&guard)
    }

    /// Write the defaults out when no settings file exists yet. An existing
    /// file is never rewritten here, even one that failed to parse.
    pub fn ensure_file(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        let guard = self.read();
        self.persist(&guard)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
