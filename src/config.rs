use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use figment::{providers::{Env, Format, Serialized, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::alignment::{DISPLAY_WINDOW_HOURS, WRAPAROUND_OFFSET_HOURS};
use crate::schedule::OVERRIDE_GRACE_MINUTES;

/// Decimal places kept on power/energy values handed to the renderer.
pub const PRESENTATION_DECIMALS: u32 = 3;

/// Finer precisions are below `f64` resolution for kW/EUR magnitudes.
pub const MAX_DECIMALS: u32 = 12;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// IANA zone of the viewer, e.g. "Europe/Berlin"
    pub time_zone: String,
    pub window_hours: usize,
    pub override_grace_minutes: i64,
    pub wraparound_offset_hours: usize,
    pub decimals: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            time_zone: "UTC".to_string(),
            window_hours: DISPLAY_WINDOW_HOURS,
            override_grace_minutes: OVERRIDE_GRACE_MINUTES,
            wraparound_offset_hours: WRAPAROUND_OFFSET_HOURS,
            decimals: PRESENTATION_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub snapshot_dir: PathBuf,
    pub poll_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { snapshot_dir: PathBuf::from("json"), poll_seconds: 60 }
    }
}

/// Validated, ready-to-use view of [`DashboardConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardSettings {
    pub time_zone: Tz,
    pub window_hours: usize,
    pub override_grace_minutes: i64,
    pub wraparound_offset_hours: usize,
    pub decimals: u32,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            time_zone: Tz::UTC,
            window_hours: DISPLAY_WINDOW_HOURS,
            override_grace_minutes: OVERRIDE_GRACE_MINUTES,
            wraparound_offset_hours: WRAPAROUND_OFFSET_HOURS,
            decimals: PRESENTATION_DECIMALS,
        }
    }
}

impl DashboardSettings {
    pub fn with_time_zone(time_zone: Tz) -> Self {
        Self { time_zone, ..Self::default() }
    }
}

impl DashboardConfig {
    pub fn settings(&self) -> Result<DashboardSettings> {
        let time_zone: Tz = self
            .time_zone
            .parse()
            .map_err(|e| anyhow!("invalid dashboard.time_zone {:?}: {}", self.time_zone, e))?;
        if self.window_hours == 0 {
            anyhow::bail!("dashboard.window_hours must be positive");
        }
        if self.wraparound_offset_hours == 0 {
            anyhow::bail!("dashboard.wraparound_offset_hours must be positive");
        }
        if self.override_grace_minutes < 0 {
            anyhow::bail!("dashboard.override_grace_minutes must be non-negative");
        }
        if self.decimals > MAX_DECIMALS {
            anyhow::bail!("dashboard.decimals must be at most {}, got {}", MAX_DECIMALS, self.decimals);
        }
        Ok(DashboardSettings {
            time_zone,
            window_hours: self.window_hours,
            override_grace_minutes: self.override_grace_minutes,
            wraparound_offset_hours: self.wraparound_offset_hours,
            decimals: self.decimals,
        })
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("EOS_DASHBOARD__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        Ok(figment.extract()?)
    }
}
