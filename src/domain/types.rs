use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

// ============================================================================
// Physical Unit Newtypes
// ============================================================================

/// Power in Watts (W)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct Power(pub f64);

impl Power {
    pub fn watts(w: f64) -> Self {
        Self(w)
    }

    pub fn as_watts(&self) -> f64 {
        self.0
    }

    pub fn as_kilowatts(&self) -> f64 {
        self.0 / 1000.0
    }
}

/// Energy in Watt-hours (Wh)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct Energy(pub f64);

impl Energy {
    pub fn watt_hours(wh: f64) -> Self {
        Self(wh)
    }

    pub fn as_watt_hours(&self) -> f64 {
        self.0
    }

    /// Average power over one hour.
    pub fn hourly_average_power(&self) -> Power {
        Power::watts(self.0)
    }
}

// ============================================================================
// Derived per-hour values
// ============================================================================

/// One displayed hour and the raw-array slot it reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedHour {
    pub starts_at: DateTime<Tz>,
    pub source_index: usize,
}

impl AlignedHour {
    /// Viewer-local label, "HH:00"
    pub fn local_hour_label(&self) -> String {
        format!("{:02}:00", self.starts_at.hour())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReconciledHourSample {
    pub grid_consumption_kw: f64,
    pub ac_charge_kw: f64,
}

/// Round for display; callers compare unrounded values. Precisions too fine
/// for an `f64` scale factor leave the value untouched.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let Ok(exponent) = i32::try_from(decimals) else {
        return value;
    };
    let factor = 10f64.powi(exponent);
    let scaled = value * factor;
    if !factor.is_finite() || !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}
