use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alignment::{flag_at, value_at};
use crate::domain::{
    AlignedHour, BaseMode, ControlState, ForecastResponse, InverterModeCode, ModeAtHour,
    ScheduleMode,
};

/// Hours starting up to this long after a manual override's end still show
/// the override marker. Overrides run in half-hour steps and tend to overrun.
pub const OVERRIDE_GRACE_MINUTES: i64 = 45;

/// Manual override as reported by the control layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualOverride {
    pub active: bool,
    pub end_time: Option<DateTime<Utc>>,
}

impl ManualOverride {
    pub fn from_control(control: &ControlState) -> Self {
        let end_time = control.override_end_time.and_then(epoch_seconds_to_utc);
        if control.override_active && end_time.is_none() {
            debug!(raw_end_time = ?control.override_end_time, "manual override active without usable end time");
        }
        Self { active: control.override_active, end_time }
    }

    /// Whether the override window reaches the hour starting at `hour_start`.
    pub fn covers<Tz: chrono::TimeZone>(&self, hour_start: &DateTime<Tz>, grace: Duration) -> bool {
        if !self.active {
            return false;
        }
        match self.end_time {
            Some(end) => end - hour_start.with_timezone(&Utc) > -grace,
            None => false,
        }
    }
}

fn epoch_seconds_to_utc(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Per-hour inputs of the schedule table, all indexed from the day boundary.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleInputs<'a> {
    pub discharge_allowed: &'a [bool],
    pub ac_charge_power_w: &'a [f64],
    pub inverter_mode_num: i32,
    pub manual_override: ManualOverride,
    pub appliance_start_hour: Option<usize>,
}

/// Planned AC charge power per hour.
pub fn ac_charge_power_w(ac_charge_fraction: &[f64], max_charge_power_w: f64) -> Vec<f64> {
    ac_charge_fraction.iter().map(|f| f * max_charge_power_w).collect()
}

/// Schedule classification of one hour. Charging wins over the discharge flag;
/// a power that is not a number counts as no charging.
pub fn base_mode(ac_charge_power_w: f64, discharge_allowed: bool) -> BaseMode {
    if ac_charge_power_w.is_finite() && ac_charge_power_w != 0.0 {
        BaseMode::Charging
    } else if discharge_allowed {
        BaseMode::DischargeAllowed
    } else {
        BaseMode::AvoidDischarge
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleModeResolver {
    pub override_grace: Duration,
    pub wraparound_offset: usize,
}

impl ScheduleModeResolver {
    pub fn new(override_grace_minutes: i64, wraparound_offset: usize) -> Self {
        Self { override_grace: Duration::minutes(override_grace_minutes), wraparound_offset }
    }

    pub fn resolve_modes(&self, hours: &[AlignedHour], inputs: &ScheduleInputs<'_>) -> Vec<ModeAtHour> {
        hours
            .iter()
            .enumerate()
            .map(|(i, hour)| {
                let idx = hour.source_index;
                let discharge_allowed = flag_at(inputs.discharge_allowed, idx, self.wraparound_offset);
                let ac_power = value_at(inputs.ac_charge_power_w, idx, self.wraparound_offset);
                if !ac_power.is_finite() {
                    warn!(hour = i, source_index = idx, "AC charge power not a number, treating hour as not charging");
                }

                let base = base_mode(ac_power, discharge_allowed);
                let mode = if i == 0 {
                    self.shadow_with_override(base, inputs.inverter_mode_num)
                } else {
                    ScheduleMode::Base { mode: base }
                };

                ModeAtHour {
                    label: hour.local_hour_label(),
                    source_index: idx,
                    mode,
                    effective_mode: mode.effective_base(),
                    manual_override: inputs.manual_override.covers(&hour.starts_at, self.override_grace),
                    appliance_start: inputs.appliance_start_hour == Some(idx),
                }
            })
            .collect()
    }

    /// The running hour shows what the inverter is actually doing when an
    /// external controller has taken over.
    fn shadow_with_override(&self, base: BaseMode, inverter_mode_num: i32) -> ScheduleMode {
        match InverterModeCode::from(inverter_mode_num) {
            InverterModeCode::Override(mode) => {
                let shadowed = ScheduleMode::Override { mode, base: mode.base() };
                debug!(schedule = %base, shown = %shadowed, "running hour follows inverter override");
                shadowed
            }
            InverterModeCode::Unknown(code) => {
                warn!(inverter_mode_num = code, "unknown inverter mode, showing schedule mode");
                ScheduleMode::Base { mode: base }
            }
            InverterModeCode::Base(_) | InverterModeCode::Uninitialized => ScheduleMode::Base { mode: base },
        }
    }
}

/// Control values for the running hour, as the controller would apply them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CurrentControls {
    pub ac_charge_fraction: Option<f64>,
    pub ac_charge_power_w: Option<f64>,
    pub dc_charge_fraction: Option<f64>,
    pub discharge_allowed: bool,
    pub home_appliance_released: bool,
}

pub fn current_controls(
    response: &ForecastResponse,
    max_charge_power_w: f64,
    current_hour: usize,
) -> CurrentControls {
    let finite = |v: f64| v.is_finite().then_some(v);
    let ac_charge_fraction = response.ac_charge.get(current_hour).copied().and_then(finite);
    let dc_charge_fraction = response
        .dc_charge
        .as_ref()
        .and_then(|dc| dc.get(current_hour).copied())
        .and_then(finite);
    let discharge_allowed = response.discharge_allowed.get(current_hour).copied().unwrap_or(false);
    let home_appliance_released = response.home_appliance_start_hour == Some(current_hour);

    debug!(
        current_hour,
        ?ac_charge_fraction,
        ?dc_charge_fraction,
        discharge_allowed,
        home_appliance_released,
        "controls for current hour"
    );

    CurrentControls {
        ac_charge_fraction,
        ac_charge_power_w: ac_charge_fraction.map(|f| f * max_charge_power_w),
        dc_charge_fraction,
        discharge_allowed,
        home_appliance_released,
    }
}
