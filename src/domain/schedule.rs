use serde::{Deserialize, Serialize};
use strum::{Display, FromRepr};

/// What the precomputed schedule asks the battery to do in an hour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, FromRepr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(i32)]
pub enum BaseMode {
    Charging = 0,
    AvoidDischarge = 1,
    DischargeAllowed = 2,
}

/// Inverter states set by an external controller (EVCC) that supersede the
/// schedule for the running hour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, FromRepr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(i32)]
pub enum OverrideMode {
    AvoidDischargeEvccFast = 3,
    DischargeAllowedEvccPv = 4,
    DischargeAllowedEvccMinPv = 5,
}

impl OverrideMode {
    /// The schedule mode the override behaves like.
    pub fn base(&self) -> BaseMode {
        match self {
            Self::AvoidDischargeEvccFast => BaseMode::AvoidDischarge,
            Self::DischargeAllowedEvccPv | Self::DischargeAllowedEvccMinPv => {
                BaseMode::DischargeAllowed
            }
        }
    }
}

/// Decoded `inverter_mode_num`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InverterModeCode {
    Uninitialized,
    Base(BaseMode),
    Override(OverrideMode),
    Unknown(i32),
}

impl From<i32> for InverterModeCode {
    fn from(code: i32) -> Self {
        if code < 0 {
            return Self::Uninitialized;
        }
        if let Some(base) = BaseMode::from_repr(code) {
            return Self::Base(base);
        }
        match OverrideMode::from_repr(code) {
            Some(mode) => Self::Override(mode),
            None => Self::Unknown(code),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleMode {
    Base { mode: BaseMode },
    Override { mode: OverrideMode, base: BaseMode },
}

impl ScheduleMode {
    /// The mode the hour effectively runs in, override or not.
    pub fn effective_base(&self) -> BaseMode {
        match self {
            Self::Base { mode } => *mode,
            Self::Override { base, .. } => *base,
        }
    }
}

impl std::fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Base { mode } => write!(f, "{}", mode),
            Self::Override { mode, base } => write!(f, "{} ({})", mode, base),
        }
    }
}

/// Schedule-table row for one displayed hour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModeAtHour {
    pub label: String,
    pub source_index: usize,
    pub mode: ScheduleMode,
    /// What the battery does this hour, for colouring
    pub effective_mode: BaseMode,
    /// A manual override window covers this hour
    pub manual_override: bool,
    /// The home appliance is scheduled to start this hour
    pub appliance_start: bool,
}
