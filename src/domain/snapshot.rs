use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use validator::Validate;

/// Every optimizer series covers two days, one entry per hour from local midnight.
pub const HORIZON_HOURS: usize = 48;

/// Errors raised at the snapshot boundary. Anything past this point is
/// assumed to satisfy the 48-entry contract.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Malformed {document}: {source}")]
    Malformed {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid {document}: {source}")]
    Invalid {
        document: &'static str,
        #[source]
        source: validator::ValidationErrors,
    },
    #[error("Cannot read {document}: {source}")]
    Io {
        document: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Optimizer response: what the schedule looks like for the next 48 hours.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForecastResponse {
    /// Server wall clock at the time the response was produced
    pub timestamp: DateTime<FixedOffset>,
    #[validate(nested)]
    pub result: ForecastResult,
    /// Grid charge power as a fraction of the battery's max charge power
    #[serde(deserialize_with = "nullable_series")]
    #[validate(length(equal = 48))]
    pub ac_charge: Vec<f64>,
    #[serde(default, deserialize_with = "optional_nullable_series", skip_serializing_if = "Option::is_none")]
    #[validate(length(equal = 48))]
    pub dc_charge: Option<Vec<f64>>,
    #[serde(deserialize_with = "flag_series")]
    #[validate(length(equal = 48))]
    pub discharge_allowed: Vec<bool>,
    /// Hour index (from the day boundary) the home appliance is scheduled to start
    #[serde(default, rename = "washingstart", skip_serializing_if = "Option::is_none")]
    pub home_appliance_start_hour: Option<usize>,
}

/// Named hourly series of the optimizer result. Wire names are the optimizer's.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForecastResult {
    #[serde(rename = "Last_Wh_pro_Stunde", deserialize_with = "nullable_series")]
    #[validate(length(equal = 48))]
    pub load_wh: Vec<f64>,
    #[serde(rename = "Home_appliance_wh_per_hour", deserialize_with = "nullable_series")]
    #[validate(length(equal = 48))]
    pub home_appliance_wh: Vec<f64>,
    #[serde(rename = "Netzbezug_Wh_pro_Stunde", deserialize_with = "nullable_series")]
    #[validate(length(equal = 48))]
    pub grid_draw_wh: Vec<f64>,
    #[serde(rename = "akku_soc_pro_stunde", deserialize_with = "nullable_series")]
    #[validate(length(equal = 48))]
    pub battery_soc_percent: Vec<f64>,
    #[serde(rename = "Kosten_Euro_pro_Stunde", deserialize_with = "nullable_series")]
    #[validate(length(equal = 48))]
    pub cost_eur: Vec<f64>,
    #[serde(rename = "Einnahmen_Euro_pro_Stunde", deserialize_with = "nullable_series")]
    #[validate(length(equal = 48))]
    pub revenue_eur: Vec<f64>,
    #[serde(rename = "Electricity_price", deserialize_with = "nullable_series")]
    #[validate(length(equal = 48))]
    pub price_eur_per_wh: Vec<f64>,
}

/// The optimize request the response was computed from. Only the PV forecast
/// and the battery's charge limit are used.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForecastRequest {
    #[validate(nested)]
    pub ems: EmsRequest,
    #[validate(nested)]
    pub pv_akku: BatteryParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EmsRequest {
    #[serde(deserialize_with = "nullable_series")]
    #[validate(length(equal = 48))]
    pub pv_prognose_wh: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatteryParameters {
    /// Scales the AC charge fractions into watts
    #[validate(range(min = 0.0))]
    pub max_charge_power_w: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlState {
    /// Overall inverter state; 0..=2 are schedule modes, above that an external override
    pub inverter_mode_num: i32,
    pub override_active: bool,
    /// Epoch seconds
    #[serde(default)]
    pub override_end_time: Option<f64>,
}

/// `current_controls.json` as the control layer writes it. Battery and
/// victron sections are ignored.
#[derive(Debug, Deserialize)]
struct CurrentControlsDocument {
    current_states: ControlState,
}

/// Everything one update cycle works on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub response: ForecastResponse,
    pub request: ForecastRequest,
    pub control: ControlState,
}

impl Snapshot {
    /// Parse the three documents of one cycle and check the series contract.
    pub fn from_json(response: &str, request: &str, control: &str) -> Result<Self, SnapshotError> {
        let snapshot = Self {
            response: parse_document("optimize response", response)?,
            request: parse_document("optimize request", request)?,
            control: parse_document::<CurrentControlsDocument>("control state", control)?
                .current_states,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        check("optimize response", &self.response)?;
        check("optimize request", &self.request)?;
        Ok(())
    }
}

fn parse_document<T: for<'de> Deserialize<'de>>(
    document: &'static str,
    raw: &str,
) -> Result<T, SnapshotError> {
    serde_json::from_str(raw).map_err(|source| SnapshotError::Malformed { document, source })
}

fn check<T: Validate>(document: &'static str, value: &T) -> Result<(), SnapshotError> {
    value.validate().map_err(|source| SnapshotError::Invalid { document, source })
}

/// `null` entries mean the optimizer had no value for that hour; they are
/// carried as NaN so the reconciliation policy can mask them.
fn nullable_series<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn optional_nullable_series<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<f64>>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|values| values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Number(f64),
}

fn flag_series<'de, D>(deserializer: D) -> Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<FlagValue> = Vec::deserialize(deserializer)?;
    raw.into_iter()
        .map(|flag| match flag {
            FlagValue::Bool(b) => Ok(b),
            FlagValue::Number(n) if n == 1.0 => Ok(true),
            FlagValue::Number(n) if n == 0.0 => Ok(false),
            FlagValue::Number(n) => Err(serde::de::Error::custom(format!(
                "discharge_allowed entries must be 0 or 1, got {}",
                n
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn series(value: f64) -> serde_json::Value {
        json!(vec![value; HORIZON_HOURS])
    }

    fn response_json() -> serde_json::Value {
        json!({
            "timestamp": "2025-03-10T14:05:00+01:00",
            "result": {
                "Last_Wh_pro_Stunde": series(400.0),
                "Home_appliance_wh_per_hour": series(0.0),
                "Netzbezug_Wh_pro_Stunde": series(250.0),
                "akku_soc_pro_stunde": series(55.0),
                "Kosten_Euro_pro_Stunde": series(0.07),
                "Einnahmen_Euro_pro_Stunde": series(0.0),
                "Electricity_price": series(0.00028)
            },
            "ac_charge": series(0.0),
            "discharge_allowed": json!(vec![1; HORIZON_HOURS]),
            "washingstart": 17
        })
    }

    fn request_json() -> serde_json::Value {
        json!({
            "ems": { "pv_prognose_wh": series(120.0), "gesamtlast": series(400.0) },
            "pv_akku": { "capacity_wh": 10000, "max_charge_power_w": 5000, "initial_soc_percentage": 42 }
        })
    }

    fn control_json() -> serde_json::Value {
        json!({
            "current_states": {
                "current_ac_charge_demand": 0,
                "current_dc_charge_demand": 5000,
                "current_discharge_allowed": true,
                "inverter_mode": "MODE DISCHARGE ALLOWED",
                "inverter_mode_num": 2,
                "override_active": false,
                "override_end_time": 0
            },
            "battery": { "soc": 42.0, "usable_capacity": 8000 },
            "timestamp": "2025-03-10T14:05:00+01:00"
        })
    }

    fn parse_with(
        response: &serde_json::Value,
        request: &serde_json::Value,
        control: &serde_json::Value,
    ) -> Result<Snapshot, SnapshotError> {
        Snapshot::from_json(&response.to_string(), &request.to_string(), &control.to_string())
    }

    fn parse(response: &serde_json::Value) -> Result<Snapshot, SnapshotError> {
        parse_with(response, &request_json(), &control_json())
    }

    #[test]
    fn test_parses_optimizer_documents() {
        let snapshot = parse(&response_json()).unwrap();
        assert_eq!(snapshot.response.result.grid_draw_wh[0], 250.0);
        assert_eq!(snapshot.response.home_appliance_start_hour, Some(17));
        assert!(snapshot.response.dc_charge.is_none());
        assert!(snapshot.response.discharge_allowed.iter().all(|d| *d));
        assert_eq!(snapshot.request.ems.pv_prognose_wh.len(), HORIZON_HOURS);
        assert_eq!(snapshot.request.pv_akku.max_charge_power_w, 5000.0);
        assert_eq!(snapshot.control.inverter_mode_num, 2);
        assert_eq!(snapshot.control.override_end_time, Some(0.0));
    }

    #[test]
    fn test_null_entries_become_nan() {
        let mut response = response_json();
        response["ac_charge"][3] = serde_json::Value::Null;
        let snapshot = parse(&response).unwrap();
        assert!(snapshot.response.ac_charge[3].is_nan());
        assert_eq!(snapshot.response.ac_charge[4], 0.0);
    }

    #[test]
    fn test_boolean_discharge_flags_accepted() {
        let mut response = response_json();
        response["discharge_allowed"] = json!(vec![false; HORIZON_HOURS]);
        let snapshot = parse(&response).unwrap();
        assert!(snapshot.response.discharge_allowed.iter().all(|d| !*d));
    }

    #[test]
    fn test_discharge_flag_out_of_range_rejected() {
        let mut response = response_json();
        response["discharge_allowed"][0] = json!(2);
        let err = parse(&response).unwrap_err();
        assert!(matches!(err, SnapshotError::Malformed { document: "optimize response", .. }));
    }

    #[test]
    fn test_short_series_rejected() {
        let mut response = response_json();
        response["result"]["Netzbezug_Wh_pro_Stunde"] = json!(vec![0.0; 24]);
        let err = parse(&response).unwrap_err();
        assert!(matches!(err, SnapshotError::Invalid { document: "optimize response", .. }));
    }

    #[test]
    fn test_short_dc_charge_rejected() {
        let mut response = response_json();
        response["dc_charge"] = json!(vec![0.0; 47]);
        assert!(parse(&response).is_err());
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut response = response_json();
        response.as_object_mut().unwrap().remove("ac_charge");
        let err = parse(&response).unwrap_err();
        assert!(err.to_string().contains("optimize response"));
    }

    #[test]
    fn test_negative_max_charge_power_rejected() {
        let mut request = request_json();
        request["pv_akku"]["max_charge_power_w"] = json!(-1.0);
        let err = parse_with(&response_json(), &request, &control_json()).unwrap_err();
        assert!(matches!(err, SnapshotError::Invalid { document: "optimize request", .. }));
    }

    #[test]
    fn test_control_state_read_from_current_states() {
        let mut control = control_json();
        control["current_states"]["inverter_mode_num"] = json!(4);
        control["current_states"]["override_active"] = json!(true);
        control["current_states"]["override_end_time"] = json!(1741646700);
        let snapshot = parse_with(&response_json(), &request_json(), &control).unwrap();
        assert_eq!(snapshot.control.inverter_mode_num, 4);
        assert!(snapshot.control.override_active);
        assert_eq!(snapshot.control.override_end_time, Some(1741646700.0));
    }

    #[test]
    fn test_flat_control_document_rejected() {
        let flat = json!({ "inverter_mode_num": 2, "override_active": false });
        let err = parse_with(&response_json(), &request_json(), &flat).unwrap_err();
        assert!(matches!(err, SnapshotError::Malformed { document: "control state", .. }));
    }
}
