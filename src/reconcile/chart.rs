use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::alignment::value_at;
use crate::domain::{round_to, Energy, ForecastRequest, ForecastResult};

/// EUR per Wh to cent per kWh
const EUR_PER_WH_TO_CT_PER_KWH: f64 = 100_000.0;
const MONEY_DECIMALS: u32 = 2;

/// The remaining chart lines, rotated into the display window.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChartSeries {
    pub production_kw: Vec<f64>,
    pub load_kw: Vec<f64>,
    pub home_appliance_kw: Vec<f64>,
    pub battery_soc_percent: Vec<f64>,
    pub price_ct_per_kwh: Vec<f64>,
    pub cost_eur: Vec<f64>,
    pub revenue_eur: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSeriesBuilder {
    pub window_hours: usize,
    pub wraparound_offset: usize,
    pub decimals: u32,
}

impl ChartSeriesBuilder {
    pub fn new(window_hours: usize, wraparound_offset: usize, decimals: u32) -> Self {
        Self { window_hours, wraparound_offset, decimals }
    }

    pub fn build(
        &self,
        result: &ForecastResult,
        request: &ForecastRequest,
        current_hour: usize,
    ) -> ChartSeries {
        let wh_to_kw = |wh: f64| Energy::watt_hours(wh).hourly_average_power().as_kilowatts();
        ChartSeries {
            production_kw: self.rotate("production", &request.ems.pv_prognose_wh, current_hour, self.decimals, wh_to_kw),
            load_kw: self.rotate("load", &result.load_wh, current_hour, self.decimals, wh_to_kw),
            home_appliance_kw: self.rotate(
                "home_appliance",
                &result.home_appliance_wh,
                current_hour,
                self.decimals,
                wh_to_kw,
            ),
            battery_soc_percent: self.rotate(
                "battery_soc",
                &result.battery_soc_percent,
                current_hour,
                self.decimals,
                |v| v,
            ),
            price_ct_per_kwh: self.rotate(
                "price",
                &result.price_eur_per_wh,
                current_hour,
                MONEY_DECIMALS,
                |v| v * EUR_PER_WH_TO_CT_PER_KWH,
            ),
            cost_eur: self.rotate("cost", &result.cost_eur, current_hour, MONEY_DECIMALS, |v| v),
            revenue_eur: self.rotate("revenue", &result.revenue_eur, current_hour, MONEY_DECIMALS, |v| v),
        }
    }

    fn rotate(
        &self,
        name: &'static str,
        raw: &[f64],
        current_hour: usize,
        decimals: u32,
        convert: impl Fn(f64) -> f64,
    ) -> Vec<f64> {
        (0..self.window_hours)
            .map(|i| {
                let idx = current_hour + i;
                let value = convert(value_at(raw, idx, self.wraparound_offset));
                if value.is_finite() {
                    round_to(value, decimals)
                } else {
                    warn!(series = name, hour = i, source_index = idx, "non-finite chart value, showing 0");
                    0.0
                }
            })
            .collect()
    }
}
