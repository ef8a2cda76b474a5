use serde::{Deserialize, Serialize};

use super::{ChartSeries, ReconciledSeries};
use crate::domain::round_to;

/// Sums over the display window. Each hourly kW value counts as kWh.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct WindowTotals {
    pub production_kwh: f64,
    pub load_kwh: f64,
    pub grid_consumption_kwh: f64,
    pub ac_charge_kwh: f64,
    pub cost_eur: f64,
    pub revenue_eur: f64,
    pub net_cost_eur: f64,
}

impl WindowTotals {
    pub fn from_series(chart: &ChartSeries, reconciled: &ReconciledSeries, decimals: u32) -> Self {
        let sum = |values: &[f64]| values.iter().sum::<f64>();
        let cost = sum(&chart.cost_eur);
        let revenue = sum(&chart.revenue_eur);
        Self {
            production_kwh: round_to(sum(&chart.production_kw), decimals),
            load_kwh: round_to(sum(&chart.load_kw), decimals),
            grid_consumption_kwh: round_to(sum(&reconciled.grid_consumption_kw), decimals),
            ac_charge_kwh: round_to(sum(&reconciled.ac_charge_kw), decimals),
            cost_eur: round_to(cost, 2),
            revenue_eur: round_to(revenue, 2),
            net_cost_eur: round_to(cost - revenue, 2),
        }
    }
}
