use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alignment::value_at;
use crate::domain::{round_to, Energy, Power, ReconciledHourSample};

/// Reconciled grid consumption and AC-charge power for the display window.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReconciledSeries {
    pub grid_consumption_kw: Vec<f64>,
    pub ac_charge_kw: Vec<f64>,
}

/// Hours where the reconciliation had to mask something, by display index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileDiagnostics {
    /// Grid minus AC charge was not a finite number
    pub invalid_number_hours: Vec<usize>,
    /// Planned AC charge exceeded the recorded grid draw
    pub negative_grid_hours: Vec<usize>,
}

impl ReconcileDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.invalid_number_hours.is_empty() && self.negative_grid_hours.is_empty()
    }
}

/// Which branch of the masking policy an hour went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourOutcome {
    Subtracted,
    InvalidNumber,
    NegativeGrid,
}

/// Splits the optimizer's grid draw into household consumption and battery
/// charging from the grid.
///
/// The optimizer reports total grid draw (`Netzbezug`) and, separately, the
/// planned AC charge as a fraction of max charge power. Subtracting the
/// second from the first gives the household share. When that subtraction is
/// meaningless the hour is masked instead of failing the cycle:
/// - not finite: everything drawn is attributed to AC charge, grid shows 0
/// - negative: the recorded values are shown as-is
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesReconciler {
    pub window_hours: usize,
    pub wraparound_offset: usize,
    pub decimals: u32,
}

impl SeriesReconciler {
    pub fn new(window_hours: usize, wraparound_offset: usize, decimals: u32) -> Self {
        Self { window_hours, wraparound_offset, decimals }
    }

    /// Reconcile a single hour. Values are unrounded.
    pub fn reconcile_hour(
        grid_draw: Energy,
        ac_charge_fraction: f64,
        max_charge_power: Power,
    ) -> (ReconciledHourSample, HourOutcome) {
        let planned_ac_charge = Power::watts(ac_charge_fraction * max_charge_power.as_watts());
        let raw_grid_kw = grid_draw.hourly_average_power().as_kilowatts();
        let planned_ac_charge_kw = planned_ac_charge.as_kilowatts();
        let candidate_grid_kw = raw_grid_kw - planned_ac_charge_kw;

        if !candidate_grid_kw.is_finite() {
            let ac_charge_kw = if raw_grid_kw.is_finite() { raw_grid_kw } else { 0.0 };
            return (
                ReconciledHourSample { grid_consumption_kw: 0.0, ac_charge_kw },
                HourOutcome::InvalidNumber,
            );
        }
        if candidate_grid_kw < 0.0 {
            return (
                ReconciledHourSample {
                    grid_consumption_kw: raw_grid_kw,
                    ac_charge_kw: planned_ac_charge_kw,
                },
                HourOutcome::NegativeGrid,
            );
        }
        (
            ReconciledHourSample {
                grid_consumption_kw: candidate_grid_kw,
                ac_charge_kw: planned_ac_charge_kw,
            },
            HourOutcome::Subtracted,
        )
    }

    pub fn reconcile(
        &self,
        raw_grid_draw_wh: &[f64],
        raw_ac_charge_fraction: &[f64],
        max_charge_power_w: f64,
        current_hour: usize,
    ) -> (ReconciledSeries, ReconcileDiagnostics) {
        let mut series = ReconciledSeries {
            grid_consumption_kw: Vec::with_capacity(self.window_hours),
            ac_charge_kw: Vec::with_capacity(self.window_hours),
        };
        let mut diagnostics = ReconcileDiagnostics::default();

        for i in 0..self.window_hours {
            let idx = current_hour + i;
            let grid_draw = Energy::watt_hours(value_at(raw_grid_draw_wh, idx, self.wraparound_offset));
            let fraction = value_at(raw_ac_charge_fraction, idx, self.wraparound_offset);
            let (sample, outcome) =
                Self::reconcile_hour(grid_draw, fraction, Power::watts(max_charge_power_w));

            match outcome {
                HourOutcome::Subtracted => {}
                HourOutcome::InvalidNumber => {
                    warn!(
                        hour = i,
                        source_index = idx,
                        grid_draw_wh = grid_draw.as_watt_hours(),
                        ac_charge_fraction = fraction,
                        max_charge_power_w,
                        "grid consumption not a number, attributing grid draw to AC charge"
                    );
                    diagnostics.invalid_number_hours.push(i);
                }
                HourOutcome::NegativeGrid => {
                    debug!(
                        hour = i,
                        source_index = idx,
                        grid_kw = sample.grid_consumption_kw,
                        ac_charge_kw = sample.ac_charge_kw,
                        "planned AC charge exceeds grid draw, showing recorded values"
                    );
                    diagnostics.negative_grid_hours.push(i);
                }
            }

            series.grid_consumption_kw.push(round_to(sample.grid_consumption_kw, self.decimals));
            series.ac_charge_kw.push(round_to(sample.ac_charge_kw, self.decimals));
        }

        (series, diagnostics)
    }
}
