use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::{debug, info};

use crate::alignment::TimeAligner;
use crate::config::DashboardSettings;
use crate::domain::{ModeAtHour, Snapshot};
use crate::reconcile::{
    ChartSeries, ChartSeriesBuilder, ReconcileDiagnostics, ReconciledSeries, SeriesReconciler,
    WindowTotals,
};
use crate::schedule::{
    ac_charge_power_w, current_controls, CurrentControls, ManualOverride, ScheduleInputs,
    ScheduleModeResolver,
};

/// Everything the presentation layer needs for one cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardView {
    /// Server timestamp the whole view was computed for
    pub generated_for: DateTime<FixedOffset>,
    pub current_hour: usize,
    pub labels: Vec<String>,
    pub reconciled: ReconciledSeries,
    pub chart: ChartSeries,
    pub schedule: Vec<ModeAtHour>,
    pub totals: WindowTotals,
    pub controls: CurrentControls,
    pub diagnostics: ReconcileDiagnostics,
}

impl DashboardView {
    /// Run alignment, reconciliation and mode resolution against one
    /// captured server timestamp.
    pub fn build(snapshot: &Snapshot, settings: &DashboardSettings) -> Self {
        let response = &snapshot.response;
        let control = &snapshot.control;
        let max_charge_power_w = snapshot.request.pv_akku.max_charge_power_w;
        let server_timestamp = response.timestamp;

        let aligner = TimeAligner::new(settings.time_zone);
        let current_hour = aligner.current_hour(server_timestamp);
        let hours = aligner.align(server_timestamp, settings.window_hours);

        let (reconciled, diagnostics) = SeriesReconciler::new(
            settings.window_hours,
            settings.wraparound_offset_hours,
            settings.decimals,
        )
        .reconcile(
            &response.result.grid_draw_wh,
            &response.ac_charge,
            max_charge_power_w,
            current_hour,
        );

        let chart = ChartSeriesBuilder::new(
            settings.window_hours,
            settings.wraparound_offset_hours,
            settings.decimals,
        )
        .build(&response.result, &snapshot.request, current_hour);

        let ac_power = ac_charge_power_w(&response.ac_charge, max_charge_power_w);
        let schedule = ScheduleModeResolver::new(
            settings.override_grace_minutes,
            settings.wraparound_offset_hours,
        )
        .resolve_modes(
            &hours,
            &ScheduleInputs {
                discharge_allowed: &response.discharge_allowed,
                ac_charge_power_w: &ac_power,
                inverter_mode_num: control.inverter_mode_num,
                manual_override: ManualOverride::from_control(control),
                appliance_start_hour: response.home_appliance_start_hour,
            },
        );

        let totals = WindowTotals::from_series(&chart, &reconciled, settings.decimals);
        let controls = current_controls(response, max_charge_power_w, current_hour);

        if !diagnostics.is_clean() {
            info!(
                invalid_number_hours = diagnostics.invalid_number_hours.len(),
                negative_grid_hours = diagnostics.negative_grid_hours.len(),
                "grid reconciliation masked some hours"
            );
        }

        Self {
            generated_for: server_timestamp,
            current_hour,
            labels: hours.iter().map(|h| h.local_hour_label()).collect(),
            reconciled,
            chart,
            schedule,
            totals,
            controls,
            diagnostics,
        }
    }
}

/// Presentation layer seam: chart widget, schedule table, or anything else.
pub trait Renderer {
    fn render(&mut self, view: &DashboardView) -> Result<()>;
}

/// Writes each view as one JSON line.
#[derive(Debug)]
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render(&mut self, view: &DashboardView) -> Result<()> {
        serde_json::to_writer(&mut self.out, view)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Owned by the composition root: the renderer plus the last view handed to it.
pub struct RenderContext<R: Renderer> {
    renderer: R,
    previous: Option<DashboardView>,
    settings: DashboardSettings,
}

impl<R: Renderer> RenderContext<R> {
    pub fn new(renderer: R, settings: DashboardSettings) -> Self {
        Self { renderer, previous: None, settings }
    }

    /// Build and render the view for a snapshot. Returns false if the view
    /// was identical to the previous one and rendering was skipped.
    pub fn update(&mut self, snapshot: &Snapshot) -> Result<bool> {
        let view = DashboardView::build(snapshot, &self.settings);
        if self.previous.as_ref() == Some(&view) {
            debug!(generated_for = %view.generated_for, "view unchanged, skipping render");
            return Ok(false);
        }
        self.renderer.render(&view)?;
        self.previous = Some(view);
        Ok(true)
    }

    pub fn previous(&self) -> Option<&DashboardView> {
        self.previous.as_ref()
    }
}
