//! End-to-end: fixture documents from the optimizer through to the rendered view.

use eos_dashboard::config::DashboardSettings;
use eos_dashboard::domain::{BaseMode, OverrideMode, ScheduleMode, Snapshot};
use eos_dashboard::source::{FileSnapshotSource, SnapshotSource};
use eos_dashboard::view::{DashboardView, JsonRenderer, RenderContext};

fn fixtures() -> FileSnapshotSource {
    FileSnapshotSource::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures"))
}

fn berlin() -> DashboardSettings {
    DashboardSettings::with_time_zone(chrono_tz::Europe::Berlin)
}

fn load() -> Snapshot {
    fixtures().fetch().expect("fixture snapshot")
}

#[test]
fn test_fixture_window_is_rotated_to_server_hour() {
    let view = DashboardView::build(&load(), &berlin());

    assert_eq!(view.current_hour, 22);
    assert_eq!(view.labels.len(), 24);
    assert_eq!(view.labels[0], "22:00");
    assert_eq!(view.labels[1], "23:00");
    assert_eq!(view.labels[2], "00:00");
    assert_eq!(view.labels[23], "21:00");
}

#[test]
fn test_fixture_grid_reconciliation() {
    let view = DashboardView::build(&load(), &berlin());
    let r = &view.reconciled;

    assert_eq!(r.grid_consumption_kw.len(), 24);
    assert_eq!(r.ac_charge_kw.len(), 24);
    assert!(r.grid_consumption_kw.iter().chain(&r.ac_charge_kw).all(|v| v.is_finite()));

    // plain consumption
    assert_eq!(r.grid_consumption_kw[0], 0.125);
    assert_eq!(r.ac_charge_kw[0], 0.0);
    // charging hour: 2642.9 Wh drawn, 2.5 kW planned
    assert_eq!(r.grid_consumption_kw[4], 0.143);
    assert_eq!(r.ac_charge_kw[4], 2.5);
    // planned charge above the recorded draw
    assert_eq!(r.grid_consumption_kw[5], 1.2);
    assert_eq!(r.ac_charge_kw[5], 2.5);
    // null charge fraction
    assert_eq!(r.grid_consumption_kw[6], 0.0);
    assert_eq!(r.ac_charge_kw[6], 0.241);

    assert_eq!(view.diagnostics.negative_grid_hours, vec![5]);
    assert_eq!(view.diagnostics.invalid_number_hours, vec![6]);
}

#[test]
fn test_fixture_schedule_modes() {
    let view = DashboardView::build(&load(), &berlin());
    let modes: Vec<ScheduleMode> = view.schedule.iter().map(|m| m.mode).collect();

    assert_eq!(
        modes[0],
        ScheduleMode::Override {
            mode: OverrideMode::DischargeAllowedEvccPv,
            base: BaseMode::DischargeAllowed,
        }
    );
    assert_eq!(modes[1], ScheduleMode::Base { mode: BaseMode::DischargeAllowed });
    assert_eq!(modes[2], ScheduleMode::Base { mode: BaseMode::AvoidDischarge });
    assert_eq!(modes[4], ScheduleMode::Base { mode: BaseMode::Charging });
    assert_eq!(modes[5], ScheduleMode::Base { mode: BaseMode::Charging });
    assert_eq!(modes[6], ScheduleMode::Base { mode: BaseMode::AvoidDischarge });
    assert_eq!(modes[8], ScheduleMode::Base { mode: BaseMode::DischargeAllowed });

    // override ends 23:45 local: 22:00, 23:00 and 00:00 (within 45 min grace)
    let flagged: Vec<&str> = view
        .schedule
        .iter()
        .filter(|m| m.manual_override)
        .map(|m| m.label.as_str())
        .collect();
    assert_eq!(flagged, vec!["22:00", "23:00", "00:00"]);

    assert!(view.schedule[1].appliance_start);
    assert!(!view.controls.home_appliance_released);
}

#[test]
fn test_fixture_chart_and_totals() {
    let view = DashboardView::build(&load(), &berlin());

    assert_eq!(view.chart.production_kw.len(), 24);
    assert_eq!(view.chart.home_appliance_kw[1], 0.9);
    assert!((view.totals.production_kwh - 37.276).abs() < 0.01);
    assert!((view.totals.load_kwh - 9.9).abs() < 0.01);
    // money is summed from the per-hour cent-rounded chart values
    assert!((view.totals.cost_eur - 1.23).abs() < 0.02);
    assert!((view.totals.revenue_eur - 2.40).abs() < 0.02);
    assert!((view.totals.net_cost_eur - (view.totals.cost_eur - view.totals.revenue_eur)).abs() < 0.011);
    assert!(view.totals.net_cost_eur < 0.0);
    assert_eq!(view.controls.dc_charge_fraction, Some(1.0));
    assert!(view.controls.discharge_allowed);
}

#[test]
fn test_viewer_zone_does_not_change_source_rotation_semantics() {
    // Same snapshot seen from UTC: the server's 22:15 CET is 21:15 UTC
    let view = DashboardView::build(&load(), &DashboardSettings::default());
    assert_eq!(view.current_hour, 21);
    assert_eq!(view.labels[0], "21:00");
    assert_eq!(view.schedule[0].source_index, 21);
}

#[test]
fn test_fixture_renders_through_context() {
    let mut ctx = RenderContext::new(JsonRenderer::new(Vec::new()), berlin());
    let snapshot = load();

    assert!(ctx.update(&snapshot).unwrap());
    assert!(!ctx.update(&snapshot).unwrap());

    let view = ctx.previous().unwrap();
    let json = serde_json::to_value(view).unwrap();
    assert_eq!(json["labels"][0], "22:00");
    assert_eq!(json["reconciled"]["ac_charge_kw"][4], 2.5);
}
