//! Scoring one scenario: resample, filter, window, measure.

use std::collections::BTreeMap;
use std::io;

use gcv_core::{
    DiagnosticIssue, Diagnostics, GcvResult, MetricKind, Severity, Signal, TimeSeries,
    ValidationConfig, Window,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::curves::{CurveSet, CurveSource, EventMetadata};
use crate::extractors::{
    imax_priority_violation, is_invalid_test, is_stable, ramp_time_lag, response_time,
    settling_time, Ramp, RampLag, Stability,
};
use crate::filter::apply_filter_config;
use crate::metrics::{compute_metrics, ErrorMetrics};
use crate::resample::resample_pair;
use crate::windows::{compute_windows, WindowOutcome, WindowSpec};

/// What to compare and how to normalize it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonRequest {
    /// Signals to score; empty means every signal both curve sets carry.
    pub signals: Vec<Signal>,
    /// Expected step size per signal; signals not listed use 1.0.
    pub step_magnitudes: BTreeMap<Signal, f64>,
    /// Setpoint-tracking tests have no physical fault.
    pub setpoint_tracking: bool,
    /// The reference is a field measurement.
    pub field_measurement: bool,
    /// Setpoint ramps the simulated signal is expected to follow.
    pub ramps: BTreeMap<Signal, Ramp>,
}

impl ComparisonRequest {
    pub fn step_magnitude(&self, signal: Signal) -> f64 {
        self.step_magnitudes.get(&signal).copied().unwrap_or(1.0)
    }
}

/// Metrics of one (signal, window) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub signal: Signal,
    pub window: Window,
    pub metrics: ErrorMetrics,
}

/// Sparse table of error metrics; only scored pairs have an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricTable {
    entries: Vec<MetricEntry>,
}

impl MetricTable {
    pub fn insert(&mut self, signal: Signal, window: Window, metrics: ErrorMetrics) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.signal == signal && e.window == window)
        {
            Some(entry) => entry.metrics = metrics,
            None => self.entries.push(MetricEntry {
                signal,
                window,
                metrics,
            }),
        }
    }

    pub fn get(&self, signal: Signal, window: Window) -> Option<&ErrorMetrics> {
        self.entries
            .iter()
            .find(|e| e.signal == signal && e.window == window)
            .map(|e| &e.metrics)
    }

    pub fn value(&self, signal: Signal, window: Window, kind: MetricKind) -> Option<f64> {
        self.get(signal, window).map(|m| m.value(kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every scored pair passes all its checks.
    pub fn all_pass(&self) -> bool {
        self.entries.iter().all(|e| e.metrics.check)
    }

    /// Write one `;`-separated row per scored pair: signal, window, the
    /// statistics in [`MetricKind::ALL`] order and the overall check.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> GcvResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_writer(writer);
        let mut header = vec!["signal".to_string(), "window".to_string()];
        header.extend(MetricKind::ALL.iter().map(|k| k.abbreviation().to_string()));
        header.push("check".to_string());
        writer.write_record(&header)?;
        for entry in &self.entries {
            let mut row = vec![entry.signal.to_string(), entry.window.to_string()];
            row.extend(
                MetricKind::ALL
                    .iter()
                    .map(|k| format!("{:.6}", entry.metrics.value(*k))),
            );
            row.push(entry.metrics.check.to_string());
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Per-signal facts that do not depend on the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    pub signal: Signal,
    pub windows: WindowSpec,
    /// Stability of the simulated curve at the end of the run.
    pub stability: Stability,
    pub samples: usize,
    /// Seconds from the event until the simulated curve first moves by the
    /// configured share of its step.
    pub response_time: Option<f64>,
    /// Seconds from the event until the simulated curve stays in band.
    pub settling_time: Option<f64>,
    /// Deviation from the requested setpoint ramp, when one was given.
    pub ramp_lag: Option<RampLag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub signals: Vec<SignalReport>,
    pub metrics: MetricTable,
    pub diagnostics: Diagnostics,
    /// Time of the first sample where active current grew at the rating.
    pub imax_violation: Option<f64>,
    pub compliant: bool,
}

/// Classification of a scored scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Evaluated(ComparisonReport),
    InvalidTest { reason: String },
    WithoutCurves,
    WithoutReferenceCurves,
}

impl ScenarioOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ScenarioOutcome::Evaluated(report) if report.compliant => "compliant",
            ScenarioOutcome::Evaluated(_) => "non_compliant",
            ScenarioOutcome::InvalidTest { .. } => "invalid_test",
            ScenarioOutcome::WithoutCurves => "without_curves",
            ScenarioOutcome::WithoutReferenceCurves => "without_reference_curves",
        }
    }

    pub fn report(&self) -> Option<&ComparisonReport> {
        match self {
            ScenarioOutcome::Evaluated(report) => Some(report),
            _ => None,
        }
    }
}

/// V, P and Q of the simulated run when they share one time axis.
fn undisturbed_run(sim: &CurveSet, event: &EventMetadata, tolerance: f64) -> GcvResult<bool> {
    let (Some(v), Some(p), Some(q)) = (
        sim.channel(Signal::Voltage),
        sim.channel(Signal::ActivePower),
        sim.channel(Signal::ReactivePower),
    ) else {
        return Ok(false);
    };
    if v.time() != p.time() || v.time() != q.time() {
        debug!("V, P and Q sampled differently, invalid-test check skipped");
        return Ok(false);
    }
    is_invalid_test(
        v.time(),
        v.values(),
        p.values(),
        q.values(),
        event.t_fault,
        event.fault_duration,
        tolerance,
    )
}

fn requested_signals(
    sim: &CurveSet,
    reference: &CurveSet,
    request: &ComparisonRequest,
) -> Vec<Signal> {
    if request.signals.is_empty() {
        sim.signals()
            .filter(|s| reference.channel(*s).is_some())
            .collect()
    } else {
        request.signals.clone()
    }
}

enum SignalResult {
    Scored(SignalReport),
    Skipped,
    InvalidEvent(String),
}

#[allow(clippy::too_many_arguments)]
fn score_signal(
    signal: Signal,
    sim: &TimeSeries,
    reference: &TimeSeries,
    event: &EventMetadata,
    request: &ComparisonRequest,
    config: &ValidationConfig,
    table: &mut MetricTable,
    diagnostics: &mut Diagnostics,
) -> GcvResult<SignalResult> {
    let name = signal.as_str();
    let fs = config.resampling.fs_hz;

    let (sim_rs, ref_rs) = resample_pair(sim, reference, fs)?;
    if sim_rs.is_empty() {
        diagnostics.add_error_with_entity("resample", "time spans do not overlap", name);
        return Ok(SignalResult::Skipped);
    }
    let sim_f = apply_filter_config(&sim_rs, &config.filter, fs)?;
    let ref_f = apply_filter_config(&ref_rs, &config.filter, fs)?;

    let windows = match compute_windows(
        sim_f.time(),
        event.t_fault,
        event.fault_duration,
        request.setpoint_tracking,
        &config.windows,
    )? {
        WindowOutcome::Valid(spec) => spec,
        WindowOutcome::InvalidEvent {
            t_fault,
            earliest_allowed,
        } => {
            return Ok(SignalResult::InvalidEvent(format!(
                "event at t={} s starts before t={} s, the end of the pre-event window of {}",
                t_fault, earliest_allowed, name
            )))
        }
    };

    let step = request.step_magnitude(signal);
    for (window, span) in windows.iter() {
        if span.is_empty() {
            let message = format!("{} window is empty", window);
            diagnostics.add(
                DiagnosticIssue::new(Severity::Warning, "window", message)
                    .with_entity(name)
                    .with_time(span.start_time),
            );
            continue;
        }
        let thresholds = config
            .thresholds
            .lookup(window, signal, request.field_measurement);
        let metrics = compute_metrics(
            span.slice(sim_f.values()),
            span.slice(ref_f.values()),
            step,
            &thresholds,
        )?;
        table.insert(signal, window, metrics);
    }

    let stability = is_stable(sim.time(), sim.values(), config.extractors.stable_time)?;
    if !stability.stable {
        diagnostics.add_warning_with_entity(
            "stability",
            "simulated curve not stable at end",
            name,
        );
    }

    let extractors = &config.extractors;
    let response = response_time(
        sim.time(),
        sim.values(),
        event.t_fault,
        extractors.response_fraction,
    )?;
    let settling = settling_time(
        sim.time(),
        sim.values(),
        event.t_fault,
        extractors.settling_tolerance,
    )?;
    let ramp_lag = match request.ramps.get(&signal) {
        Some(ramp) => {
            let lag = ramp_time_lag(sim.time(), sim.values(), ramp)?;
            if lag.is_none() {
                diagnostics.add_warning_with_entity("ramp", "no sample inside the ramp span", name);
            }
            lag
        }
        None => None,
    };

    Ok(SignalResult::Scored(SignalReport {
        signal,
        windows,
        stability,
        samples: sim_f.len(),
        response_time: response,
        settling_time: settling,
        ramp_lag,
    }))
}

/// Time of the first reactive-priority violation of the simulated currents.
fn current_limit_violation(
    sim: &CurveSet,
    imax: f64,
    tolerance: f64,
    diagnostics: &mut Diagnostics,
) -> GcvResult<Option<f64>> {
    let (Some(ip), Some(iq)) = (
        sim.channel(Signal::ActiveCurrent),
        sim.channel(Signal::ReactiveCurrent),
    ) else {
        diagnostics.add_warning("imax", "Ip or Iq missing, current limit not checked");
        return Ok(None);
    };
    if ip.time() != iq.time() {
        diagnostics.add_warning("imax", "Ip and Iq sampled differently, current limit not checked");
        return Ok(None);
    }
    let violation = imax_priority_violation(ip.values(), iq.values(), imax, tolerance)?
        .map(|i| ip.time()[i]);
    if let Some(t) = violation {
        diagnostics.add(
            DiagnosticIssue::new(
                Severity::Error,
                "imax",
                "active current increased at the current limit",
            )
            .with_time(t),
        );
    }
    Ok(violation)
}

/// Score a simulated curve set against a reference curve set.
///
/// Missing curves, an undisturbed run and an event inside the pre-event
/// window are outcomes, not errors. Shape and numerical failures are errors.
pub fn compare_curves(
    sim: Option<&CurveSet>,
    reference: Option<&CurveSet>,
    request: &ComparisonRequest,
    config: &ValidationConfig,
) -> GcvResult<ScenarioOutcome> {
    let Some(sim) = sim else {
        return Ok(ScenarioOutcome::WithoutCurves);
    };
    let Some(reference) = reference else {
        return Ok(ScenarioOutcome::WithoutReferenceCurves);
    };
    let event = sim.event;

    if undisturbed_run(sim, &event, config.extractors.flat_tolerance)? {
        return Ok(ScenarioOutcome::InvalidTest {
            reason: "voltage, active and reactive power are flat around the event".into(),
        });
    }

    let mut table = MetricTable::default();
    let mut diagnostics = Diagnostics::new();
    let mut signals = Vec::new();

    for signal in requested_signals(sim, reference, request) {
        let (Some(sim_series), Some(ref_series)) =
            (sim.channel(signal), reference.channel(signal))
        else {
            diagnostics.add_warning_with_entity(
                "curves",
                "signal missing from a curve set",
                signal.as_str(),
            );
            continue;
        };
        match score_signal(
            signal,
            sim_series,
            ref_series,
            &event,
            request,
            config,
            &mut table,
            &mut diagnostics,
        )? {
            SignalResult::Scored(report) => signals.push(report),
            SignalResult::Skipped => {}
            SignalResult::InvalidEvent(reason) => {
                warn!(%reason, "invalid test");
                return Ok(ScenarioOutcome::InvalidTest { reason });
            }
        }
    }

    if signals.is_empty() {
        debug!(issues = %diagnostics.summary(), "no comparable signal");
        return Ok(ScenarioOutcome::WithoutReferenceCurves);
    }

    let imax_violation = match config.extractors.imax {
        Some(imax) => current_limit_violation(
            sim,
            imax,
            config.extractors.imax_tolerance,
            &mut diagnostics,
        )?,
        None => None,
    };

    let compliant = table.all_pass() && imax_violation.is_none();
    info!(
        signals = signals.len(),
        metrics = table.len(),
        compliant,
        "scenario scored"
    );
    Ok(ScenarioOutcome::Evaluated(ComparisonReport {
        signals,
        metrics: table,
        diagnostics,
        imax_violation,
        compliant,
    }))
}

/// Load both curve sets from their sources and score them.
///
/// A reference source that reports field measurements loosens the
/// thresholds even when the request does not ask for it.
pub fn evaluate_sources(
    sim: &dyn CurveSource,
    reference: &dyn CurveSource,
    request: &ComparisonRequest,
    config: &ValidationConfig,
) -> GcvResult<ScenarioOutcome> {
    let sim_curves = sim.load()?;
    let ref_curves = reference.load()?;
    debug!(sim = %sim.describe(), reference = %reference.describe(), "curves loaded");

    let mut request = request.clone();
    request.field_measurement |= reference.is_field_measurement();
    compare_curves(sim_curves.as_ref(), ref_curves.as_ref(), &request, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::SimulatedCurves;

    fn event() -> EventMetadata {
        EventMetadata {
            t_fault: 2.0,
            fault_duration: 0.5,
            fs_hz: None,
        }
    }

    fn curve(f: impl Fn(f64) -> f64, n: usize, dt: f64) -> TimeSeries {
        let time: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
        let values = time.iter().map(|&t| f(t)).collect();
        TimeSeries::new(time, values).unwrap()
    }

    fn dip(t: f64) -> f64 {
        if (2.0..2.5).contains(&t) {
            0.5
        } else {
            1.0
        }
    }

    fn set(v: impl Fn(f64) -> f64, dt: f64) -> CurveSet {
        CurveSet::new(event())
            .with_channel(Signal::Voltage, curve(&v, (5.0 / dt) as usize + 1, dt))
            .with_channel(Signal::ActivePower, curve(|_| 0.8, (5.0 / dt) as usize + 1, dt))
            .with_channel(Signal::ReactivePower, curve(|_| 0.0, (5.0 / dt) as usize + 1, dt))
    }

    #[test]
    fn missing_curves_are_outcomes() {
        let config = ValidationConfig::default();
        let request = ComparisonRequest::default();
        let s = set(dip, 0.01);
        assert!(matches!(
            compare_curves(None, Some(&s), &request, &config).unwrap(),
            ScenarioOutcome::WithoutCurves
        ));
        assert!(matches!(
            compare_curves(Some(&s), None, &request, &config).unwrap(),
            ScenarioOutcome::WithoutReferenceCurves
        ));
    }

    #[test]
    fn identical_curves_are_compliant() {
        let config = ValidationConfig::default();
        let request = ComparisonRequest::default();
        let sim = set(dip, 0.01);
        let reference = set(dip, 0.004);
        let outcome = compare_curves(Some(&sim), Some(&reference), &request, &config).unwrap();
        let report = outcome.report().expect("evaluated");
        assert!(report.compliant, "{:?}", report.metrics);
        assert_eq!(outcome.label(), "compliant");
        assert!(report.metrics.get(Signal::Voltage, Window::Before).is_some());
        assert!(report.metrics.get(Signal::Voltage, Window::After).is_some());
    }

    #[test]
    fn biased_reference_fails() {
        let config = ValidationConfig::default();
        let request = ComparisonRequest {
            signals: vec![Signal::Voltage],
            ..ComparisonRequest::default()
        };
        let sim = set(dip, 0.01);
        let reference = set(|t| dip(t) + 0.2, 0.01);
        let outcome = compare_curves(Some(&sim), Some(&reference), &request, &config).unwrap();
        let report = outcome.report().expect("evaluated");
        assert!(!report.compliant);
        let me = report
            .metrics
            .value(Signal::Voltage, Window::After, MetricKind::MeanError)
            .unwrap();
        assert!((me + 0.2).abs() < 1e-6, "{me}");
    }

    #[test]
    fn flat_run_is_invalid() {
        let config = ValidationConfig::default();
        let flat = set(|_| 1.0, 0.01);
        let outcome =
            compare_curves(Some(&flat), Some(&flat), &ComparisonRequest::default(), &config)
                .unwrap();
        assert!(matches!(outcome, ScenarioOutcome::InvalidTest { .. }));
    }

    #[test]
    fn disjoint_reference_has_no_comparable_signal() {
        let config = ValidationConfig::default();
        let sim = set(dip, 0.01);
        let shifted = TimeSeries::new(vec![10.0, 11.0], vec![1.0, 1.0]).unwrap();
        let reference = CurveSet::new(event()).with_channel(Signal::Voltage, shifted);
        let outcome =
            compare_curves(Some(&sim), Some(&reference), &ComparisonRequest::default(), &config)
                .unwrap();
        assert!(matches!(outcome, ScenarioOutcome::WithoutReferenceCurves));
    }

    #[test]
    fn sources_feed_the_comparison() {
        let config = ValidationConfig::default();
        let sim = SimulatedCurves::new(set(dip, 0.01));
        let outcome = evaluate_sources(
            &sim,
            &SimulatedCurves::missing(),
            &ComparisonRequest::default(),
            &config,
        )
        .unwrap();
        assert_eq!(outcome.label(), "without_reference_curves");
    }

    #[test]
    fn table_replaces_existing_entry() {
        let metrics = compute_metrics(&[1.0], &[1.0], 1.0, &config_thresholds()).unwrap();
        let mut table = MetricTable::default();
        table.insert(Signal::Voltage, Window::After, metrics);
        table.insert(Signal::Voltage, Window::After, metrics);
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.value(Signal::Voltage, Window::After, MetricKind::MaxError),
            Some(0.0)
        );
        assert_eq!(table.value(Signal::Voltage, Window::During, MetricKind::MaxError), None);
    }

    fn lagged_power(t: f64) -> f64 {
        if t < 2.0 {
            0.8
        } else {
            0.5 + 0.3 * (-(t - 2.0) / 0.2).exp()
        }
    }

    #[test]
    fn report_carries_response_and_settling_times() {
        let config = ValidationConfig::default();
        let n = 501;
        let sim = set(dip, 0.01).with_channel(Signal::ActivePower, curve(lagged_power, n, 0.01));
        let request = ComparisonRequest {
            signals: vec![Signal::ActivePower],
            ..ComparisonRequest::default()
        };
        let outcome = compare_curves(Some(&sim), Some(&sim), &request, &config).unwrap();
        let report = outcome.report().expect("evaluated");
        let p = &report.signals[0];
        // 10 % of the step is reached 0.021 s after the event, 5 % band at 0.599 s.
        let response = p.response_time.unwrap();
        assert!((response - 0.03).abs() < 0.011, "{response}");
        let settling = p.settling_time.unwrap();
        assert!((settling - 0.6).abs() < 0.011, "{settling}");
        assert_eq!(p.ramp_lag, None);
        assert_eq!(report.imax_violation, None);
    }

    #[test]
    fn requested_ramp_is_measured() {
        let config = ValidationConfig::default();
        let ramp = Ramp {
            t_start: 2.0,
            duration: 1.0,
            from: 0.8,
            to: 0.5,
        };
        // Follows the ramp 0.1 s late.
        let late = |t: f64| 0.8 - 0.3 * ((t - 2.1) / 1.0).clamp(0.0, 1.0);
        let sim = set(dip, 0.01).with_channel(Signal::ActivePower, curve(late, 501, 0.01));
        let mut request = ComparisonRequest {
            signals: vec![Signal::ActivePower],
            ..ComparisonRequest::default()
        };
        request.ramps.insert(Signal::ActivePower, ramp);
        let outcome = compare_curves(Some(&sim), Some(&sim), &request, &config).unwrap();
        let lag = outcome.report().unwrap().signals[0].ramp_lag.unwrap();
        assert!((lag.max_time_lag - 0.1).abs() < 1e-6, "{lag:?}");
        assert!((lag.max_value_error - 0.03).abs() < 1e-6, "{lag:?}");
    }

    fn with_currents(ip: impl Fn(f64) -> f64) -> CurveSet {
        set(dip, 0.01)
            .with_channel(Signal::ActiveCurrent, curve(ip, 501, 0.01))
            .with_channel(Signal::ReactiveCurrent, curve(|_| 0.92, 501, 0.01))
    }

    #[test]
    fn active_current_growing_at_the_limit_is_non_compliant() {
        let mut config = ValidationConfig::default();
        config.extractors.imax = Some(1.0);
        let rising = with_currents(|t| 0.4 + 0.5 * (t - 3.0).max(0.0));
        let request = ComparisonRequest::default();
        let outcome = compare_curves(Some(&rising), Some(&rising), &request, &config).unwrap();
        let report = outcome.report().expect("evaluated");
        assert!(report.metrics.all_pass());
        let t = report.imax_violation.expect("violation");
        assert!((t - 3.01).abs() < 1e-6, "{t}");
        assert!(!report.compliant);
        assert_eq!(outcome.label(), "non_compliant");

        let held = with_currents(|_| 0.4);
        let outcome = compare_curves(Some(&held), Some(&held), &request, &config).unwrap();
        assert!(outcome.report().unwrap().compliant);
    }

    #[test]
    fn current_limit_check_needs_both_currents() {
        let mut config = ValidationConfig::default();
        config.extractors.imax = Some(1.0);
        let sim = set(dip, 0.01);
        let outcome =
            compare_curves(Some(&sim), Some(&sim), &ComparisonRequest::default(), &config)
                .unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.imax_violation, None);
        assert!(report.compliant);
        assert_eq!(report.diagnostics.issues_by_category("imax").count(), 1);
    }

    #[test]
    fn metrics_csv_lists_every_statistic() {
        let config = ValidationConfig::default();
        let sim = set(dip, 0.01);
        let request = ComparisonRequest {
            signals: vec![Signal::Voltage],
            ..ComparisonRequest::default()
        };
        let outcome = compare_curves(Some(&sim), Some(&sim), &request, &config).unwrap();
        let mut buffer = Vec::new();
        outcome.report().unwrap().metrics.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "signal;window;mxe;me;mae;check");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "V;before;0.000000;0.000000;0.000000;true");
    }

    fn config_thresholds() -> gcv_core::MetricThresholds {
        ValidationConfig::default()
            .thresholds
            .lookup(Window::After, Signal::Voltage, false)
    }
}
