//! Before / during / after analysis windows.
//!
//! Windows are cut from the event timing and a set of exclusion margins:
//! the integrator tolerance around discontinuities, the filter pre-ringing
//! before the fault, and quasi-static settling right after the fault and
//! clearing instants. Each boundary is clamped into the time axis and
//! converted to a sample index by binary search, so every window is a
//! half-open index range that may be empty.

use std::ops::Range;

use gcv_core::{GcvError, GcvResult, Window, WindowConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One analysis window: its clamped time span and the matching samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexWindow {
    pub start_time: f64,
    pub end_time: f64,
    pub range: Range<usize>,
}

impl IndexWindow {
    fn new(start_time: f64, end_time: f64, time: &[f64]) -> Self {
        // An inverted window collapses onto its end point.
        let start_time = start_time.min(end_time);
        let start = time.partition_point(|&t| t < start_time);
        let end = time.partition_point(|&t| t < end_time);
        let range = if end > start { start..end } else { start..start };
        Self {
            start_time,
            end_time,
            range,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Samples of `values` inside the window.
    pub fn slice<'a>(&self, values: &'a [f64]) -> &'a [f64] {
        let end = self.range.end.min(values.len());
        let start = self.range.start.min(end);
        &values[start..end]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub before: IndexWindow,
    pub during: IndexWindow,
    pub after: IndexWindow,
}

impl WindowSpec {
    pub fn get(&self, window: Window) -> &IndexWindow {
        match window {
            Window::Before => &self.before,
            Window::During => &self.during,
            Window::After => &self.after,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Window, &IndexWindow)> {
        Window::ALL.into_iter().map(move |w| (w, self.get(w)))
    }
}

/// Result of the window computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WindowOutcome {
    Valid(WindowSpec),
    /// The event starts inside the mandated pre-event observation span.
    InvalidEvent { t_fault: f64, earliest_allowed: f64 },
}

impl WindowOutcome {
    pub fn windows(&self) -> Option<&WindowSpec> {
        match self {
            WindowOutcome::Valid(spec) => Some(spec),
            WindowOutcome::InvalidEvent { .. } => None,
        }
    }
}

/// Margins actually applied for one event type.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Margins {
    fault_lpf: f64,
    fault_qs: f64,
    clear_qs: f64,
}

fn effective_margins(config: &WindowConfig, setpoint_tracking: bool) -> Margins {
    let (fault_qs, clear_qs) = if setpoint_tracking {
        // Setpoint tests have no physical fault to settle from.
        let lpf = config.t_window_lpf_excl_start.max(0.0);
        (lpf, lpf)
    } else {
        (
            config.t_fault_qs_excl.max(config.t_window_lpf_excl_start),
            config.t_clear_qs_excl.max(config.t_window_lpf_excl_start),
        )
    };
    Margins {
        fault_lpf: config.t_fault_lpf_excl.max(config.t_window_lpf_excl_end),
        fault_qs,
        clear_qs,
    }
}

/// Compute the analysis windows over `time`.
///
/// A `fault_duration` longer than the whole time axis is treated as an
/// instantaneous event. An event starting less than
/// `config.pre_event_window` seconds after the first sample yields
/// [`WindowOutcome::InvalidEvent`].
pub fn compute_windows(
    time: &[f64],
    t_fault: f64,
    fault_duration: f64,
    setpoint_tracking: bool,
    config: &WindowConfig,
) -> GcvResult<WindowOutcome> {
    let (Some(&t_first), Some(&t_last)) = (time.first(), time.last()) else {
        return Err(GcvError::shape("window time axis", 1, 0));
    };
    if !t_fault.is_finite() || !fault_duration.is_finite() || fault_duration < 0.0 {
        return Err(GcvError::Validation(format!(
            "invalid event timing: t_fault={}, fault_duration={}",
            t_fault, fault_duration
        )));
    }

    let margins = effective_margins(config, setpoint_tracking);
    let fault_duration = if fault_duration > t_last {
        debug!(fault_duration, t_last, "fault duration exceeds the time axis, using 0");
        0.0
    } else {
        fault_duration
    };
    let t_clear = t_fault + fault_duration;

    let earliest_allowed = t_first + config.pre_event_window;
    if t_fault < earliest_allowed {
        debug!(t_fault, earliest_allowed, "event inside the pre-event window");
        return Ok(WindowOutcome::InvalidEvent {
            t_fault,
            earliest_allowed,
        });
    }

    let tol = config.t_integrator_tol;
    let clamp = |t: f64| t.clamp(t_first, t_last);
    let window = |start: f64, end: f64| IndexWindow::new(clamp(start), clamp(end), time);

    // Built back to front: each window ends no later than the next one
    // starts, also when clamping collapses the later window.
    let after = window(
        t_clear + tol + margins.clear_qs,
        t_last - config.t_window_lpf_excl_end,
    );
    let during = window(
        t_fault + tol + margins.fault_qs,
        (t_clear - tol - config.t_window_lpf_excl_end).min(after.start_time),
    );
    let before_end = (t_fault - tol - margins.fault_lpf).min(during.start_time);
    let before = window(before_end - config.pre_event_window, before_end);
    let spec = WindowSpec {
        before,
        during,
        after,
    };

    for (name, w) in spec.iter() {
        if w.is_empty() {
            debug!(window = %name, start = w.start_time, end = w.end_time, "empty window");
        }
    }
    Ok(WindowOutcome::Valid(spec))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(end: f64, fs: f64) -> Vec<f64> {
        let n = (end * fs).round() as usize;
        (0..=n).map(|i| i as f64 / fs).collect()
    }

    fn valid(outcome: WindowOutcome) -> WindowSpec {
        match outcome {
            WindowOutcome::Valid(spec) => spec,
            other => panic!("expected windows, got {other:?}"),
        }
    }

    #[test]
    fn default_margins_for_a_fault() {
        let time = axis(10.0, 1000.0);
        let config = WindowConfig::default();
        let spec = valid(compute_windows(&time, 5.0, 0.1, false, &config).unwrap());

        // Fault LPF margin max(0.05, 0.05); QS margins raised to 0.1.
        assert!((spec.before.start_time - 3.95).abs() < 1e-12);
        assert!((spec.before.end_time - 4.95).abs() < 1e-12);
        // During collapses: 5.1 > 5.05.
        assert!((spec.during.start_time - 5.05).abs() < 1e-12);
        assert!((spec.during.end_time - 5.05).abs() < 1e-12);
        assert!(spec.during.is_empty());
        assert!((spec.after.start_time - 5.2).abs() < 1e-12);
        assert!((spec.after.end_time - 9.95).abs() < 1e-12);
        assert!((spec.before.len() as i64 - 1000).abs() <= 1);
    }

    #[test]
    fn index_ranges_follow_binary_search() {
        // Dyadic margins and sampling keep every boundary exact.
        let time = axis(10.0, 8.0);
        let config = WindowConfig {
            t_integrator_tol: 0.0,
            t_fault_lpf_excl: 0.25,
            t_fault_qs_excl: 0.125,
            t_clear_qs_excl: 0.5,
            t_window_lpf_excl_start: 0.25,
            t_window_lpf_excl_end: 0.125,
            pre_event_window: 1.0,
        };
        let spec = valid(compute_windows(&time, 4.0, 1.0, false, &config).unwrap());
        assert_eq!(spec.before.range, 22..30);
        assert_eq!(spec.during.range, 34..39);
        assert_eq!(spec.after.range, 44..79);
    }

    #[test]
    fn clearing_after_last_sample_keeps_windows_ordered() {
        let time = axis(10.0, 100.0);
        let config = WindowConfig::default();
        let spec = valid(compute_windows(&time, 8.0, 5.0, false, &config).unwrap());

        assert!(spec.during.end_time <= spec.after.start_time);
        assert!(spec.during.range.end <= spec.after.range.start);
        assert!(spec.before.range.end <= spec.during.range.start);
        assert!(spec.after.is_empty());
        assert!((spec.during.end_time - 9.95).abs() < 1e-12);
        assert!(!spec.during.is_empty());
    }

    #[test]
    fn long_fault_has_a_during_window() {
        let time = axis(10.0, 100.0);
        let spec = valid(
            compute_windows(&time, 2.0, 1.0, false, &WindowConfig::default()).unwrap(),
        );
        assert!((spec.during.start_time - 2.1).abs() < 1e-12);
        assert!((spec.during.end_time - 2.95).abs() < 1e-12);
        assert!((spec.during.len() as i64 - 85).abs() <= 1);
    }

    #[test]
    fn setpoint_tracking_uses_lpf_margin_only() {
        let time = axis(10.0, 100.0);
        let config = WindowConfig {
            t_fault_qs_excl: 0.5,
            t_clear_qs_excl: 0.7,
            ..WindowConfig::default()
        };
        let fault = valid(compute_windows(&time, 2.0, 2.0, false, &config).unwrap());
        let setpoint = valid(compute_windows(&time, 2.0, 2.0, true, &config).unwrap());
        assert!((fault.during.start_time - 2.5).abs() < 1e-12);
        assert!((setpoint.during.start_time - 2.1).abs() < 1e-12);
        assert!((fault.after.start_time - 4.7).abs() < 1e-12);
        assert!((setpoint.after.start_time - 4.1).abs() < 1e-12);
    }

    #[test]
    fn overlong_duration_collapses_to_instantaneous_event() {
        let time = axis(10.0, 100.0);
        let config = WindowConfig::default();
        let overlong = valid(compute_windows(&time, 2.0, 50.0, false, &config).unwrap());
        let instant = valid(compute_windows(&time, 2.0, 0.0, false, &config).unwrap());
        assert_eq!(overlong, instant);
    }

    #[test]
    fn event_too_early_is_invalid_not_an_error() {
        let time = axis(10.0, 100.0);
        let outcome = compute_windows(&time, 0.5, 0.1, false, &WindowConfig::default()).unwrap();
        assert!(matches!(
            outcome,
            WindowOutcome::InvalidEvent { earliest_allowed, .. } if (earliest_allowed - 1.0).abs() < 1e-12
        ));
        assert!(outcome.windows().is_none());
    }

    #[test]
    fn boundaries_are_ordered_and_clamped() {
        let time = axis(3.0, 50.0);
        let config = WindowConfig::default();
        for &(t_fault, duration) in &[(1.0, 0.0), (1.2, 0.5), (2.0, 0.9), (2.9, 0.05)] {
            let spec = valid(compute_windows(&time, t_fault, duration, false, &config).unwrap());
            assert!(spec.before.end_time <= spec.during.start_time);
            assert!(spec.during.start_time <= spec.during.end_time);
            assert!(spec.during.end_time <= spec.after.start_time);
            assert!(spec.after.start_time <= spec.after.end_time);
            for (_, w) in spec.iter() {
                assert!(w.start_time >= 0.0 && w.end_time <= 3.0);
                assert!(w.range.end <= time.len());
            }
        }
    }

    #[test]
    fn empty_time_axis_is_a_shape_error() {
        let err = compute_windows(&[], 1.0, 0.1, false, &WindowConfig::default()).unwrap_err();
        assert!(err.is_shape());
    }

    #[test]
    fn slice_extracts_window_samples() {
        let time = axis(4.0, 10.0);
        let values: Vec<f64> = (0..time.len()).map(|i| i as f64).collect();
        let spec = valid(
            compute_windows(&time, 2.0, 0.0, false, &WindowConfig::default()).unwrap(),
        );
        let before = spec.before.slice(&values);
        assert_eq!(before.len(), spec.before.len());
        assert_eq!(before.first().copied(), Some(spec.before.range.start as f64));
    }
}
