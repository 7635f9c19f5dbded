//! Scalar indicators computed on whole curves rather than on windows.

use gcv_core::{GcvError, GcvResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Absolute stability band used when the final value is at most 1 pu.
pub const STABLE_ABS_BAND: f64 = 0.002;
/// Relative stability band used above 1 pu.
pub const STABLE_REL_BAND: f64 = 0.002;

fn same_len(context: &str, a: &[f64], b: &[f64]) -> GcvResult<()> {
    if a.len() != b.len() {
        return Err(GcvError::shape(context, a.len(), b.len()));
    }
    Ok(())
}

/// Index of the first sample at or after `t`.
fn index_at(time: &[f64], t: f64) -> usize {
    time.partition_point(|&ti| ti < t)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stability {
    pub stable: bool,
    /// First index of the in-band tail when the curve is stable.
    pub onset: Option<usize>,
}

/// Whether the curve has stayed within a band around its final value for at
/// least `stable_time` seconds.
///
/// The band is ±0.002 when `|final| <= 1` and ±0.2 % of `|final|` above.
pub fn is_stable(time: &[f64], curve: &[f64], stable_time: f64) -> GcvResult<Stability> {
    same_len("is_stable", time, curve)?;
    let Some(&last) = curve.last() else {
        return Ok(Stability {
            stable: false,
            onset: None,
        });
    };
    let band = if last.abs() <= 1.0 {
        STABLE_ABS_BAND
    } else {
        STABLE_REL_BAND * last.abs()
    };

    let mut onset = curve.len() - 1;
    while onset > 0 && (curve[onset - 1] - last).abs() <= band {
        onset -= 1;
    }

    let held = time[time.len() - 1] - time[onset];
    if held >= stable_time {
        Ok(Stability {
            stable: true,
            onset: Some(onset),
        })
    } else {
        Ok(Stability {
            stable: false,
            onset: None,
        })
    }
}

/// Initial value (at the event), final value and the index of the event.
fn step_levels(time: &[f64], curve: &[f64], event_start: f64) -> Option<(usize, f64, f64)> {
    let start = index_at(time, event_start);
    let initial = *curve.get(start)?;
    let last = *curve.last()?;
    Some((start, initial, last))
}

/// Time from `event_start` until the curve first moves by `fraction` of its
/// total step change.
///
/// `None` when the curve has no step change after the event or never
/// reaches the threshold.
pub fn response_time(
    time: &[f64],
    curve: &[f64],
    event_start: f64,
    fraction: f64,
) -> GcvResult<Option<f64>> {
    same_len("response_time", time, curve)?;
    let Some((start, initial, last)) = step_levels(time, curve, event_start) else {
        return Ok(None);
    };
    let step = (last - initial).abs();
    if step == 0.0 {
        return Ok(None);
    }
    let threshold = fraction * step;
    Ok(curve[start..]
        .iter()
        .position(|c| (c - initial).abs() >= threshold)
        .map(|i| time[start + i] - event_start))
}

/// Time from `event_start` after which the curve stays within
/// `tolerance · |step|` of its final value.
pub fn settling_time(
    time: &[f64],
    curve: &[f64],
    event_start: f64,
    tolerance: f64,
) -> GcvResult<Option<f64>> {
    same_len("settling_time", time, curve)?;
    let Some((start, initial, last)) = step_levels(time, curve, event_start) else {
        return Ok(None);
    };
    let step = (last - initial).abs();
    if step == 0.0 {
        return Ok(None);
    }
    let band = tolerance * step;
    let settled_from = curve[start..]
        .iter()
        .rposition(|c| (c - last).abs() > band)
        .map_or(start, |i| start + i + 1);
    Ok(time
        .get(settled_from)
        .map(|t| (t - event_start).max(0.0)))
}

/// Linear setpoint ramp from `from` to `to` over `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ramp {
    pub t_start: f64,
    pub duration: f64,
    pub from: f64,
    pub to: f64,
}

impl Ramp {
    fn value_at(&self, t: f64) -> f64 {
        let s = ((t - self.t_start) / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * s
    }

    fn time_of(&self, value: f64) -> f64 {
        self.t_start + self.duration * (value - self.from) / (self.to - self.from)
    }

    fn contains_value(&self, value: f64) -> bool {
        let (lo, hi) = if self.from <= self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        };
        (lo..=hi).contains(&value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampLag {
    /// Signed timing deviation with the largest magnitude (positive: late).
    pub max_time_lag: f64,
    /// Largest absolute deviation from the ideal ramp value.
    pub max_value_error: f64,
}

/// Compare a curve against an ideal linear ramp over the ramp span.
///
/// For each sample whose value lies on the ramp, the lag is the sample time
/// minus the instant the ideal ramp reaches the same value. `None` when no
/// sample falls inside the ramp span.
pub fn ramp_time_lag(time: &[f64], curve: &[f64], ramp: &Ramp) -> GcvResult<Option<RampLag>> {
    same_len("ramp_time_lag", time, curve)?;
    if !(ramp.duration > 0.0) || ramp.to == ramp.from {
        return Err(GcvError::Validation(format!(
            "ramp needs a positive duration and distinct end values, got {:?}",
            ramp
        )));
    }

    let t_end = ramp.t_start + ramp.duration;
    let mut max_time_lag: Option<f64> = None;
    let mut max_value_error: Option<f64> = None;
    for (&t, &value) in time.iter().zip(curve) {
        if t < ramp.t_start || t > t_end {
            continue;
        }
        let value_error = (value - ramp.value_at(t)).abs();
        max_value_error = Some(max_value_error.map_or(value_error, |m| m.max(value_error)));
        if ramp.contains_value(value) {
            let lag = t - ramp.time_of(value);
            max_time_lag = Some(match max_time_lag {
                Some(m) if m.abs() >= lag.abs() => m,
                _ => lag,
            });
        }
    }

    Ok(max_value_error.map(|max_value_error| RampLag {
        max_time_lag: max_time_lag.unwrap_or(0.0),
        max_value_error,
    }))
}

/// First sample where the active current still increases although the
/// current magnitude is at its rating `imax`.
///
/// Reactive current has priority at the limit, so `Ip` must not grow while
/// `sqrt(Ip² + Iq²) >= imax - tolerance`.
pub fn imax_priority_violation(
    active_current: &[f64],
    reactive_current: &[f64],
    imax: f64,
    tolerance: f64,
) -> GcvResult<Option<usize>> {
    same_len("imax_priority_violation", active_current, reactive_current)?;
    let at_limit = |i: usize| active_current[i].hypot(reactive_current[i]) >= imax - tolerance;
    Ok((1..active_current.len())
        .find(|&i| at_limit(i) && active_current[i] > active_current[i - 1] + tolerance))
}

fn flat_segment(values: &[f64], tolerance: f64) -> Option<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if values.is_empty() || max - min > tolerance {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Whether a curve stays at one level across the event: flat before it,
/// flat after clearing, and never leaving that level in between.
fn undisturbed(curve: &[f64], before: usize, after: usize, tolerance: f64) -> bool {
    let (Some(a), Some(b)) = (
        flat_segment(&curve[..before], tolerance),
        flat_segment(&curve[after..], tolerance),
    ) else {
        return false;
    };
    (a - b).abs() <= tolerance && curve[before..after].iter().all(|v| (v - a).abs() <= tolerance)
}

/// A test is invalid when voltage, active and reactive power all stay at
/// one level before, during and after the event: nothing was exercised.
pub fn is_invalid_test(
    time: &[f64],
    voltage: &[f64],
    active_power: &[f64],
    reactive_power: &[f64],
    t_fault: f64,
    fault_duration: f64,
    tolerance: f64,
) -> GcvResult<bool> {
    same_len("is_invalid_test voltage", time, voltage)?;
    same_len("is_invalid_test active power", time, active_power)?;
    same_len("is_invalid_test reactive power", time, reactive_power)?;

    let before = index_at(time, t_fault);
    let after = index_at(time, t_fault + fault_duration).max(before);
    let invalid = [voltage, active_power, reactive_power]
        .iter()
        .all(|curve| undisturbed(curve, before, after, tolerance));
    if invalid {
        debug!(t_fault, fault_duration, "V, P and Q undisturbed by the event");
    }
    Ok(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seconds(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn stable_tail_example() {
        let time = seconds(9);
        let curve = [1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0, 5.0, 5.0];
        let s = is_stable(&time, &curve, 3.0).unwrap();
        assert!(s.stable);
        assert_eq!(s.onset, Some(4));
    }

    #[test]
    fn increasing_curve_is_not_stable() {
        let time = seconds(9);
        let curve: Vec<f64> = time.iter().map(|t| 0.1 * t).collect();
        assert_eq!(
            is_stable(&time, &curve, 1.0).unwrap(),
            Stability {
                stable: false,
                onset: None
            }
        );
    }

    #[test]
    fn band_is_relative_above_one_pu() {
        let time = seconds(5);
        // 0.2 % of 10 is 0.02: 10.015 is in band, 10.03 is not.
        let curve = [10.03, 10.015, 10.0, 10.0, 10.0];
        let s = is_stable(&time, &curve, 2.0).unwrap();
        assert_eq!(s.onset, Some(1));
        // Below 1 pu the band is absolute.
        let curve = [0.5, 0.503, 0.5015, 0.5, 0.5];
        let s = is_stable(&time, &curve, 2.0).unwrap();
        assert_eq!(s.onset, Some(2));
    }

    #[test]
    fn stability_length_mismatch_is_a_shape_error() {
        assert!(is_stable(&[0.0, 1.0], &[1.0], 1.0).unwrap_err().is_shape());
    }

    #[test]
    fn response_time_example() {
        let time = seconds(5);
        let curve = [0.0, 0.0, 0.9, 1.0, 1.0];
        assert_eq!(response_time(&time, &curve, 1.0, 0.1).unwrap(), Some(1.0));
    }

    #[test]
    fn response_time_without_step_is_none() {
        let time = seconds(4);
        assert_eq!(response_time(&time, &[2.0; 4], 1.0, 0.1).unwrap(), None);
    }

    #[test]
    fn settling_time_after_overshoot() {
        let time = seconds(7);
        let curve = [0.0, 0.0, 1.3, 0.8, 1.04, 1.0, 1.0];
        // 5 % band around 1.0: last excursion at t=3.
        assert_eq!(settling_time(&time, &curve, 1.0, 0.05).unwrap(), Some(3.0));
        assert_eq!(settling_time(&time, &curve, 1.0, 0.5).unwrap(), Some(1.0));
    }

    #[test]
    fn ramp_lag_of_a_delayed_ramp() {
        let time: Vec<f64> = (0..=40).map(|i| i as f64 * 0.25).collect();
        let ramp = Ramp {
            t_start: 2.0,
            duration: 4.0,
            from: 0.0,
            to: 1.0,
        };
        // Same slope, half a second late.
        let curve: Vec<f64> = time
            .iter()
            .map(|&t| ((t - 2.5) / 4.0).clamp(0.0, 1.0))
            .collect();
        let lag = ramp_time_lag(&time, &curve, &ramp).unwrap().unwrap();
        assert!((lag.max_time_lag - 0.5).abs() < 1e-12);
        assert!((lag.max_value_error - 0.125).abs() < 1e-12);
    }

    #[test]
    fn flat_ramp_is_rejected() {
        let ramp = Ramp {
            t_start: 0.0,
            duration: 1.0,
            from: 1.0,
            to: 1.0,
        };
        assert!(ramp_time_lag(&[0.0], &[1.0], &ramp).is_err());
    }

    #[test]
    fn imax_priority() {
        let iq = [0.0, 0.5, 0.92, 0.92, 0.92];
        let ok_ip = [0.8, 0.7, 0.43, 0.40, 0.40];
        assert_eq!(imax_priority_violation(&ok_ip, &iq, 1.0, 1e-3).unwrap(), None);
        let bad_ip = [0.8, 0.7, 0.43, 0.40, 0.45];
        assert_eq!(imax_priority_violation(&bad_ip, &iq, 1.0, 1e-3).unwrap(), Some(4));
    }

    #[test]
    fn invalid_test_detection() {
        let time = seconds(10);
        let flat = [1.0; 10];
        assert!(is_invalid_test(&time, &flat, &flat, &flat, 4.0, 1.0, 1e-3).unwrap());

        let mut dip = flat;
        dip[4] = 0.5;
        // Recovered dip: flat on both sides but disturbed during the fault.
        assert!(!is_invalid_test(&time, &flat, &flat, &dip, 4.0, 1.0, 1e-3).unwrap());

        let mut step = flat;
        for v in &mut step[5..] {
            *v = 0.8;
        }
        assert!(!is_invalid_test(&time, &flat, &step, &flat, 4.0, 1.0, 1e-3).unwrap());

        let mut noisy = flat;
        noisy[8] = 1.1;
        assert!(!is_invalid_test(&time, &noisy, &flat, &flat, 4.0, 1.0, 1e-3).unwrap());
    }
}
