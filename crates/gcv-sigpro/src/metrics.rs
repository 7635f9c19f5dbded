//! Normalized error statistics between a simulated and a reference window.
//!
//! Every statistic is divided by the step magnitude of the event so that
//! voltages, powers and currents can be judged against the same thresholds.

use gcv_core::{GcvError, GcvResult, MetricKind, MetricThresholds};
use serde::{Deserialize, Serialize};

fn check_inputs(context: &str, simulated: &[f64], reference: &[f64], step: f64) -> GcvResult<()> {
    if simulated.len() != reference.len() {
        return Err(GcvError::shape(context, simulated.len(), reference.len()));
    }
    if !(step.is_finite() && step > 0.0) {
        return Err(GcvError::Validation(format!(
            "{}: step magnitude must be positive, got {}",
            context, step
        )));
    }
    Ok(())
}

fn differences<'a>(simulated: &'a [f64], reference: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
    simulated.iter().zip(reference).map(|(s, r)| s - r)
}

/// `max |s - r| / step`, 0 for empty windows.
pub fn maximum_error(simulated: &[f64], reference: &[f64], step_magnitude: f64) -> GcvResult<f64> {
    check_inputs("maximum_error", simulated, reference, step_magnitude)?;
    let max = differences(simulated, reference)
        .map(f64::abs)
        .fold(0.0_f64, f64::max);
    Ok(max / step_magnitude)
}

/// Signed `mean(s - r) / step`; detects a systematic bias.
pub fn mean_error(simulated: &[f64], reference: &[f64], step_magnitude: f64) -> GcvResult<f64> {
    check_inputs("mean_error", simulated, reference, step_magnitude)?;
    if simulated.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = differences(simulated, reference).sum();
    Ok(sum / simulated.len() as f64 / step_magnitude)
}

/// `mean |s - r| / step`, 0 for empty windows.
pub fn mean_absolute_error(
    simulated: &[f64],
    reference: &[f64],
    step_magnitude: f64,
) -> GcvResult<f64> {
    check_inputs("mean_absolute_error", simulated, reference, step_magnitude)?;
    if simulated.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = differences(simulated, reference).map(f64::abs).sum();
    Ok(sum / simulated.len() as f64 / step_magnitude)
}

/// Error statistics of one (signal, window) pair with their pass flags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub max_error: f64,
    pub mean_error: f64,
    pub mean_absolute_error: f64,
    pub max_error_check: bool,
    pub mean_error_check: bool,
    pub mean_absolute_error_check: bool,
    /// Conjunction of the three checks.
    pub check: bool,
    /// Number of samples the statistics were computed on.
    pub samples: usize,
}

impl ErrorMetrics {
    pub fn value(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::MaxError => self.max_error,
            MetricKind::MeanError => self.mean_error,
            MetricKind::MeanAbsoluteError => self.mean_absolute_error,
        }
    }

    pub fn passed(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::MaxError => self.max_error_check,
            MetricKind::MeanError => self.mean_error_check,
            MetricKind::MeanAbsoluteError => self.mean_absolute_error_check,
        }
    }
}

/// Compute all three statistics and compare them with `thresholds`.
///
/// The mean error is signed; its magnitude is compared.
pub fn compute_metrics(
    simulated: &[f64],
    reference: &[f64],
    step_magnitude: f64,
    thresholds: &MetricThresholds,
) -> GcvResult<ErrorMetrics> {
    let max_error = maximum_error(simulated, reference, step_magnitude)?;
    let mean = mean_error(simulated, reference, step_magnitude)?;
    let mae = mean_absolute_error(simulated, reference, step_magnitude)?;

    let max_error_check = max_error < thresholds.mxe;
    let mean_error_check = mean.abs() < thresholds.me;
    let mean_absolute_error_check = mae < thresholds.mae;
    Ok(ErrorMetrics {
        max_error,
        mean_error: mean,
        mean_absolute_error: mae,
        max_error_check,
        mean_error_check,
        mean_absolute_error_check,
        check: max_error_check && mean_error_check && mean_absolute_error_check,
        samples: simulated.len(),
    })
}
