//! Low-pass filter stage.
//!
//! Removes high-frequency simulation noise before curves are compared. The
//! filter is applied forward and backward so timing-sensitive metrics see
//! no group delay.

pub mod design;
pub mod filtfilt;

pub use design::{FilterDesign, CHEBYSHEV_RIPPLE_DB, IMPULSE_RESPONSE_EPS};
pub use filtfilt::{filtfilt_gustafsson, filtfilt_padded, lfilter, lfilter_zi};

use gcv_core::{
    FilterConfig, FilterKind, GcvResult, LinearSystemBackend, PaddingMethod, SolverKind,
    TimeSeries,
};
use tracing::debug;

/// Filtered samples smaller than this are snapped to exactly zero.
pub const ZERO_SNAP: f64 = 1e-10;

/// Zero-phase low-pass filter of `series` with the default linear solver.
///
/// Constant series are returned unchanged.
pub fn filter_signal(
    series: &TimeSeries,
    cutoff_hz: f64,
    fs_hz: f64,
    kind: FilterKind,
    padding: PaddingMethod,
) -> GcvResult<TimeSeries> {
    let backend = SolverKind::default().build_solver();
    filter_with_backend(series, cutoff_hz, fs_hz, kind, padding, None, backend.as_ref())
}

/// Filter stage driven by the configuration; a disabled filter is a
/// passthrough.
pub fn apply_filter_config(
    series: &TimeSeries,
    config: &FilterConfig,
    fs_hz: f64,
) -> GcvResult<TimeSeries> {
    if !config.enabled {
        return Ok(series.clone());
    }
    let backend = config.solver.build_solver();
    filter_with_backend(
        series,
        config.cutoff_hz,
        fs_hz,
        config.kind,
        config.padding,
        config.padlen,
        backend.as_ref(),
    )
}

fn filter_with_backend(
    series: &TimeSeries,
    cutoff_hz: f64,
    fs_hz: f64,
    kind: FilterKind,
    padding: PaddingMethod,
    padlen: Option<usize>,
    backend: &dyn LinearSystemBackend,
) -> GcvResult<TimeSeries> {
    if series.is_constant() {
        debug!(len = series.len(), "constant signal, filter skipped");
        return Ok(series.clone());
    }
    let design = FilterDesign::lowpass(kind, cutoff_hz, fs_hz)?;

    let filtered = match padding {
        PaddingMethod::Gustafsson => filtfilt_gustafsson(
            &design,
            series.values(),
            design.impulse_response_length(),
            backend,
        )?,
        method => filtfilt_padded(&design, series.values(), method, padlen, backend)?,
    };
    let cleaned = filtered
        .into_iter()
        .map(|y| if y.abs() < ZERO_SNAP { 0.0 } else { y })
        .collect();

    debug!(?kind, ?padding, cutoff_hz, fs_hz, "signal filtered");
    series.with_values(cleaned)
}
