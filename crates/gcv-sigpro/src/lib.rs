//! # gcv-sigpro: curve comparison engine
//!
//! Scores a simulated response against a reference response:
//!
//! 1. [`resample`]: both curves onto one uniform grid (PCHIP)
//! 2. [`filter`]: zero-phase second-order low-pass, edge-artifact aware
//! 3. [`windows`]: before / during / after-event index ranges
//! 4. [`metrics`]: normalized max, mean and mean-absolute errors with
//!    threshold checks
//!
//! [`extractors`] computes whole-curve indicators (stability, response
//! time, ramp lag, current-limit priority, invalid-test detection).
//! [`pipeline::compare_curves`] chains everything for one scenario and
//! returns a [`pipeline::ScenarioOutcome`].
//!
//! ```
//! use gcv_sigpro::metrics::mean_absolute_error;
//!
//! let mae = mean_absolute_error(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 2.0, 2.0], 2.0).unwrap();
//! assert_eq!(mae, 0.375);
//! ```

pub mod curves;
pub mod extractors;
pub mod filter;
pub mod metrics;
pub mod pipeline;
pub mod resample;
pub mod windows;

pub use curves::{
    curve_source, CsvCurves, CurveSet, CurveSource, CurveSourceSpec, EventMetadata,
    SimulatedCurves,
};
pub use filter::{apply_filter_config, filter_signal, FilterDesign};
pub use metrics::{compute_metrics, ErrorMetrics};
pub use pipeline::{
    compare_curves, evaluate_sources, ComparisonReport, ComparisonRequest, MetricTable,
    ScenarioOutcome,
};
pub use resample::{resample_pair, resample_uniform, Pchip};
pub use windows::{compute_windows, IndexWindow, WindowOutcome, WindowSpec};
