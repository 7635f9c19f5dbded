//! # gcv-core: shared types for grid-code compliance validation
//!
//! Provides the building blocks used by every stage that scores a dynamic
//! simulation against a reference:
//!
//! - [`TimeSeries`]: strictly increasing `(time, value)` samples
//! - [`Signal`], [`Window`], [`MetricKind`]: keys of the result tables
//! - [`ValidationConfig`]: thresholds, exclusion margins and filter settings,
//!   passed explicitly to each stage
//! - [`GcvError`] / [`GcvResult`]: the error taxonomy
//! - [`diagnostics`]: per-scenario warnings that do not abort a run
//! - [`solver`]: small dense linear-system backends (Gauss, faer LU)
//!
//! ## Quick Start
//!
//! ```
//! use gcv_core::{TimeSeries, ValidationConfig};
//!
//! let series = TimeSeries::new(vec![0.0, 0.5, 0.5, 1.0], vec![1.0, 1.0, 2.0, 1.0]).unwrap();
//! assert_eq!(series.len(), 3); // duplicate timestamp collapsed
//!
//! let config = ValidationConfig::default();
//! assert_eq!(config.resampling.fs_hz, 1000.0);
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod signal;
pub mod solver;
pub mod timeseries;

pub use config::{
    ExtractorConfig, FilterConfig, FilterKind, MetricThresholds, PaddingMethod, ResamplingConfig,
    ThresholdConfig, ThresholdOverride, ValidationConfig, WindowConfig, WindowThresholds,
};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GcvError, GcvResult};
pub use signal::{MetricKind, Signal, Window};
pub use solver::*;
pub use timeseries::TimeSeries;
