//! Validation configuration.
//!
//! Every tunable of the comparison pipeline lives in [`ValidationConfig`],
//! which is passed explicitly to each stage. Two scenarios can therefore run
//! side by side with different thresholds, and tests can build the exact
//! configuration they need.
//!
//! Files may be TOML or JSON; every field has a default so a partial file
//! only overrides what it names:
//!
//! ```toml
//! [filter]
//! kind = "butterworth"
//! cutoff_hz = 10.0
//!
//! [windows]
//! t_integrator_tol = 0.002
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GcvError, GcvResult};
use crate::signal::{Signal, Window};
use crate::solver::SolverKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub resampling: ResamplingConfig,
    pub filter: FilterConfig,
    pub windows: WindowConfig,
    pub thresholds: ThresholdConfig,
    pub extractors: ExtractorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResamplingConfig {
    /// Common sampling frequency of resampled curve pairs, in Hz.
    pub fs_hz: f64,
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        Self { fs_hz: 1000.0 }
    }
}

/// Second-order low-pass filter family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    #[default]
    CriticallyDamped,
    Bessel,
    Butterworth,
    Chebyshev1,
}

/// Edge handling for forward-backward filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingMethod {
    #[default]
    Gustafsson,
    Odd,
    Even,
    Constant,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// When false, signals pass through the filter stage unchanged.
    pub enabled: bool,
    pub kind: FilterKind,
    pub cutoff_hz: f64,
    pub padding: PaddingMethod,
    /// Overrides the extension length for odd/even/constant padding.
    pub padlen: Option<usize>,
    /// Backend for the small linear systems of the edge treatment.
    pub solver: SolverKind,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: FilterKind::CriticallyDamped,
            cutoff_hz: 15.0,
            padding: PaddingMethod::Gustafsson,
            padlen: None,
            solver: SolverKind::Faer,
        }
    }
}

/// Exclusion margins (seconds) around the event instants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Tolerance for the integrator's handling of discontinuities.
    pub t_integrator_tol: f64,
    /// Margin before the fault kept free of filter pre-ringing.
    pub t_fault_lpf_excl: f64,
    /// Quasi-static exclusion after the fault instant.
    pub t_fault_qs_excl: f64,
    /// Quasi-static exclusion after the clearing instant.
    pub t_clear_qs_excl: f64,
    pub t_window_lpf_excl_start: f64,
    pub t_window_lpf_excl_end: f64,
    /// Mandated observation span before the event.
    pub pre_event_window: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            t_integrator_tol: 0.0,
            t_fault_lpf_excl: 0.050,
            t_fault_qs_excl: 0.020,
            t_clear_qs_excl: 0.060,
            t_window_lpf_excl_start: 0.100,
            t_window_lpf_excl_end: 0.050,
            pre_event_window: 1.0,
        }
    }
}

/// Maximum allowed value for each normalized error statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricThresholds {
    pub mxe: f64,
    pub me: f64,
    pub mae: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowThresholds {
    pub before: MetricThresholds,
    pub during: MetricThresholds,
    pub after: MetricThresholds,
}

impl WindowThresholds {
    pub fn get(&self, window: Window) -> MetricThresholds {
        match window {
            Window::Before => self.before,
            Window::During => self.during,
            Window::After => self.after,
        }
    }
}

/// Threshold for one specific (signal, window, reference kind) key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOverride {
    pub signal: Signal,
    pub window: Window,
    #[serde(default)]
    pub field_measurement: bool,
    #[serde(flatten)]
    pub thresholds: MetricThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Limits when the reference is another simulation.
    pub simulation: WindowThresholds,
    /// Limits when the reference is a field measurement (instrument noise).
    pub field: WindowThresholds,
    pub overrides: Vec<ThresholdOverride>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let t = |mxe, me, mae| MetricThresholds { mxe, me, mae };
        Self {
            simulation: WindowThresholds {
                before: t(0.05, 0.02, 0.03),
                during: t(0.08, 0.05, 0.07),
                after: t(0.05, 0.02, 0.03),
            },
            field: WindowThresholds {
                before: t(0.08, 0.05, 0.07),
                during: t(0.15, 0.10, 0.12),
                after: t(0.08, 0.05, 0.07),
            },
            overrides: Vec::new(),
        }
    }
}

impl ThresholdConfig {
    /// Thresholds for a (window, signal, reference kind) key; a matching
    /// override wins over the per-window defaults.
    pub fn lookup(&self, window: Window, signal: Signal, field: bool) -> MetricThresholds {
        self.overrides
            .iter()
            .find(|o| o.window == window && o.signal == signal && o.field_measurement == field)
            .map(|o| o.thresholds)
            .unwrap_or_else(|| {
                if field {
                    self.field.get(window)
                } else {
                    self.simulation.get(window)
                }
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Span at the end of a curve that must stay in band to call it stable.
    pub stable_time: f64,
    /// Peak-to-peak tolerance under which a curve segment counts as flat.
    pub flat_tolerance: f64,
    /// Share of the total step change that marks the response instant.
    pub response_fraction: f64,
    /// Band around the final value, relative to the step, for settling.
    pub settling_tolerance: f64,
    /// Current rating in pu; the reactive-priority check runs only when set.
    pub imax: Option<f64>,
    /// Tolerance used when comparing currents against the rating.
    pub imax_tolerance: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            stable_time: 1.0,
            flat_tolerance: 1e-3,
            response_fraction: 0.1,
            settling_tolerance: 0.05,
            imax: None,
            imax_tolerance: 1e-3,
        }
    }
}

impl ValidationConfig {
    /// Load a configuration file; the format follows the extension
    /// (`.json` or TOML otherwise).
    pub fn load_from(path: &Path) -> GcvResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => serde_json::from_str(&contents)?,
            _ => toml::from_str(&contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> GcvResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that would make the numerical stages meaningless.
    pub fn validate(&self) -> GcvResult<()> {
        if !(self.resampling.fs_hz.is_finite() && self.resampling.fs_hz > 0.0) {
            return Err(GcvError::Config(format!(
                "resampling.fs_hz must be positive, got {}",
                self.resampling.fs_hz
            )));
        }
        let nyquist = self.resampling.fs_hz / 2.0;
        if self.filter.enabled && !(self.filter.cutoff_hz > 0.0 && self.filter.cutoff_hz < nyquist)
        {
            return Err(GcvError::Config(format!(
                "filter.cutoff_hz must lie in (0, {}) Hz, got {}",
                nyquist, self.filter.cutoff_hz
            )));
        }
        let w = &self.windows;
        let margins = [
            ("t_integrator_tol", w.t_integrator_tol),
            ("t_fault_lpf_excl", w.t_fault_lpf_excl),
            ("t_fault_qs_excl", w.t_fault_qs_excl),
            ("t_clear_qs_excl", w.t_clear_qs_excl),
            ("t_window_lpf_excl_start", w.t_window_lpf_excl_start),
            ("t_window_lpf_excl_end", w.t_window_lpf_excl_end),
            ("pre_event_window", w.pre_event_window),
        ];
        if let Some((name, value)) = margins.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(GcvError::Config(format!(
                "windows.{} must be a non-negative number, got {}",
                name, value
            )));
        }
        let e = &self.extractors;
        if !(e.stable_time >= 0.0) {
            return Err(GcvError::Config("extractors.stable_time must be >= 0".into()));
        }
        let fractions = [
            ("response_fraction", e.response_fraction),
            ("settling_tolerance", e.settling_tolerance),
        ];
        if let Some((name, value)) = fractions.iter().find(|(_, v)| !(*v > 0.0 && *v < 1.0)) {
            return Err(GcvError::Config(format!(
                "extractors.{} must lie in (0, 1), got {}",
                name, value
            )));
        }
        if let Some(imax) = e.imax.filter(|i| !(i.is_finite() && *i > 0.0)) {
            return Err(GcvError::Config(format!(
                "extractors.imax must be positive, got {}",
                imax
            )));
        }
        if !(e.imax_tolerance >= 0.0) {
            return Err(GcvError::Config(
                "extractors.imax_tolerance must be >= 0".into(),
            ));
        }
        Ok(())
    }
}
