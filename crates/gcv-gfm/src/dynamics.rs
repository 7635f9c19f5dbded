//! Linearized swing equation of a grid-forming converter.
//!
//! Around the operating angle δ0 the converter behaves as
//!
//! ```text
//! (2H/ωb)·δ'' + (D/ωb)·δ' + K·δ = disturbance,   K = u0²·cos δ0 / Xeff
//! ```
//!
//! so `ωn = √(K·ωb / 2H)` and `ζ = D / (4·H·ωn)`.

use std::f64::consts::PI;

use gcv_core::{GcvError, GcvResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Damping ratios this close to 1 use the critically damped closed form.
const CRITICAL_EPS: f64 = 1e-9;

/// Physical regime of the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// ζ >= 1: monotone decay (critical damping included).
    Overdamped,
    /// ζ < 1: decaying oscillation.
    Underdamped,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Overdamped => "overdamped",
            Regime::Underdamped => "underdamped",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Damping D, inertia H and effective reactance Xeff of the converter and
/// its connection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemParams {
    pub damping: f64,
    pub inertia: f64,
    pub xeff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingModel {
    /// Operating angle, rad.
    pub delta0: f64,
    /// Synchronizing power coefficient, pu/rad.
    pub k: f64,
    pub omega_n: f64,
    pub zeta: f64,
    /// Inertia constant H, s.
    pub inertia: f64,
    /// Effective reactance the model was built for.
    pub xeff: f64,
    /// Pre-event over modelled reactance; 1 unless the grid itself changes.
    pub xeff_ratio: f64,
}

impl SwingModel {
    pub fn new(p0: f64, u0: f64, f0: f64, system: &SystemParams) -> GcvResult<Self> {
        let SystemParams {
            damping,
            inertia,
            xeff,
        } = *system;
        if !(xeff.is_finite() && xeff > 0.0) {
            return Err(GcvError::Validation(format!(
                "effective reactance must be positive, got {}",
                xeff
            )));
        }
        if !(inertia.is_finite() && inertia > 0.0) {
            return Err(GcvError::Validation(format!(
                "inertia constant must be positive, got {}",
                inertia
            )));
        }
        if !(damping.is_finite() && damping >= 0.0) {
            return Err(GcvError::Validation(format!(
                "damping must be non-negative, got {}",
                damping
            )));
        }

        let sin_delta0 = p0 * xeff / (u0 * u0);
        if sin_delta0.abs() >= 1.0 {
            return Err(GcvError::Numerical(format!(
                "no stable operating angle: p0·Xeff/u0² = {:.3}",
                sin_delta0
            )));
        }
        let delta0 = sin_delta0.asin();
        let k = u0 * u0 * delta0.cos() / xeff;
        let omega_b = 2.0 * PI * f0;
        let omega_n = (k * omega_b / (2.0 * inertia)).sqrt();
        let zeta = damping / (4.0 * inertia * omega_n);
        Ok(Self {
            delta0,
            k,
            omega_n,
            zeta,
            inertia,
            xeff,
            xeff_ratio: 1.0,
        })
    }

    pub fn regime(&self) -> Regime {
        if self.zeta < 1.0 {
            Regime::Underdamped
        } else {
            Regime::Overdamped
        }
    }

    /// Free response `h(t)` with `h(0) = 1` and `h'(0) = 0`; zero before 0.
    pub fn free_response(&self, t: f64) -> f64 {
        if t < 0.0 {
            return 0.0;
        }
        let (wn, z) = (self.omega_n, self.zeta);
        if (z - 1.0).abs() < CRITICAL_EPS {
            (1.0 + wn * t) * (-wn * t).exp()
        } else if z < 1.0 {
            let root = (1.0 - z * z).sqrt();
            let wd = wn * root;
            (-z * wn * t).exp() * ((wd * t).cos() + z / root * (wd * t).sin())
        } else {
            let root = (z * z - 1.0).sqrt();
            let r1 = -wn * (z - root);
            let r2 = -wn * (z + root);
            (r2 * (r1 * t).exp() - r1 * (r2 * t).exp()) / (r2 - r1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(damping: f64) -> SwingModel {
        SwingModel::new(
            0.5,
            1.0,
            50.0,
            &SystemParams {
                damping,
                inertia: 5.0,
                xeff: 0.2,
            },
        )
        .unwrap()
    }

    #[test]
    fn free_response_starts_at_one_with_zero_slope() {
        for damping in [10.0, 200.0, 2000.0] {
            let m = model(damping);
            assert!((m.free_response(0.0) - 1.0).abs() < 1e-12);
            let dt = 1e-7;
            let slope = (m.free_response(dt) - m.free_response(0.0)) / dt;
            assert!(slope.abs() < 1e-2, "{:?}: slope {slope}", m.regime());
            assert!(m.free_response(20.0).abs() < 1e-3);
        }
    }

    #[test]
    fn regime_follows_damping_ratio() {
        assert_eq!(model(10.0).regime(), Regime::Underdamped);
        assert_eq!(model(2000.0).regime(), Regime::Overdamped);
    }

    #[test]
    fn critical_damping_is_overdamped_and_continuous() {
        let base = model(0.0);
        // D giving ζ = 1 exactly.
        let critical_d = 4.0 * 5.0 * base.omega_n;
        let critical = model(critical_d);
        assert_eq!(critical.regime(), Regime::Overdamped);
        let slightly_over = model(critical_d * (1.0 + 1e-6));
        for t in [0.01, 0.05, 0.2] {
            let a = critical.free_response(t);
            let b = slightly_over.free_response(t);
            assert!((a - b).abs() < 1e-4, "t={t}: {a} vs {b}");
        }
    }

    #[test]
    fn underdamped_response_overshoots() {
        let m = model(10.0);
        let min = (0..2000)
            .map(|i| m.free_response(i as f64 * 1e-3))
            .fold(f64::INFINITY, f64::min);
        assert!(min < 0.0);
        let over = model(2000.0);
        assert!((0..2000).all(|i| over.free_response(i as f64 * 1e-3) >= 0.0));
    }

    #[test]
    fn operating_point_beyond_stability_limit_is_rejected() {
        let system = SystemParams {
            damping: 10.0,
            inertia: 5.0,
            xeff: 2.5,
        };
        assert!(matches!(
            SwingModel::new(0.5, 1.0, 50.0, &system),
            Err(GcvError::Numerical(_))
        ));
    }
}
