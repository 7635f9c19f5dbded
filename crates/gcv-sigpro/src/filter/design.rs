//! Second-order low-pass designs via the bilinear transform.
//!
//! Every family is first written as an analog prototype
//! `c / (s² + a1·s + a0)` with unity DC gain (`c = a0`) and its cutoff at
//! 1 rad/s (the −3 dB point, or the ripple band edge for Chebyshev I). The
//! prototype is
//! scaled to the pre-warped cutoff `Ωc = 2·fs·tan(π·fc/fs)` and mapped with
//! `s = 2·fs·(1 − z⁻¹)/(1 + z⁻¹)`, so the digital response at `fc` equals
//! the analog response at `Ωc` exactly.

use std::f64::consts::{PI, SQRT_2};

use gcv_core::{FilterKind, GcvError, GcvResult};
use num_complex::Complex64;

/// Passband ripple of the Chebyshev type I design, in dB.
pub const CHEBYSHEV_RIPPLE_DB: f64 = 5.0;

/// Relative amplitude below which the impulse response is considered gone.
pub const IMPULSE_RESPONSE_EPS: f64 = 1e-9;

/// Digital biquad `H(z) = (b0 + b1 z⁻¹ + b2 z⁻²) / (1 + a1 z⁻¹ + a2 z⁻²)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterDesign {
    pub kind: FilterKind,
    /// Numerator coefficients [b0, b1, b2]
    pub b: [f64; 3],
    /// Denominator coefficients [1, a1, a2]
    pub a: [f64; 3],
}

/// Analog prototype `c / (s² + a1 s + a0)` with cutoff at 1 rad/s and
/// `c = a0`.
struct Prototype {
    c: f64,
    a1: f64,
    a0: f64,
}

fn prototype(kind: FilterKind) -> Prototype {
    match kind {
        FilterKind::CriticallyDamped => {
            // (s + k)² is 3 dB down at ω = k·√(√2 − 1); choose k so that is 1.
            let k = 1.0 / (SQRT_2 - 1.0).sqrt();
            Prototype {
                c: k * k,
                a1: 2.0 * k,
                a0: k * k,
            }
        }
        FilterKind::Butterworth => Prototype {
            c: 1.0,
            a1: SQRT_2,
            a0: 1.0,
        },
        FilterKind::Bessel => {
            // Reverse Bessel polynomial s² + 3s + 3, rescaled so |H(j1)| = 1/√2.
            let w = ((45.0_f64.sqrt() - 3.0) / 2.0).sqrt();
            Prototype {
                c: 3.0 / (w * w),
                a1: 3.0 / w,
                a0: 3.0 / (w * w),
            }
        }
        FilterKind::Chebyshev1 => {
            let eps = (10.0_f64.powf(CHEBYSHEV_RIPPLE_DB / 10.0) - 1.0).sqrt();
            let mu = (1.0 / eps).asinh() / 2.0;
            let theta = PI / 4.0;
            let re = -mu.sinh() * theta.sin();
            let im = mu.cosh() * theta.cos();
            let a0 = re * re + im * im;
            // Even order: DC and the band edge sit at the bottom of the
            // ripple band, so unity DC gain puts the ripple above 0 dB.
            Prototype {
                c: a0,
                a1: -2.0 * re,
                a0,
            }
        }
    }
}

impl FilterDesign {
    /// Design a second-order low-pass at `cutoff_hz` for sampling rate `fs_hz`.
    pub fn lowpass(kind: FilterKind, cutoff_hz: f64, fs_hz: f64) -> GcvResult<Self> {
        if !(fs_hz.is_finite() && fs_hz > 0.0) {
            return Err(GcvError::Validation(format!(
                "sampling frequency must be positive, got {}",
                fs_hz
            )));
        }
        if !(cutoff_hz > 0.0 && cutoff_hz < fs_hz / 2.0) {
            return Err(GcvError::Validation(format!(
                "cutoff {} Hz must lie strictly between 0 and Nyquist ({} Hz)",
                cutoff_hz,
                fs_hz / 2.0
            )));
        }

        let proto = prototype(kind);
        let k = 2.0 * fs_hz;
        let wc = k * (PI * cutoff_hz / fs_hz).tan();

        let num = proto.c * wc * wc;
        let a1 = proto.a1 * wc;
        let a0 = proto.a0 * wc * wc;

        let k2 = k * k;
        let d = k2 + a1 * k + a0;
        Ok(Self {
            kind,
            b: [num / d, 2.0 * num / d, num / d],
            a: [1.0, (2.0 * a0 - 2.0 * k2) / d, (k2 - a1 * k + a0) / d],
        })
    }

    /// Complex response at `freq_hz`.
    pub fn frequency_response(&self, freq_hz: f64, fs_hz: f64) -> Complex64 {
        let omega = 2.0 * PI * freq_hz / fs_hz;
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b[0] + self.b[1] * z1 + self.b[2] * z2;
        let den = self.a[0] + self.a[1] * z1 + self.a[2] * z2;
        num / den
    }

    pub fn magnitude_db(&self, freq_hz: f64, fs_hz: f64) -> f64 {
        20.0 * self.frequency_response(freq_hz, fs_hz).norm().log10()
    }

    /// Roots of `z² + a1 z + a2`.
    pub fn poles(&self) -> [Complex64; 2] {
        let (a1, a2) = (self.a[1], self.a[2]);
        let disc = Complex64::new(a1 * a1 - 4.0 * a2, 0.0).sqrt();
        [(-a1 + disc) / 2.0, (-a1 - disc) / 2.0]
    }

    /// Number of samples after which the impulse response has decayed below
    /// [`IMPULSE_RESPONSE_EPS`]; `None` for a marginally stable design.
    pub fn impulse_response_length(&self) -> Option<usize> {
        let radius = self
            .poles()
            .iter()
            .map(|p| p.norm())
            .fold(0.0_f64, f64::max);
        if radius >= 1.0 {
            return None;
        }
        if radius <= f64::EPSILON {
            return Some(1);
        }
        let len = (IMPULSE_RESPONSE_EPS.ln() / radius.ln()).ceil();
        Some((len as usize).max(1))
    }

    /// Steady-state gain at DC.
    pub fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }
}
