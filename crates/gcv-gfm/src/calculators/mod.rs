//! Closed-form envelope calculators, one per grid-forming test.

mod amplitude_step;
mod phase_jump;
mod rocof;
mod scr_jump;

pub use amplitude_step::AmplitudeStep;
pub use phase_jump::PhaseJump;
pub use rocof::Rocof;
pub use scr_jump::ScrJump;

use std::fmt;
use std::str::FromStr;

use gcv_core::{GcvError, GcvResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dynamics::{SwingModel, SystemParams};
use crate::envelope::{bounds, Envelope, Magnitude};
use crate::params::GfmParams;

/// Grid-forming test types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GfmTest {
    PhaseJump,
    AmplitudeStep,
    Rocof,
    ScrJump,
}

impl GfmTest {
    pub const ALL: [GfmTest; 4] = [
        GfmTest::PhaseJump,
        GfmTest::AmplitudeStep,
        GfmTest::Rocof,
        GfmTest::ScrJump,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GfmTest::PhaseJump => "phase-jump",
            GfmTest::AmplitudeStep => "amplitude-step",
            GfmTest::Rocof => "rocof",
            GfmTest::ScrJump => "scr-jump",
        }
    }
}

impl fmt::Display for GfmTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GfmTest {
    type Err = GcvError;

    fn from_str(input: &str) -> GcvResult<Self> {
        let normalized = input.trim().to_ascii_lowercase().replace('_', "-");
        GfmTest::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                GcvError::Parse(format!(
                    "unknown grid-forming test '{}'; expected phase-jump, amplitude-step, rocof or scr-jump",
                    input
                ))
            })
    }
}

/// Theoretical response of a grid-forming unit to one disturbance type.
pub trait EnvelopeCalculator: Send + Sync {
    fn test(&self) -> GfmTest;

    fn magnitude(&self) -> Magnitude;

    /// Dynamics governing the response after the event.
    fn model(&self, params: &GfmParams, system: &SystemParams) -> GcvResult<SwingModel> {
        SwingModel::new(params.p0, params.u0, params.f0, system)
    }

    /// Deviation from the initial operating point `elapsed` seconds after
    /// the event (`elapsed >= 0`).
    fn center(&self, params: &GfmParams, model: &SwingModel, elapsed: f64) -> f64;

    /// Theoretical response and envelopes over `time`; zero before
    /// `event_time`.
    fn calculate_envelopes(
        &self,
        params: &GfmParams,
        damping: f64,
        inertia: f64,
        xeff: f64,
        time: &[f64],
        event_time: f64,
    ) -> GcvResult<Envelope> {
        params.validate()?;
        let system = SystemParams {
            damping,
            inertia,
            xeff,
        };
        let model = self.model(params, &system)?;
        let regime = model.regime();
        debug!(
            test = %self.test(),
            %regime,
            zeta = model.zeta,
            omega_n = model.omega_n,
            "grid-forming response model"
        );

        let center: Vec<f64> = time
            .iter()
            .map(|&t| {
                let elapsed = t - event_time;
                if elapsed < 0.0 {
                    0.0
                } else {
                    self.center(params, &model, elapsed)
                }
            })
            .collect();
        let (upper, lower) = bounds(&center, params);

        Ok(Envelope {
            regime,
            magnitude: self.magnitude(),
            time: time.to_vec(),
            center,
            upper,
            lower,
        })
    }
}

/// Calculator for `test`.
pub fn calculator(test: GfmTest) -> Box<dyn EnvelopeCalculator> {
    match test {
        GfmTest::PhaseJump => Box::new(PhaseJump),
        GfmTest::AmplitudeStep => Box::new(AmplitudeStep),
        GfmTest::Rocof => Box::new(Rocof),
        GfmTest::ScrJump => Box::new(ScrJump),
    }
}

/// Uniform time axis `[0, t_end]` with step `dt`.
pub fn time_axis(t_end: f64, dt: f64) -> GcvResult<Vec<f64>> {
    if !(dt.is_finite() && dt > 0.0) || !(t_end.is_finite() && t_end >= 0.0) {
        return Err(GcvError::Validation(format!(
            "time axis needs dt > 0 and t_end >= 0, got dt={} t_end={}",
            dt, t_end
        )));
    }
    let n = (t_end / dt + 1e-9).floor() as usize;
    Ok((0..=n).map(|i| i as f64 * dt).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for test in GfmTest::ALL {
            assert_eq!(test.as_str().parse::<GfmTest>().unwrap(), test);
            assert_eq!(calculator(test).test(), test);
        }
        assert_eq!("SCR_JUMP".parse::<GfmTest>().unwrap(), GfmTest::ScrJump);
        assert!("frequency-step".parse::<GfmTest>().is_err());
    }

    #[test]
    fn response_is_zero_before_the_event() {
        let time = time_axis(2.0, 0.01).unwrap();
        let params = GfmParams::default();
        for test in GfmTest::ALL {
            let env = calculator(test)
                .calculate_envelopes(&params, 100.0, 5.0, 0.2, &time, 1.0)
                .unwrap();
            assert_eq!(env.len(), time.len());
            for i in 0..100 {
                assert_eq!(env.center[i], 0.0, "{test}");
                assert!(env.upper[i] > 0.0 && env.lower[i] < 0.0);
            }
        }
    }

    #[test]
    fn bounds_enclose_the_center() {
        let time = time_axis(3.0, 0.005).unwrap();
        let params = GfmParams::default();
        for test in GfmTest::ALL {
            for damping in [20.0, 5000.0] {
                let env = calculator(test)
                    .calculate_envelopes(&params, damping, 4.0, 0.25, &time, 0.5)
                    .unwrap();
                for i in 0..env.len() {
                    assert!(env.lower[i] <= env.center[i] && env.center[i] <= env.upper[i]);
                }
                assert_eq!(env.violations(&env.center).count(), 0);
            }
        }
    }

    #[test]
    fn time_axis_includes_end() {
        let axis = time_axis(1.0, 0.1).unwrap();
        assert_eq!(axis.len(), 11);
        assert!((axis[10] - 1.0).abs() < 1e-12);
        assert!(time_axis(1.0, 0.0).is_err());
    }
}
