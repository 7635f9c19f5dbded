use crate::dynamics::SwingModel;
use crate::envelope::Magnitude;
use crate::params::GfmParams;

use super::{EnvelopeCalculator, GfmTest};

/// Linear frequency ramp of `rocof_hz_per_s`.
///
/// Following the accelerating grid costs inertial power
/// `-2H·(rocof/f0)`, reached along the step response `1 - h(t)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rocof;

impl EnvelopeCalculator for Rocof {
    fn test(&self) -> GfmTest {
        GfmTest::Rocof
    }

    fn magnitude(&self) -> Magnitude {
        Magnitude::ActivePower
    }

    fn center(&self, params: &GfmParams, model: &SwingModel, elapsed: f64) -> f64 {
        let steady = -2.0 * model.inertia * params.rocof_hz_per_s / params.f0;
        steady * (1.0 - model.free_response(elapsed))
    }
}
