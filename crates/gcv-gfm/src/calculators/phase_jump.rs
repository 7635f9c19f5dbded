use crate::dynamics::SwingModel;
use crate::envelope::Magnitude;
use crate::params::GfmParams;

use super::{EnvelopeCalculator, GfmTest};

/// Grid voltage phase jump of `delta_theta_deg`.
///
/// The angle difference jumps by `-Δθ` and returns to zero along the free
/// response, so `ΔP(t) = -K·Δθ·h(t)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseJump;

impl EnvelopeCalculator for PhaseJump {
    fn test(&self) -> GfmTest {
        GfmTest::PhaseJump
    }

    fn magnitude(&self) -> Magnitude {
        Magnitude::ActivePower
    }

    fn center(&self, params: &GfmParams, model: &SwingModel, elapsed: f64) -> f64 {
        -model.k * params.delta_theta_rad() * model.free_response(elapsed)
    }
}
