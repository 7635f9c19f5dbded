use crate::dynamics::SwingModel;
use crate::envelope::Magnitude;
use crate::params::GfmParams;

use super::{EnvelopeCalculator, GfmTest};

/// Grid voltage magnitude step of `delta_u`.
///
/// Reactive power follows the voltage difference across Xeff at once,
/// `ΔQ0 = -u0·cos δ0·Δu / Xeff`. The same step raises the transferred
/// active power by `p0·Δu/u0`, so the angle swings to a new equilibrium
/// `Δδ∞ = -p0·Δu / (u0·K)` along `1 - h(t)`. Since `∂Q/∂δ = p0`:
///
/// ```text
/// ΔQ(t) = ΔQ0 + p0·Δδ∞·(1 - h(t))
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AmplitudeStep;

impl EnvelopeCalculator for AmplitudeStep {
    fn test(&self) -> GfmTest {
        GfmTest::AmplitudeStep
    }

    fn magnitude(&self) -> Magnitude {
        Magnitude::ReactivePower
    }

    fn center(&self, params: &GfmParams, model: &SwingModel, elapsed: f64) -> f64 {
        let instant = -params.u0 * model.delta0.cos() * params.delta_u / model.xeff;
        let angle_shift = -params.p0 * params.delta_u / (params.u0 * model.k);
        instant + params.p0 * angle_shift * (1.0 - model.free_response(elapsed))
    }
}
