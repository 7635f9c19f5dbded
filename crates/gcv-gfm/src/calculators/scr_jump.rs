use gcv_core::GcvResult;

use crate::dynamics::{SwingModel, SystemParams};
use crate::envelope::Magnitude;
use crate::params::GfmParams;

use super::{EnvelopeCalculator, GfmTest};

/// Step of the grid short-circuit ratio from `scr_initial` to `scr_final`.
///
/// The grid part of the reactance changes from `1/SCR0` to `1/SCR1`. At
/// constant angle the power jumps by `p0·(Xeff/Xeff' - 1)` and decays with
/// the post-jump dynamics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrJump;

impl ScrJump {
    fn post_jump_xeff(params: &GfmParams, xeff: f64) -> f64 {
        xeff - 1.0 / params.scr_initial + 1.0 / params.scr_final
    }
}

impl EnvelopeCalculator for ScrJump {
    fn test(&self) -> GfmTest {
        GfmTest::ScrJump
    }

    fn magnitude(&self) -> Magnitude {
        Magnitude::ActivePower
    }

    fn model(&self, params: &GfmParams, system: &SystemParams) -> GcvResult<SwingModel> {
        let post_jump = SystemParams {
            xeff: Self::post_jump_xeff(params, system.xeff),
            ..*system
        };
        let mut model = SwingModel::new(params.p0, params.u0, params.f0, &post_jump)?;
        model.xeff_ratio = system.xeff / model.xeff;
        Ok(model)
    }

    fn center(&self, params: &GfmParams, model: &SwingModel, elapsed: f64) -> f64 {
        params.p0 * (model.xeff_ratio - 1.0) * model.free_response(elapsed)
    }
}
