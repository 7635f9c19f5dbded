//! # gcv-gfm: analytic envelopes for grid-forming tests
//!
//! A grid-forming converter answers a grid disturbance like a damped
//! synchronous machine. From damping D, inertia H and effective reactance
//! Xeff this crate computes the theoretical response to four disturbances
//! and the band a compliant response must stay in:
//!
//! - [`GfmTest::PhaseJump`]: grid phase jump, bounds ΔP
//! - [`GfmTest::AmplitudeStep`]: grid voltage step, bounds ΔQ
//! - [`GfmTest::Rocof`]: frequency ramp, bounds ΔP
//! - [`GfmTest::ScrJump`]: short-circuit ratio step, bounds ΔP
//!
//! ```
//! use gcv_gfm::{calculator, time_axis, GfmParams, GfmTest};
//!
//! let time = time_axis(5.0, 0.001).unwrap();
//! let env = calculator(GfmTest::Rocof)
//!     .calculate_envelopes(&GfmParams::default(), 150.0, 5.0, 0.2, &time, 1.0)
//!     .unwrap();
//! assert!(env.lower.iter().zip(&env.upper).all(|(lo, hi)| lo < hi));
//! ```

pub mod calculators;
pub mod dynamics;
pub mod envelope;
pub mod export;
pub mod params;

pub use calculators::{
    calculator, time_axis, AmplitudeStep, EnvelopeCalculator, GfmTest, PhaseJump, Rocof, ScrJump,
};
pub use dynamics::{Regime, SwingModel, SystemParams};
pub use envelope::{bounds, tunnel_width, Envelope, Magnitude};
pub use export::{export_envelope, format_sci, write_envelope_csv, ExportedFiles};
#[cfg(feature = "plot")]
pub use export::plot_envelope;
pub use params::GfmParams;
