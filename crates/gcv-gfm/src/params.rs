//! Grid-forming test parameters.

use std::fs;
use std::path::Path;

use gcv_core::{GcvError, GcvResult};
use serde::{Deserialize, Serialize};

/// Operating point, disturbance sizes and envelope margins of one
/// grid-forming test case. All quantities are per unit unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GfmParams {
    /// Initial active power.
    pub p0: f64,
    /// Initial reactive power.
    pub q0: f64,
    /// Voltage magnitude at the point of common coupling.
    pub u0: f64,
    /// Nominal frequency, Hz.
    pub f0: f64,
    /// Grid phase jump, degrees.
    pub delta_theta_deg: f64,
    /// Grid voltage step.
    pub delta_u: f64,
    /// Rate of change of frequency, Hz/s.
    pub rocof_hz_per_s: f64,
    /// Short-circuit ratio before the SCR jump.
    pub scr_initial: f64,
    /// Short-circuit ratio after the SCR jump.
    pub scr_final: f64,
    /// Relative margin above the theoretical response.
    pub margin_high: f64,
    /// Relative margin below the theoretical response.
    pub margin_low: f64,
    /// Final tunnel half-width as a fraction of the peak response.
    pub final_allowed_tunnel_variation: f64,
    /// Minimum final tunnel half-width.
    pub final_allowed_tunnel_pn: f64,
}

impl Default for GfmParams {
    fn default() -> Self {
        Self {
            p0: 0.5,
            q0: 0.0,
            u0: 1.0,
            f0: 50.0,
            delta_theta_deg: 10.0,
            delta_u: 0.05,
            rocof_hz_per_s: -1.0,
            scr_initial: 10.0,
            scr_final: 3.0,
            margin_high: 0.2,
            margin_low: 0.2,
            final_allowed_tunnel_variation: 0.02,
            final_allowed_tunnel_pn: 0.02,
        }
    }
}

impl GfmParams {
    /// Load from a TOML file, or JSON when the extension says so.
    pub fn load_from(path: &Path) -> GcvResult<Self> {
        let contents = fs::read_to_string(path)?;
        let params: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => serde_json::from_str(&contents)?,
            _ => toml::from_str(&contents)?,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> GcvResult<()> {
        let positive = [
            ("u0", self.u0),
            ("f0", self.f0),
            ("scr_initial", self.scr_initial),
            ("scr_final", self.scr_final),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(GcvError::Config(format!(
                "gfm.{} must be positive, got {}",
                name, value
            )));
        }
        let non_negative = [
            ("margin_high", self.margin_high),
            ("margin_low", self.margin_low),
            (
                "final_allowed_tunnel_variation",
                self.final_allowed_tunnel_variation,
            ),
            ("final_allowed_tunnel_pn", self.final_allowed_tunnel_pn),
        ];
        if let Some((name, value)) = non_negative
            .iter()
            .find(|(_, v)| !(v.is_finite() && *v >= 0.0))
        {
            return Err(GcvError::Config(format!(
                "gfm.{} must be non-negative, got {}",
                name, value
            )));
        }
        Ok(())
    }

    pub fn delta_theta_rad(&self) -> f64 {
        self.delta_theta_deg.to_radians()
    }
}
