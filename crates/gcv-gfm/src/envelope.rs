//! Envelope curves around a theoretical response.

use serde::{Deserialize, Serialize};

use crate::dynamics::Regime;
use crate::params::GfmParams;

/// Quantity an envelope bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Magnitude {
    ActivePower,
    ReactivePower,
}

impl Magnitude {
    /// Label used in file headers and plots.
    pub fn label(&self) -> &'static str {
        match self {
            Magnitude::ActivePower => "ΔP",
            Magnitude::ReactivePower => "ΔQ",
        }
    }
}

/// Theoretical response and the band a compliant unit must stay in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub regime: Regime,
    pub magnitude: Magnitude,
    pub time: Vec<f64>,
    pub center: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

impl Envelope {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Indices where `values` leaves the band.
    pub fn violations<'a>(&'a self, values: &'a [f64]) -> impl Iterator<Item = usize> + 'a {
        values
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .enumerate()
            .filter(|(_, (v, (lo, hi)))| *v < *lo || *v > *hi)
            .map(|(i, _)| i)
    }
}

/// Half-width of the steady-state tunnel.
pub fn tunnel_width(center: &[f64], params: &GfmParams) -> f64 {
    let peak = center.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
    (params.final_allowed_tunnel_variation * peak).max(params.final_allowed_tunnel_pn)
}

/// Upper and lower bounds: relative margins around the center plus the
/// tunnel on both sides.
pub fn bounds(center: &[f64], params: &GfmParams) -> (Vec<f64>, Vec<f64>) {
    let tunnel = tunnel_width(center, params);
    center
        .iter()
        .map(|&c| {
            let high = c * (1.0 + params.margin_high);
            let low = c * (1.0 - params.margin_low);
            (high.max(low) + tunnel, high.min(low) - tunnel)
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_swap_for_negative_response() {
        let params = GfmParams {
            margin_high: 0.2,
            margin_low: 0.1,
            final_allowed_tunnel_variation: 0.0,
            final_allowed_tunnel_pn: 0.01,
            ..GfmParams::default()
        };
        let (upper, lower) = bounds(&[0.0, 1.0, -1.0], &params);
        assert!((upper[0] - 0.01).abs() < 1e-12 && (lower[0] + 0.01).abs() < 1e-12);
        assert!((upper[1] - 1.21).abs() < 1e-12 && (lower[1] - 0.89).abs() < 1e-12);
        assert!((upper[2] + 0.89).abs() < 1e-12 && (lower[2] + 1.21).abs() < 1e-12);
    }

    #[test]
    fn tunnel_scales_with_peak_above_floor() {
        let params = GfmParams {
            final_allowed_tunnel_variation: 0.1,
            final_allowed_tunnel_pn: 0.02,
            ..GfmParams::default()
        };
        assert!((tunnel_width(&[0.1, -0.5, 0.3], &params) - 0.05).abs() < 1e-12);
        assert!((tunnel_width(&[0.1], &params) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn violations_are_reported_by_index() {
        let env = Envelope {
            regime: Regime::Overdamped,
            magnitude: Magnitude::ActivePower,
            time: vec![0.0, 1.0, 2.0],
            center: vec![0.0, 0.0, 0.0],
            upper: vec![1.0, 1.0, 1.0],
            lower: vec![-1.0, -1.0, -1.0],
        };
        let bad: Vec<usize> = env.violations(&[0.0, 1.5, -2.0]).collect();
        assert_eq!(bad, vec![1, 2]);
    }
}
