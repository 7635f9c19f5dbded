//! Placing curves on a uniform time grid.
//!
//! Two flavours are provided:
//!
//! - [`resample_pair`] aligns a simulated and a reference curve on the
//!   intersection of their time spans using shape-preserving piecewise cubic
//!   Hermite interpolation ([`Pchip`]). Simulated curves contain near-step
//!   transitions at fault onset and clearing; an ordinary cubic spline would
//!   overshoot there, PCHIP does not.
//! - [`resample_uniform`] normalizes a single imported curve with plain
//!   linear interpolation.

use gcv_core::{GcvError, GcvResult, TimeSeries};
use tracing::debug;

/// Default sampling frequency of aligned curve pairs, in Hz.
pub const DEFAULT_FS_HZ: f64 = 1000.0;

/// Shape-preserving piecewise cubic Hermite interpolator (Fritsch–Carlson).
#[derive(Debug, Clone)]
pub struct Pchip {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl Pchip {
    /// Build the interpolator; `x` must be strictly increasing.
    pub fn new(x: &[f64], y: &[f64]) -> GcvResult<Self> {
        if x.len() != y.len() {
            return Err(GcvError::shape("pchip ordinates", x.len(), y.len()));
        }
        if x.is_empty() {
            return Err(GcvError::Validation(
                "pchip needs at least one sample".into(),
            ));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(GcvError::Validation(
                "pchip abscissas must be strictly increasing".into(),
            ));
        }

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            slopes: pchip_slopes(x, y),
        })
    }

    /// Evaluate at `t`. Outside the data range the end polynomials are
    /// extrapolated, matching the usual PCHIP convention.
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        if n == 1 {
            return self.y[0];
        }
        // Index of the left knot of the interval containing t.
        let k = self.x.partition_point(|&xi| xi <= t).clamp(1, n - 1) - 1;

        let h = self.x[k + 1] - self.x[k];
        let s = (t - self.x[k]) / h;
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        h00 * self.y[k]
            + h10 * h * self.slopes[k]
            + h01 * self.y[k + 1]
            + h11 * h * self.slopes[k + 1]
    }

    pub fn eval_many(&self, ts: &[f64]) -> Vec<f64> {
        ts.iter().map(|&t| self.eval(t)).collect()
    }
}

/// Knot derivatives: weighted harmonic mean of neighbouring secants in the
/// interior (zero at local extrema), one-sided three-point formula at the
/// ends with the shape-preserving corrections.
fn pchip_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    match n {
        0 => return Vec::new(),
        1 => return vec![0.0],
        2 => {
            let m = (y[1] - y[0]) / (x[1] - x[0]);
            return vec![m, m];
        }
        _ => {}
    }

    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let m: Vec<f64> = y
        .windows(2)
        .zip(&h)
        .map(|(w, hk)| (w[1] - w[0]) / hk)
        .collect();

    let mut d = vec![0.0; n];
    for k in 1..n - 1 {
        let (m0, m1) = (m[k - 1], m[k]);
        if m0 == 0.0 || m1 == 0.0 || m0.signum() != m1.signum() {
            d[k] = 0.0;
        } else {
            let w1 = 2.0 * h[k] + h[k - 1];
            let w2 = h[k] + 2.0 * h[k - 1];
            d[k] = (w1 + w2) / (w1 / m0 + w2 / m1);
        }
    }

    d[0] = edge_slope(h[0], h[1], m[0], m[1]);
    d[n - 1] = edge_slope(h[n - 2], h[n - 3], m[n - 2], m[n - 3]);
    d
}

fn edge_slope(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if d.signum() != m0.signum() || m0 == 0.0 {
        0.0
    } else if m0.signum() != m1.signum() && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}

/// Uniform grid `start, start + 1/fs, ...` not exceeding `end`.
fn uniform_grid(start: f64, end: f64, fs: f64) -> Vec<f64> {
    let count = ((end - start) * fs + 1e-9).floor() as usize + 1;
    (0..count)
        .map(|i| (start + i as f64 / fs).min(end))
        .collect()
}

fn check_fs(fs: f64) -> GcvResult<()> {
    if fs.is_finite() && fs > 0.0 {
        Ok(())
    } else {
        Err(GcvError::Validation(format!(
            "sampling frequency must be positive, got {}",
            fs
        )))
    }
}

/// Align two curves on one uniform grid covering the intersection of their
/// time spans.
///
/// When the spans do not overlap both returned series are empty; the caller
/// reports the pair as "no comparable data".
pub fn resample_pair(
    sim: &TimeSeries,
    reference: &TimeSeries,
    fs: f64,
) -> GcvResult<(TimeSeries, TimeSeries)> {
    check_fs(fs)?;
    let (Some(sim_start), Some(sim_end), Some(ref_start), Some(ref_end)) =
        (sim.start(), sim.end(), reference.start(), reference.end())
    else {
        debug!("resample_pair: at least one input series is empty");
        return Ok((TimeSeries::empty(), TimeSeries::empty()));
    };

    let t_start = sim_start.max(ref_start);
    let t_end = sim_end.min(ref_end);
    if t_start >= t_end {
        debug!(t_start, t_end, "resample_pair: time spans do not overlap");
        return Ok((TimeSeries::empty(), TimeSeries::empty()));
    }

    let grid = uniform_grid(t_start, t_end, fs);
    let sim_values = Pchip::new(sim.time(), sim.values())?.eval_many(&grid);
    let ref_values = Pchip::new(reference.time(), reference.values())?.eval_many(&grid);

    Ok((
        TimeSeries::new(grid.clone(), sim_values)?,
        TimeSeries::new(grid, ref_values)?,
    ))
}

/// Resample one curve onto a uniform grid starting at its first sample,
/// using linear interpolation.
pub fn resample_uniform(series: &TimeSeries, fs: f64) -> GcvResult<TimeSeries> {
    check_fs(fs)?;
    let (Some(start), Some(end)) = (series.start(), series.end()) else {
        return Ok(TimeSeries::empty());
    };

    let time = series.time();
    let values = series.values();
    let grid = uniform_grid(start, end, fs);
    let resampled = grid
        .iter()
        .map(|&t| {
            let upper = time.partition_point(|&ti| ti < t);
            if upper == 0 {
                values[0]
            } else if upper >= time.len() {
                values[time.len() - 1]
            } else {
                let (t0, t1) = (time[upper - 1], time[upper]);
                let (v0, v1) = (values[upper - 1], values[upper]);
                v0 + (v1 - v0) * (t - t0) / (t1 - t0)
            }
        })
        .collect();

    TimeSeries::new(grid, resampled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(time: &[f64], values: &[f64]) -> TimeSeries {
        TimeSeries::new(time.to_vec(), values.to_vec()).unwrap()
    }

    #[test]
    fn pchip_reproduces_knots_and_lines() {
        let x = [0.0, 1.0, 2.5, 4.0];
        let y = [1.0, 3.0, 6.0, 9.0];
        let p = Pchip::new(&x, &y).unwrap();
        for (&xi, &yi) in x.iter().zip(&y) {
            assert!((p.eval(xi) - yi).abs() < 1e-12);
        }
        let line = Pchip::new(&[0.0, 1.0, 2.0, 3.0], &[0.0, 2.0, 4.0, 6.0]).unwrap();
        assert!((line.eval(1.25) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn pchip_does_not_overshoot_a_step() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let p = Pchip::new(&x, &y).unwrap();
        for i in 0..=900 {
            let v = p.eval(i as f64 * 0.01);
            assert!((-1e-12..=1.0 + 1e-12).contains(&v), "overshoot {v}");
        }
    }

    #[test]
    fn pair_covers_intersection_on_uniform_grid() {
        let sim = series(&[0.0, 0.3, 1.0, 2.0], &[0.0, 0.3, 1.0, 2.0]);
        let reference = series(&[0.5, 1.5, 3.0], &[1.0, 1.0, 1.0]);
        let (s, r) = resample_pair(&sim, &reference, 10.0).unwrap();
        assert_eq!(s.len(), r.len());
        assert_eq!(s.time(), r.time());
        assert!((s.start().unwrap() - 0.5).abs() < 1e-12);
        assert!((s.end().unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(s.len(), 16);
        assert!(r.values().iter().all(|v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn disjoint_spans_give_empty_pair() {
        let sim = series(&[0.0, 1.0], &[0.0, 1.0]);
        let reference = series(&[2.0, 3.0], &[0.0, 1.0]);
        let (s, r) = resample_pair(&sim, &reference, DEFAULT_FS_HZ).unwrap();
        assert!(s.is_empty());
        assert!(r.is_empty());

        let touching = series(&[1.0, 2.0], &[0.0, 1.0]);
        let (s, r) = resample_pair(&sim, &touching, DEFAULT_FS_HZ).unwrap();
        assert_eq!((s.len(), r.len()), (0, 0));
    }

    #[test]
    fn uniform_linear_resampling() {
        let s = series(&[0.0, 1.0, 3.0], &[0.0, 1.0, 3.0]);
        let out = resample_uniform(&s, 2.0).unwrap();
        assert_eq!(out.time(), &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
        assert_eq!(out.values(), &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn non_positive_fs_is_rejected() {
        let s = series(&[0.0, 1.0], &[0.0, 1.0]);
        assert!(resample_uniform(&s, 0.0).is_err());
        assert!(resample_pair(&s, &s, -1.0).is_err());
    }
}
