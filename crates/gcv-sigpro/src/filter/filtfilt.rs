//! Zero-phase forward-backward filtering of a biquad.
//!
//! Two edge treatments are implemented:
//!
//! - extension padding (odd / even / constant / none) with steady-state
//!   initial conditions scaled to the first sample of each pass;
//! - Gustafsson's method, which picks the forward and backward initial
//!   conditions that make forward-backward and backward-forward filtering
//!   agree in the least-squares sense. Only the first and last `irlen`
//!   samples are involved when the impulse response is shorter than half
//!   the signal.
//!
//! Reference: F. Gustafsson, "Determining the initial states in
//! forward-backward filtering", IEEE Trans. Signal Processing 44(4), 1996.

use gcv_core::{solve_least_squares, GcvError, GcvResult, LinearSystemBackend, PaddingMethod};

use super::design::FilterDesign;

/// Filter order of every design in this crate.
const ORDER: usize = 2;

/// Direct Form II transposed filtering with initial state `zi`.
/// Returns the output and the final state.
pub fn lfilter(design: &FilterDesign, x: &[f64], zi: [f64; ORDER]) -> (Vec<f64>, [f64; ORDER]) {
    let [b0, b1, b2] = design.b;
    let [_, a1, a2] = design.a;
    let mut state = zi;
    let y = x
        .iter()
        .map(|&input| {
            let output = b0 * input + state[0];
            state[0] = b1 * input - a1 * output + state[1];
            state[1] = b2 * input - a2 * output;
            output
        })
        .collect();
    (y, state)
}

/// Initial state for which a unit step input is already in steady state
/// from the first sample on.
pub fn lfilter_zi(
    design: &FilterDesign,
    backend: &dyn LinearSystemBackend,
) -> GcvResult<[f64; ORDER]> {
    let [b0, b1, b2] = design.b;
    let [_, a1, a2] = design.a;
    // (I - Aᵀ) zi = b[1:] - a[1:]·b0 with A the companion matrix of a.
    let matrix = vec![vec![1.0 + a1, -1.0], vec![a2, 1.0]];
    let rhs = [b1 - a1 * b0, b2 - a2 * b0];
    let zi = backend.solve(&matrix, &rhs)?;
    Ok([zi[0], zi[1]])
}

fn reversed(x: &[f64]) -> Vec<f64> {
    x.iter().rev().copied().collect()
}

fn scaled(zi: [f64; ORDER], factor: f64) -> [f64; ORDER] {
    [zi[0] * factor, zi[1] * factor]
}

/// Default extension length: three times the number of coefficients.
pub fn default_padlen() -> usize {
    3 * (ORDER + 1)
}

/// Extend `x` by `padlen` samples on both sides.
pub fn extend(x: &[f64], padlen: usize, method: PaddingMethod) -> Vec<f64> {
    let n = x.len();
    if padlen == 0 || n < 2 {
        return x.to_vec();
    }
    let (first, last) = (x[0], x[n - 1]);
    let mut out = Vec::with_capacity(n + 2 * padlen);
    match method {
        PaddingMethod::Odd => {
            out.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
            out.extend_from_slice(x);
            out.extend((1..=padlen).map(|i| 2.0 * last - x[n - 1 - i]));
        }
        PaddingMethod::Even => {
            out.extend((1..=padlen).rev().map(|i| x[i]));
            out.extend_from_slice(x);
            out.extend((1..=padlen).map(|i| x[n - 1 - i]));
        }
        PaddingMethod::Constant => {
            out.extend(std::iter::repeat(first).take(padlen));
            out.extend_from_slice(x);
            out.extend(std::iter::repeat(last).take(padlen));
        }
        PaddingMethod::None | PaddingMethod::Gustafsson => out.extend_from_slice(x),
    }
    out
}

/// Forward-backward filtering with extension padding.
///
/// `padlen` is clipped to `len - 1`; [`PaddingMethod::None`] disables the
/// extension but keeps the steady-state initial conditions.
pub fn filtfilt_padded(
    design: &FilterDesign,
    x: &[f64],
    method: PaddingMethod,
    padlen: Option<usize>,
    backend: &dyn LinearSystemBackend,
) -> GcvResult<Vec<f64>> {
    if x.len() < 2 {
        return Ok(x.to_vec());
    }
    let padlen = match method {
        PaddingMethod::None | PaddingMethod::Gustafsson => 0,
        _ => padlen.unwrap_or_else(default_padlen).min(x.len() - 1),
    };

    let ext = extend(x, padlen, method);
    let zi = lfilter_zi(design, backend)?;

    let (forward, _) = lfilter(design, &ext, scaled(zi, ext[0]));
    let last = forward[forward.len() - 1];
    let (backward, _) = lfilter(design, &reversed(&forward), scaled(zi, last));

    let y = reversed(&backward);
    Ok(y[padlen..y.len() - padlen].to_vec())
}

/// Forward-backward filtering with Gustafsson's initial conditions.
///
/// `irlen` is the impulse-response length; `None` uses the whole signal.
pub fn filtfilt_gustafsson(
    design: &FilterDesign,
    x: &[f64],
    irlen: Option<usize>,
    backend: &dyn LinearSystemBackend,
) -> GcvResult<Vec<f64>> {
    let n = x.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let m = match irlen {
        Some(len) if n > 2 * len => len,
        _ => n,
    };
    let full = m == n;

    // Observability matrix: response of the filter to each unit initial
    // state with zero input.
    let (impulse, _) = lfilter(design, &vec![0.0; m], [1.0, 0.0]);
    let mut obs = vec![[0.0; ORDER]; m];
    for (row, value) in obs.iter_mut().zip(&impulse) {
        row[0] = *value;
    }
    for k in 1..ORDER {
        for i in k..m {
            obs[i][k] = impulse[i - k];
        }
    }
    let obs_rev: Vec<[f64; ORDER]> = obs.iter().rev().copied().collect();

    // S filters the reversed propagated initial conditions.
    let mut s = vec![[0.0; ORDER]; m];
    for k in 0..ORDER {
        let column: Vec<f64> = obs_rev.iter().map(|row| row[k]).collect();
        let (filtered, _) = lfilter(design, &column, [0.0; ORDER]);
        for (row, value) in s.iter_mut().zip(filtered) {
            row[k] = value;
        }
    }
    let s_rev: Vec<[f64; ORDER]> = s.iter().rev().copied().collect();

    // Naive forward-backward and backward-forward passes.
    let zero = [0.0; ORDER];
    let (y_f, _) = lfilter(design, x, zero);
    let y_fb = reversed(&lfilter(design, &reversed(&y_f), zero).0);
    let y_b = reversed(&lfilter(design, &reversed(x), zero).0);
    let (y_bf, _) = lfilter(design, &y_b, zero);

    let delta_full: Vec<f64> = y_bf.iter().zip(&y_fb).map(|(bf, fb)| bf - fb).collect();

    let mut system: Vec<Vec<f64>> = Vec::with_capacity(if full { m } else { 2 * m });
    let mut delta: Vec<f64> = Vec::with_capacity(system.capacity());
    if full {
        for i in 0..m {
            let mut row = Vec::with_capacity(2 * ORDER);
            row.extend((0..ORDER).map(|k| s_rev[i][k] - obs[i][k]));
            row.extend((0..ORDER).map(|k| obs_rev[i][k] - s[i][k]));
            system.push(row);
        }
        delta.extend_from_slice(&delta_full);
    } else {
        for i in 0..m {
            let mut row = vec![0.0; 2 * ORDER];
            for k in 0..ORDER {
                row[k] = s_rev[i][k] - obs[i][k];
            }
            system.push(row);
        }
        for i in 0..m {
            let mut row = vec![0.0; 2 * ORDER];
            for k in 0..ORDER {
                row[ORDER + k] = obs_rev[i][k] - s[i][k];
            }
            system.push(row);
        }
        delta.extend_from_slice(&delta_full[..m]);
        delta.extend_from_slice(&delta_full[n - m..]);
    }

    let ic = solve_least_squares(backend, &system, &delta)?;
    if ic.len() != 2 * ORDER {
        return Err(GcvError::Numerical(
            "Gustafsson initial conditions have the wrong size".into(),
        ));
    }
    let (x0, x1) = ic.split_at(ORDER);
    let dot = |row: &[f64; ORDER], v: &[f64]| row.iter().zip(v).map(|(a, b)| a * b).sum::<f64>();

    let mut y = y_fb;
    if full {
        for i in 0..m {
            y[i] += dot(&s_rev[i], x0) + dot(&obs_rev[i], x1);
        }
    } else {
        for i in 0..m {
            y[i] += dot(&s_rev[i], x0);
            y[n - m + i] += dot(&obs_rev[i], x1);
        }
    }
    Ok(y)
}
