use crate::error::{GcvError, GcvResult};
use faer::{prelude::*, solvers::PartialPivLu, Mat};

/// Trait for solving dense linear systems (Ax = b).
pub trait LinearSystemBackend: Send + Sync {
    /// Solve the linear system Ax = b
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> GcvResult<Vec<f64>>;
}

fn check_square(matrix: &[Vec<f64>], rhs: &[f64]) -> GcvResult<usize> {
    let n = matrix.len();
    if rhs.len() != n {
        return Err(GcvError::shape("linear system rhs", n, rhs.len()));
    }
    if let Some(row) = matrix.iter().find(|row| row.len() != n) {
        return Err(GcvError::shape("linear system row", n, row.len()));
    }
    Ok(n)
}

#[derive(Debug, Clone, Default)]
pub struct GaussSolver;

impl LinearSystemBackend for GaussSolver {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> GcvResult<Vec<f64>> {
        let n = check_square(matrix, rhs)?;
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut a = matrix.to_vec();
        let mut b = rhs.to_vec();

        for i in 0..n {
            let mut pivot = i;
            for row in i + 1..n {
                if a[row][i].abs() > a[pivot][i].abs() {
                    pivot = row;
                }
            }
            if pivot != i {
                a.swap(i, pivot);
                b.swap(i, pivot);
            }

            let diag = a[i][i];
            if diag.abs() < 1e-14 {
                return Err(GcvError::Numerical("singular matrix".into()));
            }

            for value in a[i][i..].iter_mut() {
                *value /= diag;
            }
            b[i] /= diag;

            let pivot_segment = a[i][i..].to_vec();
            for row in 0..n {
                if row == i {
                    continue;
                }
                let factor = a[row][i];
                for (target, &pivot) in a[row][i..].iter_mut().zip(pivot_segment.iter()) {
                    *target -= factor * pivot;
                }
                b[row] -= factor * b[i];
            }
        }

        Ok(b)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FaerSolver;

impl LinearSystemBackend for FaerSolver {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> GcvResult<Vec<f64>> {
        let n = check_square(matrix, rhs)?;
        if n == 0 {
            return Ok(Vec::new());
        }

        let mat = Mat::from_fn(n, n, |i, j| matrix[i][j]);
        let rhs_mat = Mat::from_fn(n, 1, |i, _| rhs[i]);
        let lu = PartialPivLu::new(mat.as_ref());
        let sol = lu.solve(&rhs_mat);

        let mut solution = Vec::with_capacity(n);
        for i in 0..n {
            solution.push(sol.read(i, 0));
        }
        // LU does not report singularity; it shows up as inf/NaN.
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(GcvError::Numerical("singular matrix".into()));
        }
        Ok(solution)
    }
}

/// Least-squares solution of an overdetermined system `M x ≈ d`.
///
/// Solves the normal equations `(MᵀM + λI) x = Mᵀd` with a tiny Tikhonov
/// term `λ = 1e-12·trace(MᵀM)/n` so rank-deficient problems still return
/// the (near) minimum-norm answer.
pub fn solve_least_squares(
    backend: &dyn LinearSystemBackend,
    matrix: &[Vec<f64>],
    rhs: &[f64],
) -> GcvResult<Vec<f64>> {
    if matrix.len() != rhs.len() {
        return Err(GcvError::shape("least squares rhs", matrix.len(), rhs.len()));
    }
    let cols = matrix.first().map(|row| row.len()).unwrap_or(0);
    if cols == 0 {
        return Ok(Vec::new());
    }
    if let Some(row) = matrix.iter().find(|row| row.len() != cols) {
        return Err(GcvError::shape("least squares row", cols, row.len()));
    }

    let mut normal = vec![vec![0.0; cols]; cols];
    let mut projected = vec![0.0; cols];
    for (row, &d) in matrix.iter().zip(rhs) {
        for i in 0..cols {
            projected[i] += row[i] * d;
            for j in 0..cols {
                normal[i][j] += row[i] * row[j];
            }
        }
    }

    let trace: f64 = (0..cols).map(|i| normal[i][i]).sum();
    let ridge = 1e-12 * (trace / cols as f64).max(f64::MIN_POSITIVE);
    for (i, row) in normal.iter_mut().enumerate() {
        row[i] += ridge;
    }

    backend.solve(&normal, &projected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solvers_agree_on_small_system() {
        let matrix = vec![
            vec![4.0, 1.0, 0.0],
            vec![1.0, 3.0, 1.0],
            vec![0.0, 1.0, 2.0],
        ];
        let rhs = vec![1.0, 2.0, 3.0];
        let gauss = GaussSolver.solve(&matrix, &rhs).unwrap();
        let faer = FaerSolver.solve(&matrix, &rhs).unwrap();
        for (g, f) in gauss.iter().zip(&faer) {
            assert!((g - f).abs() < 1e-12);
        }
    }

    #[test]
    fn gauss_reports_singular_matrix() {
        let matrix = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        let err = GaussSolver.solve(&matrix, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, GcvError::Numerical(_)));
    }

    #[test]
    fn rhs_length_mismatch_is_shape_error() {
        let matrix = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let err = FaerSolver.solve(&matrix, &[1.0]).unwrap_err();
        assert!(err.is_shape());
    }

    #[test]
    fn least_squares_fits_line() {
        // y = 2x + 1 sampled exactly
        let xs = [0.0, 1.0, 2.0, 3.0];
        let matrix: Vec<Vec<f64>> = xs.iter().map(|&x| vec![x, 1.0]).collect();
        let rhs: Vec<f64> = xs.iter().map(|&x| 2.0 * x + 1.0).collect();
        let sol = solve_least_squares(&FaerSolver, &matrix, &rhs).unwrap();
        assert!((sol[0] - 2.0).abs() < 1e-9);
        assert!((sol[1] - 1.0).abs() < 1e-9);
    }
}
