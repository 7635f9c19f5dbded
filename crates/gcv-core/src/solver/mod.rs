//! Small dense linear-system solvers used by the numerical stages.
//!
//! The systems solved here are tiny (filter initial conditions, the
//! Gustafsson least-squares problem), so both backends work on row-major
//! `Vec<Vec<f64>>` matrices.

pub mod backend;
pub mod registry;

pub use backend::{solve_least_squares, FaerSolver, GaussSolver, LinearSystemBackend};
pub use registry::SolverKind;
