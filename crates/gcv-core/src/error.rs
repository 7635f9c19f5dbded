//! Unified error types for the validation workspace
//!
//! [`GcvError`] separates caller bugs (shape errors, invalid parameters) from
//! I/O and configuration problems. Outcomes that are *expected* during a
//! validation run (an invalid scenario, missing reference curves) are not
//! errors; they are modelled as scenario outcomes in `gcv-sigpro`.
//!
//! # Example
//!
//! ```
//! use gcv_core::{GcvError, GcvResult};
//!
//! fn check_lengths(a: &[f64], b: &[f64]) -> GcvResult<()> {
//!     if a.len() != b.len() {
//!         return Err(GcvError::shape("signal", a.len(), b.len()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_lengths(&[1.0], &[1.0, 2.0]).is_err());
//! ```

use thiserror::Error;

/// Unified error type for all validation operations.
#[derive(Error, Debug)]
pub enum GcvError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input values (non-finite times, non-positive magnitudes, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Mismatched array lengths. Always a caller bug; never retried.
    #[error("Shape error: {context}: expected length {expected}, got {actual}")]
    Shape {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Numerical failures (singular systems, no equilibrium, ...)
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl GcvError {
    pub fn shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        GcvError::Shape {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// True for errors that indicate a programming mistake in the caller.
    pub fn is_shape(&self) -> bool {
        matches!(self, GcvError::Shape { .. })
    }
}

/// Convenience type alias for Results using GcvError.
pub type GcvResult<T> = Result<T, GcvError>;

impl From<anyhow::Error> for GcvError {
    fn from(err: anyhow::Error) -> Self {
        GcvError::Other(err.to_string())
    }
}

impl From<String> for GcvError {
    fn from(s: String) -> Self {
        GcvError::Other(s)
    }
}

impl From<&str> for GcvError {
    fn from(s: &str) -> Self {
        GcvError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for GcvError {
    fn from(err: serde_json::Error) -> Self {
        GcvError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for GcvError {
    fn from(err: toml::de::Error) -> Self {
        GcvError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for GcvError {
    fn from(err: toml::ser::Error) -> Self {
        GcvError::Config(err.to_string())
    }
}

impl From<csv::Error> for GcvError {
    fn from(err: csv::Error) -> Self {
        GcvError::Parse(err.to_string())
    }
}
