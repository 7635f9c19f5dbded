//! Time series with strictly increasing timestamps.

use serde::{Deserialize, Serialize};

use crate::error::{GcvError, GcvResult};

/// An ordered sequence of `(time, value)` samples.
///
/// Construction enforces the invariants every numerical stage relies on:
/// equal lengths, finite and non-decreasing timestamps. Exactly repeated
/// timestamps (common at event instants in simulator output) are collapsed,
/// keeping the first sample, so the stored times are strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    time: Vec<f64>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(time: Vec<f64>, values: Vec<f64>) -> GcvResult<Self> {
        if time.len() != values.len() {
            return Err(GcvError::shape("time series values", time.len(), values.len()));
        }
        if let Some(bad) = time.iter().find(|t| !t.is_finite()) {
            return Err(GcvError::Validation(format!(
                "time series contains non-finite timestamp {}",
                bad
            )));
        }
        if let Some(pos) = time.windows(2).position(|w| w[1] < w[0]) {
            return Err(GcvError::Validation(format!(
                "timestamps must be non-decreasing (t[{}]={} > t[{}]={})",
                pos,
                time[pos],
                pos + 1,
                time[pos + 1]
            )));
        }

        let mut series = TimeSeries {
            time: Vec::with_capacity(time.len()),
            values: Vec::with_capacity(values.len()),
        };
        for (t, v) in time.into_iter().zip(values) {
            if series.time.last() == Some(&t) {
                continue;
            }
            series.time.push(t);
            series.values.push(v);
        }
        Ok(series)
    }

    /// Build a series from `(time, value)` pairs.
    pub fn from_pairs<I>(pairs: I) -> GcvResult<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let (time, values): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        Self::new(time, values)
    }

    /// Empty series; the result of comparing curves that share no time span.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn start(&self) -> Option<f64> {
        self.time.first().copied()
    }

    pub fn end(&self) -> Option<f64> {
        self.time.last().copied()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Replace the values while keeping the time grid.
    pub fn with_values(&self, values: Vec<f64>) -> GcvResult<Self> {
        if values.len() != self.time.len() {
            return Err(GcvError::shape("time series values", self.time.len(), values.len()));
        }
        Ok(TimeSeries {
            time: self.time.clone(),
            values,
        })
    }

    /// True when every sample has the same value (max == min).
    pub fn is_constant(&self) -> bool {
        match self.values.split_first() {
            Some((first, rest)) => rest.iter().all(|v| v == first),
            None => true,
        }
    }
}
