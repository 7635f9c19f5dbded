//! Curve providers.
//!
//! A scenario is scored from two [`CurveSet`]s: the simulated one and the
//! reference one (another simulation or a field measurement). Where they come
//! from is abstracted behind [`CurveSource`]; [`curve_source`] picks the
//! implementation from a [`CurveSourceSpec`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use gcv_core::{GcvError, GcvResult, Signal, TimeSeries};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::resample::resample_uniform;

/// Timing of the disturbance applied in a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Start of the fault or disturbance, in seconds.
    pub t_fault: f64,
    /// Duration of the fault; 0 for a step without clearing.
    #[serde(default)]
    pub fault_duration: f64,
    /// Nominal sampling frequency of the producer, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_hz: Option<f64>,
}

/// One time series per electrical channel plus the event timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSet {
    pub event: EventMetadata,
    pub channels: BTreeMap<Signal, TimeSeries>,
}

impl CurveSet {
    pub fn new(event: EventMetadata) -> Self {
        Self {
            event,
            channels: BTreeMap::new(),
        }
    }

    pub fn with_channel(mut self, signal: Signal, series: TimeSeries) -> Self {
        self.channels.insert(signal, series);
        self
    }

    pub fn channel(&self, signal: Signal) -> Option<&TimeSeries> {
        self.channels.get(&signal)
    }

    pub fn signals(&self) -> impl Iterator<Item = Signal> + '_ {
        self.channels.keys().copied()
    }
}

/// Producer of a curve set. `Ok(None)` means "no curves available", which
/// is a scenario outcome rather than an error.
pub trait CurveSource: Send + Sync {
    fn load(&self) -> GcvResult<Option<CurveSet>>;

    /// Whether the curves are field measurements (looser thresholds).
    fn is_field_measurement(&self) -> bool {
        false
    }

    fn describe(&self) -> String;
}

/// Curves already held in memory, typically handed over by the simulator
/// driver.
#[derive(Debug, Clone)]
pub struct SimulatedCurves {
    curves: Option<CurveSet>,
}

impl SimulatedCurves {
    pub fn new(curves: CurveSet) -> Self {
        Self {
            curves: Some(curves),
        }
    }

    /// A run that produced no curves (failed or skipped simulation).
    pub fn missing() -> Self {
        Self { curves: None }
    }
}

impl CurveSource for SimulatedCurves {
    fn load(&self) -> GcvResult<Option<CurveSet>> {
        Ok(self.curves.clone())
    }

    fn describe(&self) -> String {
        match &self.curves {
            Some(set) => format!("simulated curves ({} channels)", set.channels.len()),
            None => "simulated curves (missing)".to_string(),
        }
    }
}

/// Curves imported from a delimited text file.
///
/// The first column is time in seconds; every other column whose header
/// names a [`Signal`] becomes a channel. The delimiter is `;` when the header
/// line contains one, `,` otherwise. A missing file means no curves.
#[derive(Debug, Clone)]
pub struct CsvCurves {
    path: PathBuf,
    event: EventMetadata,
    field_measurement: bool,
    resample_fs: Option<f64>,
}

impl CsvCurves {
    pub fn new(path: impl Into<PathBuf>, event: EventMetadata) -> Self {
        Self {
            path: path.into(),
            event,
            field_measurement: false,
            resample_fs: None,
        }
    }

    pub fn field_measurement(mut self, field: bool) -> Self {
        self.field_measurement = field;
        self
    }

    /// Normalize every imported channel onto a uniform grid at `fs` Hz.
    pub fn resample_to(mut self, fs: Option<f64>) -> Self {
        self.resample_fs = fs;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn sniff_delimiter(path: &Path) -> GcvResult<u8> {
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;
    Ok(if header.contains(';') { b';' } else { b',' })
}

/// Read a curve file into per-signal series.
pub fn read_curve_csv(path: &Path) -> GcvResult<BTreeMap<Signal, TimeSeries>> {
    let delimiter = sniff_delimiter(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(GcvError::Parse(format!(
            "{}: expected a time column and at least one signal column",
            path.display()
        )));
    }
    let columns: Vec<(usize, Signal)> = headers
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(i, name)| match name.parse::<Signal>() {
            Ok(signal) => Some((i, signal)),
            Err(_) => {
                debug!(column = name, "ignoring unknown curve column");
                None
            }
        })
        .collect();

    let mut time = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let field = |i: usize| -> GcvResult<f64> {
            let raw = record.get(i).unwrap_or_default();
            raw.parse::<f64>().map_err(|e| {
                GcvError::Parse(format!(
                    "{}: row {} column {}: '{}' ({})",
                    path.display(),
                    line + 2,
                    i + 1,
                    raw,
                    e
                ))
            })
        };
        time.push(field(0)?);
        for (slot, (i, _)) in values.iter_mut().zip(&columns) {
            slot.push(field(*i)?);
        }
    }

    columns
        .into_iter()
        .zip(values)
        .map(|((_, signal), v)| -> GcvResult<(Signal, TimeSeries)> {
            Ok((signal, TimeSeries::new(time.clone(), v)?))
        })
        .collect()
}

impl CurveSource for CsvCurves {
    fn load(&self) -> GcvResult<Option<CurveSet>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "curve file not found");
            return Ok(None);
        }
        let mut channels = read_curve_csv(&self.path)?;
        if let Some(fs) = self.resample_fs {
            for series in channels.values_mut() {
                *series = resample_uniform(series, fs)?;
            }
        }
        Ok(Some(CurveSet {
            event: self.event,
            channels,
        }))
    }

    fn is_field_measurement(&self) -> bool {
        self.field_measurement
    }

    fn describe(&self) -> String {
        format!("curve file {}", self.path.display())
    }
}

/// Declarative description of where a curve set comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurveSourceSpec {
    Simulated {
        curves: Option<CurveSet>,
    },
    Csv {
        path: PathBuf,
        event: EventMetadata,
        #[serde(default)]
        field_measurement: bool,
        #[serde(default)]
        resample_fs: Option<f64>,
    },
}

/// Build the curve source described by `spec`.
pub fn curve_source(spec: CurveSourceSpec) -> Box<dyn CurveSource> {
    match spec {
        CurveSourceSpec::Simulated { curves: Some(set) } => Box::new(SimulatedCurves::new(set)),
        CurveSourceSpec::Simulated { curves: None } => Box::new(SimulatedCurves::missing()),
        CurveSourceSpec::Csv {
            path,
            event,
            field_measurement,
            resample_fs,
        } => Box::new(
            CsvCurves::new(path, event)
                .field_measurement(field_measurement)
                .resample_to(resample_fs),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn event() -> EventMetadata {
        EventMetadata {
            t_fault: 1.0,
            fault_duration: 0.1,
            fs_hz: None,
        }
    }

    #[test]
    fn reads_semicolon_file_and_skips_unknown_columns() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "time;P;Q;frequency").unwrap();
        writeln!(file, "0.0;1.0;0.0;50.0").unwrap();
        writeln!(file, "0.5;1.0;0.1;50.0").unwrap();
        writeln!(file, "0.5;1.2;0.2;50.0").unwrap();
        writeln!(file, "1.0;0.9;0.3;49.9").unwrap();

        let channels = read_curve_csv(file.path()).unwrap();
        assert_eq!(
            channels.keys().copied().collect::<Vec<_>>(),
            vec![Signal::ActivePower, Signal::ReactivePower]
        );
        let p = &channels[&Signal::ActivePower];
        // Duplicate timestamp collapsed, first sample kept.
        assert_eq!(p.time(), &[0.0, 0.5, 1.0]);
        assert_eq!(p.values(), &[1.0, 1.0, 0.9]);
    }

    #[test]
    fn bad_number_is_a_parse_error() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "time,V").unwrap();
        writeln!(file, "0.0,abc").unwrap();
        let err = read_curve_csv(file.path()).unwrap_err();
        assert!(matches!(err, GcvError::Parse(_)));
    }

    #[test]
    fn missing_file_means_no_curves() {
        let dir = tempfile::tempdir().unwrap();
        let source = curve_source(CurveSourceSpec::Csv {
            path: dir.path().join("absent.csv"),
            event: event(),
            field_measurement: true,
            resample_fs: None,
        });
        assert!(source.load().unwrap().is_none());
        assert!(source.is_field_measurement());
    }

    #[test]
    fn csv_source_can_normalize_sampling() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "time,V").unwrap();
        writeln!(file, "0.0,1.0").unwrap();
        writeln!(file, "1.0,0.0").unwrap();
        let source = CsvCurves::new(file.path(), event()).resample_to(Some(4.0));
        let set = source.load().unwrap().unwrap();
        let v = set.channel(Signal::Voltage).unwrap();
        assert_eq!(v.values(), &[1.0, 0.75, 0.5, 0.25, 0.0]);
        assert_eq!(set.event, event());
    }

    #[test]
    fn simulated_source_hands_back_its_curves() {
        let series = TimeSeries::new(vec![0.0, 1.0], vec![1.0, 1.0]).unwrap();
        let set = CurveSet::new(event()).with_channel(Signal::Voltage, series);
        let source = curve_source(CurveSourceSpec::Simulated {
            curves: Some(set.clone()),
        });
        assert_eq!(source.load().unwrap(), Some(set));
        assert!(!source.is_field_measurement());
        assert!(SimulatedCurves::missing().load().unwrap().is_none());
    }
}
