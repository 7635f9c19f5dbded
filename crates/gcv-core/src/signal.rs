//! Keys used to index comparison results: which electrical quantity, which
//! analysis window and which error statistic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GcvError;

/// Electrical quantity measured at the point of common coupling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Voltage,
    ActivePower,
    ReactivePower,
    ActiveCurrent,
    ReactiveCurrent,
    Current,
}

impl Signal {
    pub const ALL: [Signal; 6] = [
        Signal::Voltage,
        Signal::ActivePower,
        Signal::ReactivePower,
        Signal::ActiveCurrent,
        Signal::ReactiveCurrent,
        Signal::Current,
    ];

    /// Short channel name used in curve files and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Voltage => "V",
            Signal::ActivePower => "P",
            Signal::ReactivePower => "Q",
            Signal::ActiveCurrent => "Ip",
            Signal::ReactiveCurrent => "Iq",
            Signal::Current => "I",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = GcvError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_ascii_lowercase();
        let signal = match normalized.as_str() {
            "v" | "u" | "voltage" | "ustator" => Signal::Voltage,
            "p" | "active_power" => Signal::ActivePower,
            "q" | "reactive_power" => Signal::ReactivePower,
            "ip" | "active_current" => Signal::ActiveCurrent,
            "iq" | "reactive_current" => Signal::ReactiveCurrent,
            "i" | "current" => Signal::Current,
            _ => {
                return Err(GcvError::Parse(format!(
                    "unknown signal '{}'; expected one of V, P, Q, Ip, Iq, I",
                    input
                )))
            }
        };
        Ok(signal)
    }
}

/// Analysis window relative to the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    Before,
    During,
    After,
}

impl Window {
    pub const ALL: [Window; 3] = [Window::Before, Window::During, Window::After];

    pub fn as_str(&self) -> &'static str {
        match self {
            Window::Before => "before",
            Window::During => "during",
            Window::After => "after",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error statistic computed per (signal, window).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    MaxError,
    MeanError,
    MeanAbsoluteError,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [
        MetricKind::MaxError,
        MetricKind::MeanError,
        MetricKind::MeanAbsoluteError,
    ];

    pub fn abbreviation(&self) -> &'static str {
        match self {
            MetricKind::MaxError => "mxe",
            MetricKind::MeanError => "me",
            MetricKind::MeanAbsoluteError => "mae",
        }
    }
}
