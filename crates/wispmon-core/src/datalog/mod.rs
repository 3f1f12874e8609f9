//! Data Logging
//!
//! Records Vcap samples streamed by the monitor to a human-readable text log.
//!
//! Each record pairs the most recent time sample with one Vcap sample:
//!
//! ```text
//! t = 0.000000	Vcap = 1.650000
//! ```

mod recorder;
mod session;

pub use recorder::{SessionReport, SessionSummary, StopReason, VcapLogger};
pub use session::{LogSession, PacketEffect, SessionState};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::protocol::ProtocolError;
use crate::units::{adc_to_volts, cycles_to_seconds};

/// Errors that end a logging session
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Log file error: {0}")]
    LogFile(#[source] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Device time, relative to the first time packet of the session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSample {
    /// Elapsed counter cycles since the first time packet
    pub cycles: u64,
    /// Elapsed seconds
    pub seconds: f64,
}

impl TimeSample {
    /// Build a sample from elapsed cycles and the clock period
    pub fn from_cycles(cycles: u64, clk_period: f64) -> Self {
        Self {
            cycles,
            seconds: cycles_to_seconds(cycles, clk_period),
        }
    }
}

/// One Vcap reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VcapSample {
    /// Raw 12-bit ADC code
    pub code: u16,
    /// Voltage in volts
    pub volts: f64,
}

impl VcapSample {
    /// Build a sample from an ADC code and the reference voltage
    pub fn from_code(code: u16, vdd: f64) -> Self {
        Self {
            code,
            volts: adc_to_volts(code, vdd),
        }
    }
}

/// A single record of the text log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogLine {
    /// Elapsed device time in seconds
    pub t: f64,
    /// Capacitor voltage in volts
    pub vcap: f64,
}

impl LogLine {
    /// Pair a time sample with a Vcap sample
    pub fn new(time: &TimeSample, vcap: &VcapSample) -> Self {
        Self {
            t: time.seconds,
            vcap: vcap.volts,
        }
    }

    /// Parse a line previously written by [`LogLine`]'s `Display`
    ///
    /// The trailing newline is optional.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let rest = line.strip_prefix("t = ")?;
        let (t, vcap) = rest.split_once("\tVcap = ")?;
        Some(Self {
            t: t.parse().ok()?,
            vcap: vcap.parse().ok()?,
        })
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "t = {:.6}\tVcap = {:.6}", self.t, self.vcap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let time = TimeSample::from_cycles(0, 1e-6);
        let vcap = VcapSample::from_code(2048, 3.3);
        assert_eq!(
            LogLine::new(&time, &vcap).to_string(),
            "t = 0.000000\tVcap = 1.650000\n"
        );
    }

    #[test]
    fn test_line_parse() {
        let line = LogLine::parse("t = 0.250000\tVcap = 2.011230\n").unwrap();
        assert_eq!(line.t, 0.25);
        assert_eq!(line.vcap, 2.01123);
        assert!(LogLine::parse("t = 0.250000\tVcap = 2.011230").is_some());
    }

    #[test]
    fn test_line_parse_rejects_garbage() {
        assert!(LogLine::parse("").is_none());
        assert!(LogLine::parse("Vcap = 1.0\n").is_none());
        assert!(LogLine::parse("t = x\tVcap = 1.0\n").is_none());
        assert!(LogLine::parse("t = 1.0 Vcap = 1.0\n").is_none());
    }

    #[test]
    fn test_formatted_values_survive_parse() {
        let vdd = 3.35;
        let period = 1.0 / 21_921_792.0;
        for (cycles, code) in [(0u64, 0u16), (123_456, 1), (21_921_792, 4095), (7, 2731)] {
            let line = LogLine::new(
                &TimeSample::from_cycles(cycles, period),
                &VcapSample::from_code(code, vdd),
            );
            let parsed = LogLine::parse(&line.to_string()).unwrap();
            assert!((parsed.t - line.t).abs() < 1e-6);
            assert!((parsed.vcap - line.vcap).abs() < 1e-6);
        }
    }
}
