//! Command-line parsing

use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage:
  wispmon log [OPTIONS]                 Log Vcap samples to a text file
  wispmon ports                         List serial ports
  wispmon calibration lookup PERIOD DUTY
  wispmon calibration closest VOLTS
  wispmon calibration show [--json]
  wispmon help

Log options:
  --config FILE       JSON config file (flags below override it)
  --port, -p PORT     Serial port
  --baud, -b RATE     Baud rate (default: 921600)
  --out, -o FILE      Log file (default: data/vcap.log)
  --sample-time, -t S Device seconds to log for (default: 1.0)
  --idle-us N         Sleep between empty polls in microseconds (default: 200)
  --vdd VOLTS         ADC reference voltage (default: 3.35)
  --clk-hz HZ         Monitor clock frequency (default: 21921792)
  --replay FILE       Read a captured byte dump instead of a serial port
";

/// Overrides given on the command line for `log`
#[derive(Debug, Default, PartialEq)]
pub struct LogArgs {
    pub config: Option<PathBuf>,
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub out: Option<PathBuf>,
    pub sample_time_s: Option<f64>,
    pub idle_sleep_us: Option<u64>,
    pub vdd: Option<f64>,
    pub clk_freq_hz: Option<f64>,
    pub replay: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
pub enum CalibrationCmd {
    Lookup { period: u16, duty: u16 },
    Closest { volts: f64 },
    Show { json: bool },
}

#[derive(Debug, PartialEq)]
pub enum Cli {
    Log(LogArgs),
    Ports,
    Calibration(CalibrationCmd),
    Help,
}

fn value<'a>(args: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<&'a String> {
    args.next()
        .ok_or_else(|| anyhow!("missing value for {}", flag))
}

fn parse_value<'a, T>(args: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = value(args, flag)?;
    raw.parse()
        .with_context(|| format!("invalid value '{}' for {}", raw, flag))
}

/// Parse arguments, excluding the program name
pub fn parse(args: &[String]) -> Result<Cli> {
    let mut iter = args.iter();
    let Some(command) = iter.next() else {
        return Ok(Cli::Help);
    };

    match command.as_str() {
        "log" => parse_log(iter).map(Cli::Log),
        "ports" => Ok(Cli::Ports),
        "calibration" | "cal" => parse_calibration(iter).map(Cli::Calibration),
        "help" | "--help" | "-h" => Ok(Cli::Help),
        other => bail!("unknown command '{}'", other),
    }
}

fn parse_log<'a>(mut iter: impl Iterator<Item = &'a String>) -> Result<LogArgs> {
    let mut log = LogArgs::default();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => log.config = Some(value(&mut iter, arg)?.into()),
            "--port" | "-p" => log.port = Some(value(&mut iter, arg)?.clone()),
            "--baud" | "-b" => log.baud = Some(parse_value(&mut iter, arg)?),
            "--out" | "-o" => log.out = Some(value(&mut iter, arg)?.into()),
            "--sample-time" | "-t" => log.sample_time_s = Some(parse_value(&mut iter, arg)?),
            "--idle-us" => log.idle_sleep_us = Some(parse_value(&mut iter, arg)?),
            "--vdd" => log.vdd = Some(parse_value(&mut iter, arg)?),
            "--clk-hz" => log.clk_freq_hz = Some(parse_value(&mut iter, arg)?),
            "--replay" => log.replay = Some(value(&mut iter, arg)?.into()),
            other => bail!("unknown option '{}' for log", other),
        }
    }
    Ok(log)
}

fn parse_calibration<'a>(mut iter: impl Iterator<Item = &'a String>) -> Result<CalibrationCmd> {
    let sub = iter.next().map(String::as_str).unwrap_or("show");
    let cmd = match sub {
        "lookup" => CalibrationCmd::Lookup {
            period: parse_value(&mut iter, "PERIOD")?,
            duty: parse_value(&mut iter, "DUTY")?,
        },
        "closest" => CalibrationCmd::Closest {
            volts: parse_value(&mut iter, "VOLTS")?,
        },
        "show" => {
            let json = match iter.next().map(String::as_str) {
                None => false,
                Some("--json") => true,
                Some(other) => bail!("unknown option '{}' for calibration show", other),
            };
            CalibrationCmd::Show { json }
        }
        other => bail!("unknown calibration command '{}'", other),
    };
    if let Some(extra) = iter.next() {
        bail!("unexpected argument '{}'", extra);
    }
    Ok(cmd)
}
