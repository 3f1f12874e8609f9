//! Logger configuration
//!
//! Settings for a Vcap logging run, loadable from a JSON file. Every field
//! has a default, so a config file only needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::protocol::DEFAULT_BAUD_RATE;

/// Errors raised while loading or validating a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Constants of the attached monitor hardware
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConstants {
    /// ADC reference voltage in volts
    pub vdd: f64,
    /// Average frequency of the monitor's cycle counter in Hz
    pub clk_freq_hz: f64,
}

impl MonitorConstants {
    /// Seconds represented by one counter cycle
    pub fn clk_period(&self) -> f64 {
        1.0 / self.clk_freq_hz
    }
}

impl Default for MonitorConstants {
    fn default() -> Self {
        Self {
            vdd: 3.35,
            // DCO multiplier 669 on the 32.768 kHz reference
            clk_freq_hz: 669.0 * 32768.0,
        }
    }
}

/// Configuration for a Vcap logging run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Serial port the monitor is attached to
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Text log to create
    pub log_file: PathBuf,
    /// Device time to log for, in seconds
    pub sample_time_s: f64,
    /// Sleep between polls that returned no data, in microseconds (0 only yields)
    pub idle_sleep_us: u64,
    /// Hardware constants
    pub monitor: MonitorConstants,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            port_name: default_port_name().to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            log_file: PathBuf::from("data/vcap.log"),
            sample_time_s: 1.0,
            idle_sleep_us: 200,
            monitor: MonitorConstants::default(),
        }
    }
}

#[cfg(target_os = "windows")]
fn default_port_name() -> &'static str {
    "COM17"
}

#[cfg(not(target_os = "windows"))]
fn default_port_name() -> &'static str {
    "/dev/ttyUSB0"
}

impl LoggerConfig {
    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: LoggerConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values describe a run that can terminate
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_time_s > 0.0 && self.sample_time_s.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "sample_time_s must be positive, got {}",
                self.sample_time_s
            )));
        }
        if !(self.monitor.vdd > 0.0 && self.monitor.vdd.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "monitor.vdd must be positive, got {}",
                self.monitor.vdd
            )));
        }
        if !(self.monitor.clk_freq_hz > 0.0 && self.monitor.clk_freq_hz.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "monitor.clk_freq_hz must be positive, got {}",
                self.monitor.clk_freq_hz
            )));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be non-zero".into()));
        }
        Ok(())
    }

    /// Idle sleep as a duration
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_micros(self.idle_sleep_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::default();
        assert_eq!(config.baud_rate, 921_600);
        assert_eq!(config.sample_time_s, 1.0);
        assert_eq!(config.monitor.vdd, 3.35);
        assert_eq!(config.monitor.clk_freq_hz, 21_921_792.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "sample_time_s": 2.5, "monitor": {{ "vdd": 3.3 }} }}"#
        )
        .unwrap();

        let config = LoggerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.sample_time_s, 2.5);
        assert_eq!(config.monitor.vdd, 3.3);
        assert_eq!(config.monitor.clk_freq_hz, 21_921_792.0);
        assert_eq!(config.log_file, PathBuf::from("data/vcap.log"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = LoggerConfig::default();
        config.sample_time_s = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = LoggerConfig::default();
        config.monitor.clk_freq_hz = -1.0;
        assert!(config.validate().is_err());

        let mut config = LoggerConfig::default();
        config.baud_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            LoggerConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            LoggerConfig::from_file("/nonexistent/wispmon.json"),
            Err(ConfigError::Read { .. })
        ));
    }
}
