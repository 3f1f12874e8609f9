//! # WISP Monitor Core Library
//!
//! Host-side functionality for the WISP debug monitor.

#![warn(missing_docs)]

//!
//! This library provides:
//! - Serial framing of the monitor's response stream
//! - Monitor command encoding
//! - Vcap logging sessions that write timestamped voltage samples to a text log
//! - The measured PWM (period, duty) to Vcap calibration table
//!
//! ## Example
//!
//! ```rust,ignore
//! use wispmon_core::{config::LoggerConfig, datalog::VcapLogger, protocol::open_channel};
//!
//! let config = LoggerConfig::default();
//! let channel = open_channel(&config.port_name, config.baud_rate)?;
//! let report = VcapLogger::new(config).run(channel, tokio::signal::ctrl_c()).await?;
//! println!("{}", report.summary);
//! ```

pub mod calibration;
pub mod config;
pub mod datalog;
pub mod protocol;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::calibration::CalibrationTable;
    pub use crate::config::{LoggerConfig, MonitorConstants};
    pub use crate::datalog::{LogLine, SessionSummary, VcapLogger};
    pub use crate::protocol::{Command, PacketReader, ProtocolError, RawPacket, Response};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
