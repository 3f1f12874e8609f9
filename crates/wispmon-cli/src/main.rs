//! WISP monitor command-line tool
//!
//! Logs Vcap from the monitor to a text file and exposes the measured PWM
//! calibration table.
//!
//! Usage:
//!   wispmon log --port /dev/ttyUSB0 --sample-time 2.0
//!   wispmon log --replay capture.bin --out data/replayed.log
//!   wispmon calibration lookup 512 256

mod args;

use anyhow::{Context, Result};
use std::fs;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use wispmon_core::calibration::CalibrationTable;
use wispmon_core::config::{LoggerConfig, MonitorConstants};
use wispmon_core::datalog::VcapLogger;
use wispmon_core::protocol::{
    list_ports, open_channel, CommunicationChannel, EndOfInput, MemoryChannel,
};
use wispmon_core::units::volts_to_adc;

use args::{CalibrationCmd, Cli, LogArgs, USAGE};

/// Bytes handed to the logger per poll when replaying a capture
const REPLAY_CHUNK_SIZE: usize = 64;

fn build_config(log: &LogArgs) -> Result<LoggerConfig> {
    let mut config = match &log.config {
        Some(path) => LoggerConfig::from_file(path)?,
        None => LoggerConfig::default(),
    };

    if let Some(port) = &log.port {
        config.port_name = port.clone();
    }
    if let Some(baud) = log.baud {
        config.baud_rate = baud;
    }
    if let Some(out) = &log.out {
        config.log_file = out.clone();
    }
    if let Some(t) = log.sample_time_s {
        config.sample_time_s = t;
    }
    if let Some(us) = log.idle_sleep_us {
        config.idle_sleep_us = us;
    }
    if let Some(vdd) = log.vdd {
        config.monitor.vdd = vdd;
    }
    if let Some(hz) = log.clk_freq_hz {
        config.monitor.clk_freq_hz = hz;
    }

    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C; run until sample time");
        std::future::pending::<()>().await;
    }
}

async fn run_log(log: LogArgs) -> Result<()> {
    let config = build_config(&log)?;

    let channel: Box<dyn CommunicationChannel> = match &log.replay {
        Some(path) => {
            let data = fs::read(path)
                .with_context(|| format!("failed to read capture {}", path.display()))?;
            Box::new(MemoryChannel::from_bytes(
                &data,
                REPLAY_CHUNK_SIZE,
                EndOfInput::Closed,
            ))
        }
        None => Box::new(
            open_channel(&config.port_name, config.baud_rate)
                .with_context(|| format!("failed to open {}", config.port_name))?,
        ),
    };

    let report = VcapLogger::new(config)
        .run(channel, shutdown_signal())
        .await
        .context("failed to start logging session")?;

    println!("{}", report.summary);
    report.into_result().context("logging session failed")?;
    Ok(())
}

fn run_ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!(
                "{}\t{:04x}:{:04x}\t{}",
                port.name,
                vid,
                pid,
                port.product.as_deref().unwrap_or("")
            ),
            _ => println!("{}", port.name),
        }
    }
}

fn run_calibration(cmd: CalibrationCmd) -> Result<()> {
    let table = CalibrationTable::measured();
    match cmd {
        CalibrationCmd::Lookup { period, duty } => match table.lookup(period, duty) {
            Some(volts) => println!("{:.3} V", volts),
            None => anyhow::bail!("no measurement for period {} duty {}", period, duty),
        },
        CalibrationCmd::Closest { volts } => match table.closest(volts) {
            Some(p) => {
                let vdd = MonitorConstants::default().vdd;
                println!(
                    "period {} duty {} -> {:.3} V (measured, ADC {} at VDD {} V)",
                    p.period,
                    p.duty,
                    p.volts,
                    volts_to_adc(p.volts, vdd),
                    vdd
                );
            }
            None => anyhow::bail!("no measurement near {} V", volts),
        },
        CalibrationCmd::Show { json: true } => {
            println!("{}", serde_json::to_string_pretty(table)?);
        }
        CalibrationCmd::Show { json: false } => {
            for period in table.periods() {
                println!("period {}:", period);
                for (duty, volts) in table.duties(period).into_iter().flatten() {
                    println!("  duty {:>3}  {:.3} V", duty, volts);
                }
            }
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    match args::parse(&argv)? {
        Cli::Log(log) => run_log(log).await,
        Cli::Ports => {
            run_ports();
            Ok(())
        }
        Cli::Calibration(cmd) => run_calibration(cmd),
        Cli::Help => {
            print!("{}", USAGE);
            Ok(())
        }
    }
}
