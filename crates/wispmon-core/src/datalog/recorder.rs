//! Vcap recorder
//!
//! Drives the poll, frame, interpret, write loop against a monitor channel
//! and runs the termination sequence exactly once however the loop ends.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::future::Future;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{LogError, LogSession};
use crate::config::LoggerConfig;
use crate::protocol::{Command, CommunicationChannel, PacketReader, ProtocolError};

/// Why the logging loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Elapsed device time reached the configured sample time
    SampleTimeReached,
    /// The operator cancelled the run
    Interrupted,
    /// The channel reported end of stream (end of a replayed capture)
    ChannelClosed,
    /// A device, protocol or log file error ended the run
    Failed,
}

/// Statistics of a finished session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Records written to the log
    pub num_samples: usize,
    /// Elapsed device time in seconds at the last time packet
    pub elapsed_s: f64,
    /// Vcap samples dropped for lack of a preceding time packet
    pub orphaned: usize,
    /// Packets with descriptors the Vcap log does not use
    pub ignored: usize,
    /// Bytes dropped while resynchronising the stream
    pub dropped_bytes: usize,
    /// Why the loop ended
    pub reason: StopReason,
    /// Wall-clock start of the session
    pub started_at: DateTime<Local>,
    /// Wall-clock end of the session
    pub finished_at: DateTime<Local>,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} data points taken in {:.6} seconds",
            self.num_samples, self.elapsed_s
        )
    }
}

/// Outcome of a session that got as far as opening its log file.
///
/// The summary is always present; `error` is set when the run ended on a
/// failure after the termination sequence had completed.
#[derive(Debug)]
pub struct SessionReport {
    /// Session statistics
    pub summary: SessionSummary,
    /// Error that ended the run, if any
    pub error: Option<LogError>,
}

impl SessionReport {
    /// Convert into a plain result, discarding the summary on failure
    pub fn into_result(self) -> Result<SessionSummary, LogError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.summary),
        }
    }
}

/// Logs Vcap samples from the monitor to a text file
pub struct VcapLogger {
    config: LoggerConfig,
}

impl VcapLogger {
    /// Create a logger with the given configuration
    pub fn new(config: LoggerConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Run a logging session until the sample time is reached, `shutdown`
    /// completes, the channel closes, or an error occurs.
    ///
    /// Returns `Err` only when the log file cannot be created; in that case
    /// nothing has been sent to the monitor. Every later exit path sends the
    /// stop command, closes the log and yields a [`SessionReport`].
    pub async fn run<C, F>(&self, channel: C, shutdown: F) -> Result<SessionReport, LogError>
    where
        C: CommunicationChannel,
        F: Future,
    {
        let file = create_log_file(&self.config.log_file)?;
        let mut session = LogSession::new(
            BufWriter::new(file),
            self.config.monitor,
            self.config.sample_time_s,
        );
        let mut reader = PacketReader::new(channel);
        let started_at = Local::now();

        // Stale bytes from before this session would pair with the wrong time
        let begin = reader
            .channel_mut()
            .clear_input_buffer()
            .map_err(ProtocolError::from)
            .and_then(|()| reader.send_command(Command::LogVcapBegin));

        let outcome = match begin {
            Ok(()) => {
                info!(
                    log_file = %self.config.log_file.display(),
                    sample_time_s = self.config.sample_time_s,
                    "Logging... Ctrl-C to stop"
                );
                tokio::select! {
                    result = pump(&mut reader, &mut session, self.config.idle_sleep()) => result,
                    _ = shutdown => {
                        info!("Interrupted by operator");
                        Ok(StopReason::Interrupted)
                    }
                }
            }
            Err(e) => Err(LogError::from(e)),
        };
        session.stop();

        Ok(finish(reader, session, outcome, started_at))
    }
}

fn create_log_file(path: &Path) -> Result<File, LogError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(LogError::LogFile)?;
    }
    File::create(path).map_err(LogError::LogFile)
}

/// The polling loop. Cancellation can only land on an await point, which
/// sits between packets, so a record is either fully written or not at all.
async fn pump<C, W>(
    reader: &mut PacketReader<C>,
    session: &mut LogSession<W>,
    idle: Duration,
) -> Result<StopReason, LogError>
where
    C: CommunicationChannel,
    W: std::io::Write,
{
    loop {
        let received = match reader.poll() {
            Ok(n) => n,
            Err(ProtocolError::ChannelClosed) => {
                info!("Channel closed");
                drain(reader, session)?;
                return Ok(StopReason::ChannelClosed);
            }
            Err(e) => return Err(e.into()),
        };

        if drain(reader, session)? {
            return Ok(StopReason::SampleTimeReached);
        }

        if received == 0 && !idle.is_zero() {
            tokio::time::sleep(idle).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

/// Hand buffered packets to the session. Returns true once it is stopping.
fn drain<C, W>(reader: &mut PacketReader<C>, session: &mut LogSession<W>) -> Result<bool, LogError>
where
    C: CommunicationChannel,
    W: std::io::Write,
{
    while !session.is_stopping() {
        let Some(mut packet) = reader.next_packet() else {
            break;
        };
        session.handle_packet(&mut packet)?;
    }
    Ok(session.is_stopping())
}

/// Termination sequence: stop command, close the log, report.
///
/// Takes the reader and session by value so it can only run once.
fn finish<C, W>(
    mut reader: PacketReader<C>,
    session: LogSession<W>,
    outcome: Result<StopReason, LogError>,
    started_at: DateTime<Local>,
) -> SessionReport
where
    C: CommunicationChannel,
    W: std::io::Write,
{
    let (reason, mut first_error) = match outcome {
        Ok(reason) => (reason, None),
        Err(e) => (StopReason::Failed, Some(e)),
    };

    // Best effort once something has already gone wrong
    if let Err(e) = reader.send_command(Command::LogVcapEnd) {
        if first_error.is_some() {
            warn!(error = %e, "Failed to send stop command");
        } else {
            first_error = Some(e.into());
        }
    }

    let num_samples = session.num_samples();
    let elapsed_s = session.elapsed_seconds();
    let orphaned = session.orphaned();
    let ignored = session.ignored();

    if let Err(e) = session.close() {
        if first_error.is_some() {
            warn!(error = %e, "Failed to close log file");
        } else {
            first_error = Some(e);
        }
    }

    let summary = SessionSummary {
        num_samples,
        elapsed_s,
        orphaned,
        ignored,
        dropped_bytes: reader.framer().dropped_bytes(),
        reason: if first_error.is_some() {
            StopReason::Failed
        } else {
            reason
        },
        started_at,
        finished_at: Local::now(),
    };

    match &first_error {
        Some(e) => error!(error = %e, samples = num_samples, "Logging session failed"),
        None => info!(
            samples = num_samples,
            elapsed_s,
            orphaned,
            ignored,
            reason = ?summary.reason,
            "Logging session finished"
        ),
    }

    SessionReport {
        summary,
        error: first_error,
    }
}
