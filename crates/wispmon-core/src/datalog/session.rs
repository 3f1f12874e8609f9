//! Logging session state
//!
//! Interprets packets from the monitor and writes paired time/Vcap records.

use std::io::Write;
use tracing::{debug, info, warn};

use super::{LogError, LogLine, TimeSample, VcapSample};
use crate::config::MonitorConstants;
use crate::protocol::{RawPacket, Response};

/// Lifecycle of a logging session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No time packet seen yet
    Starting,
    /// Time reference established, samples are being written
    Running,
    /// Sample time reached or interrupted; no more packets are handled
    Stopping,
}

/// What handling a packet did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacketEffect {
    /// Device time advanced to the given sample
    Time(TimeSample),
    /// A record was written to the log
    Written(LogLine),
    /// A Vcap sample arrived before any time packet and was not written
    Orphaned(VcapSample),
    /// The packet carries nothing the Vcap log uses
    Ignored,
}

/// Extends the monitor's wrapping 32-bit counter into elapsed cycles
#[derive(Debug, Clone, Copy)]
struct CycleClock {
    last: u32,
    elapsed: u64,
}

impl CycleClock {
    fn starting_at(cycles: u32) -> Self {
        Self {
            last: cycles,
            elapsed: 0,
        }
    }

    fn advance(&mut self, cycles: u32) -> u64 {
        self.elapsed += u64::from(cycles.wrapping_sub(self.last));
        self.last = cycles;
        self.elapsed
    }
}

/// Explicit context for one logging run.
///
/// Owns the log writer for the whole run; [`LogSession::close`] flushes
/// and releases it.
pub struct LogSession<W: Write> {
    writer: W,
    constants: MonitorConstants,
    sample_time_s: f64,
    state: SessionState,
    clock: Option<CycleClock>,
    current_time: Option<TimeSample>,
    num_samples: usize,
    orphaned: usize,
    ignored: usize,
}

impl<W: Write> LogSession<W> {
    /// Create a session writing to `writer`
    pub fn new(writer: W, constants: MonitorConstants, sample_time_s: f64) -> Self {
        Self {
            writer,
            constants,
            sample_time_s,
            state: SessionState::Starting,
            clock: None,
            current_time: None,
            num_samples: 0,
            orphaned: 0,
            ignored: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the loop should stop handing packets to this session
    pub fn is_stopping(&self) -> bool {
        self.state == SessionState::Stopping
    }

    /// Move to [`SessionState::Stopping`], e.g. on operator interrupt
    pub fn stop(&mut self) {
        self.state = SessionState::Stopping;
    }

    /// Number of records written
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Vcap samples dropped because no time packet preceded them
    pub fn orphaned(&self) -> usize {
        self.orphaned
    }

    /// Packets that carried nothing for the Vcap log
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    /// Elapsed device time in seconds (0 before the first time packet)
    pub fn elapsed_seconds(&self) -> f64 {
        self.current_time.map_or(0.0, |t| t.seconds)
    }

    /// Handle one packet and mark it processed, whatever its descriptor
    pub fn handle_packet(&mut self, packet: &mut RawPacket) -> Result<PacketEffect, LogError> {
        let result = self.dispatch(packet);
        packet.mark_processed();
        result
    }

    fn dispatch(&mut self, packet: &RawPacket) -> Result<PacketEffect, LogError> {
        if self.is_stopping() {
            return Ok(PacketEffect::Ignored);
        }

        match packet.response() {
            Some(Response::Time) => {
                let cycles = packet.time_cycles()?;
                Ok(PacketEffect::Time(self.on_time(cycles)))
            }
            Some(Response::Vcap) => {
                let code = packet.adc_code()?;
                self.on_vcap(code)
            }
            other => {
                debug!(descriptor = packet.descriptor, response = ?other, "Ignoring packet");
                self.ignored += 1;
                Ok(PacketEffect::Ignored)
            }
        }
    }

    fn on_time(&mut self, cycles: u32) -> TimeSample {
        let elapsed = match self.clock.as_mut() {
            Some(clock) => clock.advance(cycles),
            None => {
                info!(start_cycles = cycles, "Time reference established");
                self.clock = Some(CycleClock::starting_at(cycles));
                self.state = SessionState::Running;
                0
            }
        };

        let sample = TimeSample::from_cycles(elapsed, self.constants.clk_period());
        self.current_time = Some(sample);

        if sample.seconds >= self.sample_time_s {
            info!(elapsed_s = sample.seconds, "Sample time reached");
            self.state = SessionState::Stopping;
        }
        sample
    }

    fn on_vcap(&mut self, code: u16) -> Result<PacketEffect, LogError> {
        let vcap = VcapSample::from_code(code, self.constants.vdd);

        let Some(time) = self.current_time else {
            self.orphaned += 1;
            warn!(code, "Vcap sample before any time packet, not logged");
            return Ok(PacketEffect::Orphaned(vcap));
        };

        let line = LogLine::new(&time, &vcap);
        // One write per record so an interrupted run never ends mid-line
        self.writer
            .write_all(line.to_string().as_bytes())
            .map_err(LogError::LogFile)?;
        self.num_samples += 1;
        Ok(PacketEffect::Written(line))
    }

    /// Flush and release the writer
    pub fn close(mut self) -> Result<W, LogError> {
        self.state = SessionState::Stopping;
        self.writer.flush().map_err(LogError::LogFile)?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn constants() -> MonitorConstants {
        MonitorConstants {
            vdd: 3.3,
            clk_freq_hz: 1e6,
        }
    }

    fn time(cycles: u32) -> RawPacket {
        RawPacket::new(Response::Time.code(), cycles.to_le_bytes().to_vec())
    }

    fn vcap(code: u16) -> RawPacket {
        RawPacket::new(Response::Vcap.code(), code.to_le_bytes().to_vec())
    }

    fn run(packets: Vec<RawPacket>, sample_time_s: f64) -> (LogSession<Vec<u8>>, Vec<PacketEffect>) {
        let mut session = LogSession::new(Vec::new(), constants(), sample_time_s);
        let mut effects = Vec::new();
        for mut packet in packets {
            effects.push(session.handle_packet(&mut packet).unwrap());
            assert!(packet.is_processed());
        }
        (session, effects)
    }

    #[test]
    fn test_time_then_vcap() {
        let (session, _) = run(vec![time(0), vcap(2048)], 1.0);
        assert_eq!(session.num_samples(), 1);
        let out = String::from_utf8(session.close().unwrap()).unwrap();
        assert_eq!(out, "t = 0.000000\tVcap = 1.650000\n");
    }

    #[test]
    fn test_elapsed_relative_to_first_time() {
        let (session, effects) = run(vec![time(5_000_000), vcap(0), time(5_250_000), vcap(4095)], 1.0);
        assert_eq!(session.state(), SessionState::Running);
        match effects[0] {
            PacketEffect::Time(t) => assert_eq!(t.seconds, 0.0),
            other => panic!("unexpected {:?}", other),
        }
        let out = String::from_utf8(session.close().unwrap()).unwrap();
        assert_eq!(
            out,
            "t = 0.000000\tVcap = 0.000000\nt = 0.250000\tVcap = 3.299194\n"
        );
    }

    #[test]
    fn test_stops_at_sample_time() {
        let (session, effects) = run(
            vec![time(0), vcap(1), time(999_999), vcap(2), time(1_000_001), vcap(3)],
            1.0,
        );
        assert_eq!(session.state(), SessionState::Stopping);
        assert_eq!(session.num_samples(), 2);
        assert_eq!(effects[5], PacketEffect::Ignored);
    }

    #[test]
    fn test_vcap_before_time_is_orphaned() {
        let (session, effects) = run(vec![vcap(100), time(10), vcap(200)], 1.0);
        assert!(matches!(effects[0], PacketEffect::Orphaned(v) if v.code == 100));
        assert_eq!(session.orphaned(), 1);
        assert_eq!(session.num_samples(), 1);
        let out = String::from_utf8(session.close().unwrap()).unwrap();
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn test_other_descriptors_are_processed_and_ignored() {
        let (session, effects) = run(
            vec![
                time(0),
                RawPacket::new(Response::Vboost.code(), vec![0, 1]),
                RawPacket::new(Response::TagPwr.code(), vec![]),
                RawPacket::new(0x55, vec![]),
            ],
            1.0,
        );
        assert_eq!(&effects[1..], &[PacketEffect::Ignored; 3]);
        assert_eq!(session.ignored(), 3);
    }

    #[test]
    fn test_counter_wrap() {
        let start = u32::MAX - 99;
        let (session, effects) = run(vec![time(start), time(100)], 1.0);
        match effects[1] {
            PacketEffect::Time(t) => assert_eq!(t.cycles, 200),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.elapsed_seconds(), 200.0 * 1e-6);
    }

    #[test]
    fn test_malformed_time_payload_is_an_error() {
        let mut session = LogSession::new(Vec::new(), constants(), 1.0);
        let mut packet = RawPacket::new(Response::Time.code(), vec![1, 2]);
        assert!(session.handle_packet(&mut packet).is_err());
        assert!(packet.is_processed());
    }
}
