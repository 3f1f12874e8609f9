//! Packet framing
//!
//! Splits the monitor's response byte stream into packets.
//!
//! Frame format:
//! - 1 byte: identifier (`0xF0`)
//! - 1 byte: response descriptor
//! - 1 byte: payload length (absent for descriptors without payload)
//! - N bytes: payload

use byteorder::{ByteOrder, LittleEndian};
use tracing::warn;

use super::{ProtocolError, Response, UART_USB_IDENTIFIER};

/// A packet received from the monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    /// Descriptor byte identifying the payload kind
    pub descriptor: u8,
    /// Raw payload bytes
    pub payload: Vec<u8>,
    processed: bool,
}

impl RawPacket {
    /// Create an unprocessed packet
    pub fn new(descriptor: u8, payload: Vec<u8>) -> Self {
        Self {
            descriptor,
            payload,
            processed: false,
        }
    }

    /// Decoded descriptor, if known
    pub fn response(&self) -> Option<Response> {
        Response::from_byte(self.descriptor)
    }

    /// Whether the consumer has handled this packet
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Mark the packet as handled
    pub fn mark_processed(&mut self) {
        self.processed = true;
    }

    /// Cycle count carried by a TIME packet
    pub fn time_cycles(&self) -> Result<u32, ProtocolError> {
        self.expect_len(4)?;
        Ok(LittleEndian::read_u32(&self.payload))
    }

    /// ADC code carried by a VCAP (or other ADC sample) packet
    pub fn adc_code(&self) -> Result<u16, ProtocolError> {
        self.expect_len(2)?;
        Ok(LittleEndian::read_u16(&self.payload))
    }

    /// Encode the packet as the monitor would send it
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3 + self.payload.len());
        bytes.push(UART_USB_IDENTIFIER);
        bytes.push(self.descriptor);
        if self.response().map_or(true, |r| r.has_payload()) {
            bytes.push(self.payload.len() as u8);
            bytes.extend_from_slice(&self.payload);
        }
        bytes
    }

    fn expect_len(&self, expected: usize) -> Result<(), ProtocolError> {
        if self.payload.len() != expected {
            return Err(ProtocolError::PayloadLength {
                descriptor: self.descriptor,
                expected,
                actual: self.payload.len(),
            });
        }
        Ok(())
    }
}

/// Why bytes were dropped from the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    /// A byte outside any frame
    Junk(u8),
    /// A frame with a descriptor the monitor never sends
    UnknownDescriptor(u8),
    /// A fixed-layout frame whose declared length is wrong
    BadLength {
        /// Descriptor of the frame
        descriptor: u8,
        /// Length the descriptor requires
        expected: usize,
        /// Length the frame declared
        actual: usize,
    },
}

/// Result of one framing attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A complete packet; its bytes have been consumed
    Packet(RawPacket),
    /// Not enough bytes yet; the buffer is untouched
    Incomplete,
    /// Bytes were dropped to resynchronise on the next identifier
    Discarded(Discard),
}

/// Stateless framer plus resynchronisation bookkeeping
#[derive(Debug, Default)]
pub struct PacketFramer {
    in_junk: bool,
    dropped_bytes: usize,
    discarded_frames: usize,
}

impl PacketFramer {
    /// Create a new framer
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes dropped while resynchronising
    pub fn dropped_bytes(&self) -> usize {
        self.dropped_bytes
    }

    /// Number of frames dropped for an unknown descriptor or bad length
    pub fn discarded_frames(&self) -> usize {
        self.discarded_frames
    }

    /// Try to take one complete frame off the front of `buffer`.
    ///
    /// On success the frame's bytes are drained from the buffer. When the
    /// buffer holds only part of a frame it is left untouched.
    pub fn try_build_packet(&mut self, buffer: &mut Vec<u8>) -> FrameOutcome {
        let Some(&first) = buffer.first() else {
            return FrameOutcome::Incomplete;
        };

        if first != UART_USB_IDENTIFIER {
            if !self.in_junk {
                warn!(byte = first, "Unexpected byte outside frame, resynchronising");
                self.in_junk = true;
            }
            buffer.remove(0);
            self.dropped_bytes += 1;
            return FrameOutcome::Discarded(Discard::Junk(first));
        }
        self.in_junk = false;

        let Some(&descriptor) = buffer.get(1) else {
            return FrameOutcome::Incomplete;
        };

        let Some(response) = Response::from_byte(descriptor) else {
            warn!(descriptor, "Unknown packet descriptor, dropping");
            buffer.drain(..2);
            self.dropped_bytes += 2;
            self.discarded_frames += 1;
            return FrameOutcome::Discarded(Discard::UnknownDescriptor(descriptor));
        };

        if !response.has_payload() {
            buffer.drain(..2);
            return FrameOutcome::Packet(RawPacket::new(descriptor, Vec::new()));
        }

        let Some(&len) = buffer.get(2) else {
            return FrameOutcome::Incomplete;
        };
        let len = len as usize;
        let frame_len = 3 + len;
        if buffer.len() < frame_len {
            return FrameOutcome::Incomplete;
        }

        if let Some(expected) = response.fixed_payload_len() {
            if expected != len {
                warn!(descriptor, expected, actual = len, "Malformed packet, dropping");
                buffer.drain(..frame_len);
                self.dropped_bytes += frame_len;
                self.discarded_frames += 1;
                return FrameOutcome::Discarded(Discard::BadLength {
                    descriptor,
                    expected,
                    actual: len,
                });
            }
        }

        let payload = buffer[3..frame_len].to_vec();
        buffer.drain(..frame_len);
        FrameOutcome::Packet(RawPacket::new(descriptor, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_packet() {
        let mut buf = vec![0xF0, 0x0D, 0x04, 0x78, 0x56, 0x34, 0x12];
        let mut framer = PacketFramer::new();
        match framer.try_build_packet(&mut buf) {
            FrameOutcome::Packet(pkt) => {
                assert_eq!(pkt.response(), Some(Response::Time));
                assert_eq!(pkt.time_cycles().unwrap(), 0x1234_5678);
                assert!(!pkt.is_processed());
            }
            other => panic!("expected packet, got {:?}", other),
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn test_incomplete_leaves_buffer() {
        let mut framer = PacketFramer::new();
        for partial in [
            vec![0xF0],
            vec![0xF0, 0x00],
            vec![0xF0, 0x00, 0x02],
            vec![0xF0, 0x00, 0x02, 0x00],
        ] {
            let mut buf = partial.clone();
            assert_eq!(framer.try_build_packet(&mut buf), FrameOutcome::Incomplete);
            assert_eq!(buf, partial);
        }
    }

    #[test]
    fn test_packet_without_payload() {
        let mut buf = vec![0xF0, 0x0C, 0xF0];
        let mut framer = PacketFramer::new();
        let outcome = framer.try_build_packet(&mut buf);
        assert_eq!(outcome, FrameOutcome::Packet(RawPacket::new(0x0C, vec![])));
        assert_eq!(buf, vec![0xF0]);
    }

    #[test]
    fn test_junk_is_dropped_one_byte_at_a_time() {
        let mut buf = vec![0x11, 0x22, 0xF0, 0x00, 0x02, 0x00, 0x08];
        let mut framer = PacketFramer::new();
        assert_eq!(
            framer.try_build_packet(&mut buf),
            FrameOutcome::Discarded(Discard::Junk(0x11))
        );
        assert_eq!(
            framer.try_build_packet(&mut buf),
            FrameOutcome::Discarded(Discard::Junk(0x22))
        );
        match framer.try_build_packet(&mut buf) {
            FrameOutcome::Packet(pkt) => assert_eq!(pkt.adc_code().unwrap(), 2048),
            other => panic!("expected packet, got {:?}", other),
        }
        assert_eq!(framer.dropped_bytes(), 2);
    }

    #[test]
    fn test_unknown_descriptor() {
        let mut buf = vec![0xF0, 0x7F, 0xF0, 0x0C];
        let mut framer = PacketFramer::new();
        assert_eq!(
            framer.try_build_packet(&mut buf),
            FrameOutcome::Discarded(Discard::UnknownDescriptor(0x7F))
        );
        assert_eq!(buf, vec![0xF0, 0x0C]);
        assert_eq!(framer.discarded_frames(), 1);
    }

    #[test]
    fn test_bad_length_for_fixed_layout() {
        let mut buf = vec![0xF0, 0x0D, 0x02, 0x01, 0x02, 0xF0, 0x0C];
        let mut framer = PacketFramer::new();
        assert_eq!(
            framer.try_build_packet(&mut buf),
            FrameOutcome::Discarded(Discard::BadLength {
                descriptor: 0x0D,
                expected: 4,
                actual: 2,
            })
        );
        assert_eq!(buf, vec![0xF0, 0x0C]);
    }

    #[test]
    fn test_variable_length_payload() {
        let mut buf = vec![0xF0, 0x07, 0x03, 0xAA, 0xBB, 0xCC];
        let mut framer = PacketFramer::new();
        match framer.try_build_packet(&mut buf) {
            FrameOutcome::Packet(pkt) => {
                assert_eq!(pkt.response(), Some(Response::WispMemory));
                assert_eq!(pkt.payload, vec![0xAA, 0xBB, 0xCC]);
            }
            other => panic!("expected packet, got {:?}", other),
        }
    }

    #[test]
    fn test_to_bytes_matches_wire() {
        let pkt = RawPacket::new(Response::Vcap.code(), vec![0x00, 0x08]);
        assert_eq!(pkt.to_bytes(), vec![0xF0, 0x00, 0x02, 0x00, 0x08]);
        let pkt = RawPacket::new(Response::TagPwr.code(), vec![]);
        assert_eq!(pkt.to_bytes(), vec![0xF0, 0x0C]);
    }
}
