//! Packet reader
//!
//! Accumulates bytes from a [`CommunicationChannel`] and hands out complete
//! packets one at a time.

use std::io;
use tracing::{debug, trace};

use super::{
    Command, CommandBuilder, CommunicationChannel, FrameOutcome, PacketFramer, ProtocolError,
    RawPacket,
};

/// Serial packet reader owning the channel and its accumulation buffer
pub struct PacketReader<C: CommunicationChannel> {
    channel: C,
    buffer: Vec<u8>,
    framer: PacketFramer,
}

impl<C: CommunicationChannel> PacketReader<C> {
    /// Wrap a channel
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            buffer: Vec::new(),
            framer: PacketFramer::new(),
        }
    }

    /// Read whatever the channel has available without blocking.
    ///
    /// Returns the number of bytes appended to the buffer; zero is normal.
    pub fn poll(&mut self) -> Result<usize, ProtocolError> {
        let available = match self.channel.bytes_to_read() {
            Ok(n) => n as usize,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(ProtocolError::ChannelClosed)
            }
            Err(e) => return Err(e.into()),
        };
        if available == 0 {
            return Ok(0);
        }

        let start = self.buffer.len();
        self.buffer.resize(start + available, 0);
        if let Err(e) = self.channel.read_exact(&mut self.buffer[start..]) {
            self.buffer.truncate(start);
            return Err(e.into());
        }
        trace!(bytes = available, buffered = self.buffer.len(), "Polled channel");
        Ok(available)
    }

    /// Take the next complete packet from the buffer, skipping over any
    /// bytes that have to be dropped to resynchronise.
    pub fn next_packet(&mut self) -> Option<RawPacket> {
        loop {
            match self.framer.try_build_packet(&mut self.buffer) {
                FrameOutcome::Packet(packet) => return Some(packet),
                FrameOutcome::Incomplete => return None,
                FrameOutcome::Discarded(_) => continue,
            }
        }
    }

    /// Send a command without data
    pub fn send_command(&mut self, command: Command) -> Result<(), ProtocolError> {
        let frame = CommandBuilder::new(command).build()?;
        self.send_frame(&frame)
    }

    /// Send an already encoded frame
    pub fn send_frame(&mut self, frame: &[u8]) -> Result<(), ProtocolError> {
        debug!(frame = ?frame, "Sending command");
        self.channel.write_all(frame)?;
        self.channel.flush()?;
        Ok(())
    }

    /// Bytes currently waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Framing statistics
    pub fn framer(&self) -> &PacketFramer {
        &self.framer
    }

    /// Access the underlying channel
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}
