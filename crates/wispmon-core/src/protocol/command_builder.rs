//! Command Builder
//!
//! Builds command frames for the monitor.
//!
//! Frame layout: identifier, descriptor, then `length | data` only when data
//! is present. Multi-byte fields are sent least significant byte first.

use byteorder::{ByteOrder, LittleEndian};

use super::{Command, ProtocolError, MAX_PAYLOAD_SIZE, UART_USB_IDENTIFIER};

/// Builder for a single command frame
pub struct CommandBuilder {
    command: Command,
    data: Vec<u8>,
}

impl CommandBuilder {
    /// Start a frame for the given command
    pub fn new(command: Command) -> Self {
        Self {
            command,
            data: Vec::new(),
        }
    }

    /// Add a single byte
    pub fn byte(mut self, b: u8) -> Self {
        self.data.push(b);
        self
    }

    /// Add a 16-bit value (little-endian)
    pub fn u16_le(mut self, value: u16) -> Self {
        let mut bytes = [0u8; 2];
        LittleEndian::write_u16(&mut bytes, value);
        self.data.extend_from_slice(&bytes);
        self
    }

    /// Add raw bytes
    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.data.extend_from_slice(data);
        self
    }

    /// Encode the frame
    pub fn build(self) -> Result<Vec<u8>, ProtocolError> {
        if self.data.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge(self.data.len()));
        }

        let mut frame = Vec::with_capacity(3 + self.data.len());
        frame.push(UART_USB_IDENTIFIER);
        frame.push(self.command.code());
        if !self.data.is_empty() {
            frame.push(self.data.len() as u8);
            frame.extend_from_slice(&self.data);
        }
        Ok(frame)
    }
}
