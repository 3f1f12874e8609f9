//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the monitor
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Payload too large for a single frame: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Malformed {descriptor:#04x} packet: expected {expected} payload bytes, got {actual}")]
    PayloadLength {
        descriptor: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Channel closed by peer")]
    ChannelClosed,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serialport::Error> for ProtocolError {
    fn from(e: serialport::Error) -> Self {
        match e.kind() {
            serialport::ErrorKind::NoDevice => ProtocolError::PortNotFound(e.description),
            _ => ProtocolError::SerialError(e.to_string()),
        }
    }
}
