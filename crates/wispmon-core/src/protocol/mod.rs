//! Monitor Serial Protocol
//!
//! Implements the WISP monitor's USB-UART protocol: command encoding on the
//! way out, response framing on the way in.
//!
//! Every frame in either direction starts with the identifier byte
//! [`UART_USB_IDENTIFIER`], followed by a descriptor byte and, for
//! descriptors that carry data, a length byte and the payload.

pub mod command_builder;
pub mod commands;
mod error;
mod packet;
pub mod reader;
pub mod serial;
pub mod stream;

pub use command_builder::CommandBuilder;
pub use commands::{Command, Response};
pub use error::ProtocolError;
pub use packet::{Discard, FrameOutcome, PacketFramer, RawPacket};
pub use reader::PacketReader;
pub use serial::{configure_port, list_ports, open_channel, open_port, PortInfo};
pub use stream::{CommunicationChannel, EndOfInput, MemoryChannel, SerialChannel};

/// Identifier byte that starts every frame exchanged with the monitor
pub const UART_USB_IDENTIFIER: u8 = 0xF0;

/// Default baud rate of the monitor's USB-UART bridge
pub const DEFAULT_BAUD_RATE: u32 = 921_600;

/// Default read/write timeout for the serial port in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Maximum payload carried by a single frame (length is one byte)
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize;
