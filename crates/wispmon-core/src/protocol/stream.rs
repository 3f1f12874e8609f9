//! Communication channels
//!
//! The logger talks to the monitor through [`CommunicationChannel`] so the
//! same loop can run against a serial port, a captured byte dump, or a
//! scripted stream in tests.

use serialport::SerialPort;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

/// Abstraction for byte channels to the monitor
pub trait CommunicationChannel: Read + Write + Send {
    /// Get number of bytes available to read without blocking
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    /// Clear input buffers
    fn clear_input_buffer(&mut self) -> io::Result<()>;
}

impl<C: CommunicationChannel + ?Sized> CommunicationChannel for Box<C> {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        (**self).bytes_to_read()
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        (**self).clear_input_buffer()
    }
}

/// Serial port wrapper implementing CommunicationChannel
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap an opened and configured port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl CommunicationChannel for SerialChannel {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port.bytes_to_read().map_err(io::Error::other)
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::other)
    }
}

/// What a [`MemoryChannel`] does once its scripted input runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfInput {
    /// Keep reporting zero bytes available, like an idle device
    Idle,
    /// Report end of stream
    Closed,
    /// Report an I/O failure, like an unplugged device
    Fail,
}

/// In-memory channel that releases one scripted chunk per poll.
///
/// Used for replaying captured monitor output and for driving the logger in
/// tests. Everything written to it is captured and can be inspected through
/// the handle returned by [`MemoryChannel::written`].
pub struct MemoryChannel {
    chunks: VecDeque<Vec<u8>>,
    current: VecDeque<u8>,
    end: EndOfInput,
    written: Arc<Mutex<Vec<u8>>>,
}

impl MemoryChannel {
    /// Create a channel from explicit chunks
    pub fn from_chunks(chunks: Vec<Vec<u8>>, end: EndOfInput) -> Self {
        Self {
            chunks: chunks.into_iter().filter(|c| !c.is_empty()).collect(),
            current: VecDeque::new(),
            end,
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a channel that releases `data` in chunks of `chunk_size` bytes
    pub fn from_bytes(data: &[u8], chunk_size: usize, end: EndOfInput) -> Self {
        let chunks = data
            .chunks(chunk_size.max(1))
            .map(|c| c.to_vec())
            .collect();
        Self::from_chunks(chunks, end)
    }

    /// Shared handle to the bytes written to this channel
    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written)
    }
}

impl Read for MemoryChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.current.len());
        for (slot, byte) in buf.iter_mut().zip(self.current.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MemoryChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = self
            .written
            .lock()
            .map_err(|_| io::Error::other("write capture poisoned"))?;
        written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommunicationChannel for MemoryChannel {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        if self.current.is_empty() {
            match self.chunks.pop_front() {
                Some(chunk) => self.current.extend(chunk),
                None => {
                    return match self.end {
                        EndOfInput::Idle => Ok(0),
                        EndOfInput::Closed => Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "end of recorded input",
                        )),
                        EndOfInput::Fail => Err(io::Error::new(
                            io::ErrorKind::BrokenPipe,
                            "device disconnected",
                        )),
                    };
                }
            }
        }
        Ok(self.current.len() as u32)
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.current.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_channel_releases_chunks_per_poll() {
        let mut ch = MemoryChannel::from_bytes(&[1, 2, 3, 4, 5], 2, EndOfInput::Idle);
        let mut buf = [0u8; 8];

        assert_eq!(ch.bytes_to_read().unwrap(), 2);
        assert_eq!(ch.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[1, 2]);

        assert_eq!(ch.bytes_to_read().unwrap(), 2);
        assert_eq!(ch.read(&mut buf).unwrap(), 2);
        assert_eq!(ch.bytes_to_read().unwrap(), 1);
        assert_eq!(ch.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 5);

        assert_eq!(ch.bytes_to_read().unwrap(), 0);
    }

    #[test]
    fn test_memory_channel_end_behaviour() {
        let mut closed = MemoryChannel::from_chunks(vec![], EndOfInput::Closed);
        let err = closed.bytes_to_read().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let mut failing = MemoryChannel::from_chunks(vec![], EndOfInput::Fail);
        let err = failing.bytes_to_read().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_memory_channel_captures_writes() {
        let mut ch = MemoryChannel::from_chunks(vec![], EndOfInput::Idle);
        let written = ch.written();
        ch.write_all(&[0xF0, 0x0D]).unwrap();
        assert_eq!(*written.lock().unwrap(), vec![0xF0, 0x0D]);
    }
}
