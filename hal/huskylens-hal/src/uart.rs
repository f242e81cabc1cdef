//! UART serial adapter
//!
//! Serial links deliver an unframed byte stream. The adapter keeps a small
//! receive buffer so it can report how many bytes are waiting, using the
//! handle's readiness query to avoid blocking. A read that times out counts
//! as an empty poll.

use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};
use heapless::Deque;
use huskylens_protocol::HardwareRevision;

use crate::transport::{LinkError, LinkKind, Transport};

/// Receive buffer capacity
const RX_BUFFER: usize = 64;

/// Largest single read from the handle
const READ_CHUNK: usize = 32;

/// Number of chunks read when draining before a V2 request
const DRAIN_ROUNDS: usize = 10;

/// Chunk size used when draining
const DRAIN_CHUNK: usize = 64;

fn serial_error<E: embedded_io::Error>(e: E) -> LinkError {
    LinkError::Serial(e.kind())
}

/// Byte-stream link over a UART handle
pub struct SerialLink<U> {
    uart: U,
    rx: Deque<u8, RX_BUFFER>,
}

impl<U> SerialLink<U>
where
    U: Read + Write + ReadReady,
{
    /// Wrap an open, configured UART handle
    pub fn new(uart: U) -> Self {
        Self {
            uart,
            rx: Deque::new(),
        }
    }

    /// Give back the UART handle
    ///
    /// Any bytes still buffered are dropped.
    pub fn release(self) -> U {
        self.uart
    }

    /// Read from the handle, with a timeout meaning nothing arrived
    fn read_handle(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        match self.uart.read(buf).map_err(serial_error) {
            Err(LinkError::Serial(ErrorKind::TimedOut)) => Ok(0),
            other => other,
        }
    }

    /// Move whatever the handle has ready into the receive buffer
    fn fill(&mut self) -> Result<(), LinkError> {
        let free = self.rx.capacity() - self.rx.len();
        if free == 0 || !self.uart.read_ready().map_err(serial_error)? {
            return Ok(());
        }

        let mut chunk = [0u8; READ_CHUNK];
        let want = free.min(READ_CHUNK);
        let n = self.read_handle(&mut chunk[..want])?;
        for &byte in &chunk[..n] {
            // Cannot fail: n <= free
            let _ = self.rx.push_back(byte);
        }
        Ok(())
    }
}

impl<U> Transport for SerialLink<U>
where
    U: Read + Write + ReadReady,
{
    fn kind(&self) -> LinkKind {
        LinkKind::Serial
    }

    fn revision(&self) -> Option<HardwareRevision> {
        None
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.uart.write_all(bytes).map_err(serial_error)?;
        self.uart.flush().map_err(serial_error)
    }

    fn read_available(&mut self) -> Result<usize, LinkError> {
        self.fill()?;
        Ok(self.rx.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        if self.rx.len() < buf.len() {
            self.fill()?;
        }
        let mut filled = 0;
        while filled < buf.len() {
            match self.rx.pop_front() {
                Some(byte) => {
                    buf[filled] = byte;
                    filled += 1;
                }
                None => break,
            }
        }
        Ok(filled)
    }

    fn discard_stale(&mut self, revision: HardwareRevision) -> Result<(), LinkError> {
        match revision {
            HardwareRevision::V1 => Ok(()),
            HardwareRevision::V2 => {
                self.rx.clear();
                let mut scratch = [0u8; DRAIN_CHUNK];
                for _ in 0..DRAIN_ROUNDS {
                    if !self.uart.read_ready().map_err(serial_error)? {
                        break;
                    }
                    if self.read_handle(&mut scratch)? == 0 {
                        break;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Adapter for handles without a readiness query
///
/// Reports itself as always ready, so every poll becomes a blocking read
/// bounded by the handle's own timeout. [`SerialLink`] treats that timeout
/// as an empty poll and the session paces the retries.
pub struct BlockingRead<U>(pub U);

impl<U: ErrorType> ErrorType for BlockingRead<U> {
    type Error = U::Error;
}

impl<U: Read> Read for BlockingRead<U> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.read(buf)
    }
}

impl<U: Write> Write for BlockingRead<U> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush()
    }
}

impl<U: ErrorType> ReadReady for BlockingRead<U> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}
