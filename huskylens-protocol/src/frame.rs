//! Frame encoding and decoding for the HuskyLens protocol.
//!
//! Frame format:
//! - PREFIX (2 bytes): 0x55 0xAA synchronization pattern
//! - HEADER (3 bytes): address, command and payload length, ordered per [`FrameLayout`]
//! - PAYLOAD (0-255 bytes): command-specific data
//! - CHECKSUM (1 byte): sum of all preceding bytes, modulo 256

use heapless::Vec;

use crate::revision::FrameLayout;

/// Frame synchronization pattern
pub const FRAME_PREFIX: [u8; 2] = [0x55, 0xAA];

/// Maximum payload size in bytes (the length field is one byte)
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// Maximum complete frame size (PREFIX + HEADER + MAX_PAYLOAD + CHECKSUM)
pub const MAX_FRAME_SIZE: usize = 2 + 3 + MAX_PAYLOAD_SIZE + 1;

/// Largest chunk requested from a [`ByteSource`] in one poll
const READ_CHUNK: usize = 32;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// No frame prefix found within the polling budget
    Timeout,
    /// Source went quiet before the announced length arrived
    Truncated,
    /// Checksum mismatch
    ChecksumMismatch,
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Address / channel byte
    pub address: u8,
    /// Command code
    pub command: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

/// Truncated byte sum used as the frame checksum
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

impl Frame {
    /// Create a new frame with the given address, command and payload
    pub fn new(address: u8, command: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            address,
            command,
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty(address: u8, command: u8) -> Self {
        Self {
            address,
            command,
            payload: Vec::new(),
        }
    }

    /// Size of this frame on the wire
    pub fn wire_len(&self) -> usize {
        FRAME_PREFIX.len() + 3 + self.payload.len() + 1
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, layout: FrameLayout, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.wire_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let header = layout.join(self.address, self.command, self.payload.len() as u8);
        buffer[..2].copy_from_slice(&FRAME_PREFIX);
        buffer[2..5].copy_from_slice(&header);
        buffer[5..5 + self.payload.len()].copy_from_slice(&self.payload);
        let end = 5 + self.payload.len();
        buffer[end] = checksum(&buffer[..end]);

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self, layout: FrameLayout) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(layout, &mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// State machine for parsing incoming frames
#[derive(Debug, Clone)]
pub struct FrameParser {
    layout: FrameLayout,
    state: ParseState,
    header: [u8; 3],
    buffer: Vec<u8, MAX_PAYLOAD_SIZE>,
    expected_length: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for the first prefix byte
    WaitingForPrefix,
    /// Got 0x55, waiting for 0xAA
    WaitingForPrefixTail,
    /// Reading the three header bytes
    ReadingHeader(u8),
    /// Reading payload bytes
    ReadingPayload,
    /// Waiting for CHECKSUM
    WaitingForChecksum,
}

impl FrameParser {
    /// Create a new frame parser for the given header layout
    pub fn new(layout: FrameLayout) -> Self {
        Self {
            layout,
            state: ParseState::WaitingForPrefix,
            header: [0; 3],
            buffer: Vec::new(),
            expected_length: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForPrefix;
        self.header = [0; 3];
        self.buffer.clear();
        self.expected_length = 0;
    }

    /// Returns true once a full prefix has been seen
    pub fn is_synced(&self) -> bool {
        !matches!(
            self.state,
            ParseState::WaitingForPrefix | ParseState::WaitingForPrefixTail
        )
    }

    /// Number of bytes the parser can take without reading past the current frame
    pub fn wanted(&self) -> usize {
        match self.state {
            ParseState::WaitingForPrefix | ParseState::WaitingForPrefixTail => 1,
            ParseState::ReadingHeader(index) => 3 - index as usize,
            ParseState::ReadingPayload => self.expected_length as usize - self.buffer.len() + 1,
            ParseState::WaitingForChecksum => 1,
        }
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on checksum failure.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            ParseState::WaitingForPrefix => {
                if byte == FRAME_PREFIX[0] {
                    self.state = ParseState::WaitingForPrefixTail;
                }
                // Silently ignore noise while waiting
                Ok(None)
            }
            ParseState::WaitingForPrefixTail => {
                self.state = if byte == FRAME_PREFIX[1] {
                    ParseState::ReadingHeader(0)
                } else if byte == FRAME_PREFIX[0] {
                    ParseState::WaitingForPrefixTail
                } else {
                    ParseState::WaitingForPrefix
                };
                Ok(None)
            }
            ParseState::ReadingHeader(index) => {
                self.header[index as usize] = byte;
                if index < 2 {
                    self.state = ParseState::ReadingHeader(index + 1);
                    return Ok(None);
                }
                let (_, _, length) = self.layout.split(self.header);
                self.expected_length = length;
                self.buffer.clear();
                self.state = if length == 0 {
                    ParseState::WaitingForChecksum
                } else {
                    ParseState::ReadingPayload
                };
                Ok(None)
            }
            ParseState::ReadingPayload => {
                // Cannot overflow: expected_length <= MAX_PAYLOAD_SIZE
                let _ = self.buffer.push(byte);
                if self.buffer.len() == self.expected_length as usize {
                    self.state = ParseState::WaitingForChecksum;
                }
                Ok(None)
            }
            ParseState::WaitingForChecksum => {
                let expected = checksum(&FRAME_PREFIX)
                    .wrapping_add(checksum(&self.header))
                    .wrapping_add(checksum(&self.buffer));

                if byte != expected {
                    self.reset();
                    return Err(FrameError::ChecksumMismatch);
                }

                let (address, command, _) = self.layout.split(self.header);
                let frame = Frame {
                    address,
                    command,
                    payload: self.buffer.clone(),
                };

                self.reset();
                Ok(Some(frame))
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Frame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

/// Anything that can be polled for inbound bytes
pub trait ByteSource {
    /// Error type of the underlying link
    type Error;

    /// Perform one bounded poll, filling at most `buf.len()` bytes
    ///
    /// `Ok(0)` means nothing arrived during this poll.
    fn poll_read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

impl ByteSource for &[u8] {
    type Error = core::convert::Infallible;

    fn poll_read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.len());
        buf[..n].copy_from_slice(&self[..n]);
        *self = &self[n..];
        Ok(n)
    }
}

/// Empty polls tolerated by default before a read gives up
pub const DEFAULT_MAX_IDLE_POLLS: u16 = 150;

/// Noise bytes skipped by default while hunting for the prefix
pub const DEFAULT_MAX_SKIPPED: u16 = 256;

/// Bounds on how long [`decode_frame`] keeps polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameBudget {
    /// Consecutive empty polls tolerated before giving up
    pub max_idle_polls: u16,
    /// Noise bytes discarded while hunting for the prefix
    pub max_skipped: u16,
}

impl Default for FrameBudget {
    fn default() -> Self {
        Self {
            max_idle_polls: DEFAULT_MAX_IDLE_POLLS,
            max_skipped: DEFAULT_MAX_SKIPPED,
        }
    }
}

/// Failure while pulling a frame out of a [`ByteSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError<E> {
    /// The source itself failed
    Source(E),
    /// Bytes arrived but did not form a valid frame
    Frame(FrameError),
}

impl<E> From<FrameError> for ReadError<E> {
    fn from(e: FrameError) -> Self {
        ReadError::Frame(e)
    }
}

/// Pull one complete, checksum-verified frame from `source`
///
/// Noise before the prefix is skipped. Bytes after the frame are left in the
/// source for the next call.
pub fn decode_frame<S: ByteSource>(
    source: &mut S,
    layout: FrameLayout,
    budget: FrameBudget,
) -> Result<Frame, ReadError<S::Error>> {
    let mut parser = FrameParser::new(layout);
    let mut chunk = [0u8; READ_CHUNK];
    let mut idle: u16 = 0;
    let mut skipped: u16 = 0;

    loop {
        let wanted = parser.wanted().min(READ_CHUNK);
        let n = source
            .poll_read(&mut chunk[..wanted])
            .map_err(ReadError::Source)?;

        if n == 0 {
            idle += 1;
            if idle >= budget.max_idle_polls {
                let err = if parser.is_synced() {
                    FrameError::Truncated
                } else {
                    FrameError::Timeout
                };
                return Err(err.into());
            }
            continue;
        }
        idle = 0;

        for &byte in &chunk[..n] {
            if let Some(frame) = parser.feed(byte)? {
                return Ok(frame);
            }
            if !parser.is_synced() {
                skipped += 1;
                if skipped > budget.max_skipped {
                    return Err(FrameError::Timeout.into());
                }
            }
        }
    }
}
