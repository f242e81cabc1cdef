//! Driver error taxonomy
//!
//! Lower layers each have their own error enum; everything converges here
//! so callers match on one type.

use core::fmt;

use huskylens_core::DecodeError;
use huskylens_hal::LinkError;
use huskylens_protocol::{FrameError, ReadError, RequestError};

/// Errors surfaced by session operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The bus or serial primitive failed
    LinkUnavailable(LinkError),
    /// No valid frame within the polling budget
    Timeout,
    /// A frame arrived with a bad checksum
    ChecksumMismatch,
    /// A frame stopped arriving part way through
    Truncated,
    /// A valid frame carried a payload that does not decode
    MalformedPayload(DecodeError),
    /// The connected revision has no such capability, or the algorithm
    /// count is out of range
    UnsupportedOnRevision,
    /// An argument does not fit the wire format
    InvalidArgument,
    /// A valid frame answered with the wrong command code
    UnexpectedReply { expected: u8, actual: u8 },
    /// The sensor did not answer a probe
    NotConnected,
}

impl Error {
    /// Check if repeating the exchange might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout
                | Error::ChecksumMismatch
                | Error::Truncated
                | Error::MalformedPayload(_)
                | Error::UnexpectedReply { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LinkUnavailable(e) => write!(f, "link unavailable: {:?}", e),
            Error::Timeout => f.write_str("no response from sensor"),
            Error::ChecksumMismatch => f.write_str("frame checksum mismatch"),
            Error::Truncated => f.write_str("frame truncated"),
            Error::MalformedPayload(e) => write!(f, "malformed payload: {:?}", e),
            Error::UnsupportedOnRevision => f.write_str("not supported on this hardware revision"),
            Error::InvalidArgument => f.write_str("argument does not fit the wire format"),
            Error::UnexpectedReply { expected, actual } => {
                write!(f, "expected reply {:#04x}, got {:#04x}", expected, actual)
            }
            Error::NotConnected => f.write_str("sensor did not answer"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Error::LinkUnavailable(e)
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::MalformedPayload(e)
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Timeout => Error::Timeout,
            FrameError::Truncated => Error::Truncated,
            FrameError::ChecksumMismatch => Error::ChecksumMismatch,
            FrameError::PayloadTooLarge | FrameError::BufferTooSmall => Error::InvalidArgument,
        }
    }
}

impl From<ReadError<LinkError>> for Error {
    fn from(e: ReadError<LinkError>) -> Self {
        match e {
            ReadError::Source(link) => link.into(),
            ReadError::Frame(frame) => frame.into(),
        }
    }
}

impl From<RequestError> for Error {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::Unsupported => Error::UnsupportedOnRevision,
            RequestError::InvalidArgument => Error::InvalidArgument,
        }
    }
}
