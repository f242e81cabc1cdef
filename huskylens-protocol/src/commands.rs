//! Command codes and request frames
//!
//! Both revisions share the frame envelope but use different command codes
//! and payload layouts. [`Request::to_frame`] is the single place where a
//! logical request is mapped onto a revision's wire format.

use heapless::Vec;

use crate::algorithm::{Algorithm, Color};
use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};
use crate::revision::HardwareRevision;

/// V1 command codes
pub mod v1 {
    pub const REQUEST: u8 = 0x20;
    pub const REQUEST_LEARNED: u8 = 0x23;
    pub const REQUEST_BY_ID: u8 = 0x26;
    pub const RETURN_INFO: u8 = 0x29;
    pub const RETURN_BLOCK: u8 = 0x2A;
    pub const RETURN_ARROW: u8 = 0x2B;
    pub const REQUEST_KNOCK: u8 = 0x2C;
    pub const REQUEST_ALGORITHM: u8 = 0x2D;
    pub const RETURN_OK: u8 = 0x2E;
    pub const REQUEST_CUSTOM_TEXT: u8 = 0x34;
    pub const REQUEST_CLEAR_TEXT: u8 = 0x35;
    pub const REQUEST_FIRMWARE_VERSION: u8 = 0x3C;
}

/// V2 command codes
pub mod v2 {
    pub const KNOCK: u8 = 0x20;
    pub const GET_RESULT: u8 = 0x21;
    pub const SET_ALGORITHM: u8 = 0x30;
    pub const SET_MULTI_ALGORITHM: u8 = 0x32;
    pub const RETURN_OK: u8 = 0x40;
    pub const RETURN_INFO: u8 = 0x42;
    pub const RETURN_BLOCK: u8 = 0x43;
    pub const RETURN_ARROW: u8 = 0x44;
    pub const DRAW_RECT: u8 = 0x56;
    pub const CLEAR_RECT: u8 = 0x57;
    pub const DRAW_TEXT: u8 = 0x58;
    pub const CLEAR_TEXT: u8 = 0x59;
}

/// Minimum number of algorithms in a multi-algorithm selection
pub const MIN_MULTI_ALGORITHMS: usize = 2;

/// Maximum number of algorithms in a multi-algorithm selection
pub const MAX_MULTI_ALGORITHMS: usize = 5;

/// Parameter slots always present in a V2 multi-algorithm payload
const V2_ALGORITHM_SLOTS: usize = 4;

/// Errors raised while building a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestError {
    /// The revision has no such command, or the argument count is out of range
    Unsupported,
    /// An argument does not fit the wire format
    InvalidArgument,
}

impl From<FrameError> for RequestError {
    fn from(_: FrameError) -> Self {
        RequestError::InvalidArgument
    }
}

/// Which records a result query asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueryScope {
    /// Everything currently detected
    #[default]
    All,
    /// Only records with this identifier
    ById(i16),
    /// Only learned records
    Learned,
}

/// Kind tag of a result sub-record, taken from its frame's command code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordTag {
    Block,
    Arrow,
}

impl RecordTag {
    /// Map a result frame command code to its record kind
    pub fn from_command(revision: HardwareRevision, command: u8) -> Option<Self> {
        match (revision, command) {
            (HardwareRevision::V1, v1::RETURN_BLOCK) => Some(RecordTag::Block),
            (HardwareRevision::V1, v1::RETURN_ARROW) => Some(RecordTag::Arrow),
            (HardwareRevision::V2, v2::RETURN_BLOCK) => Some(RecordTag::Block),
            (HardwareRevision::V2, v2::RETURN_ARROW) => Some(RecordTag::Arrow),
            _ => None,
        }
    }
}

/// A logical request to the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// Connection test
    Knock,
    /// Switch to a single algorithm
    SetAlgorithm(Algorithm),
    /// Run several algorithms at once (V2)
    SetMultiAlgorithm(&'a [Algorithm]),
    /// Fetch detection results
    Query {
        algorithm: Algorithm,
        scope: QueryScope,
    },
    /// Firmware version string (V1)
    FirmwareVersion,
    /// Draw text on the sensor screen
    DrawText {
        text: &'a str,
        x: u16,
        y: u16,
        color: Color,
    },
    /// Remove all custom text
    ClearText,
    /// Draw a rectangle outline (V2)
    DrawRect {
        x1: i16,
        y1: i16,
        x2: i16,
        y2: i16,
        color: Color,
    },
    /// Remove all rectangles (V2)
    ClearRect,
}

type Payload = Vec<u8, MAX_PAYLOAD_SIZE>;

fn push_all(payload: &mut Payload, bytes: &[u8]) -> Result<(), RequestError> {
    payload
        .extend_from_slice(bytes)
        .map_err(|_| RequestError::InvalidArgument)
}

/// `[param, 0, a, b, c, d]` with four little-endian i16 values
fn v2_params(param: u8, values: [i16; 4]) -> Result<Payload, RequestError> {
    let mut payload = Payload::new();
    push_all(&mut payload, &[param, 0])?;
    for value in values {
        push_all(&mut payload, &value.to_le_bytes())?;
    }
    Ok(payload)
}

impl<'a> Request<'a> {
    /// Encode this request as a frame for `revision`
    pub fn to_frame(&self, revision: HardwareRevision) -> Result<Frame, RequestError> {
        let address = revision.request_address();
        match (revision, *self) {
            (HardwareRevision::V1, Request::Knock) => Ok(Frame::empty(address, v1::REQUEST_KNOCK)),
            (HardwareRevision::V2, Request::Knock) => Ok(Frame::empty(address, v2::KNOCK)),

            (HardwareRevision::V1, Request::SetAlgorithm(algorithm)) => {
                let index = algorithm.v1_index().ok_or(RequestError::Unsupported)?;
                let payload = (index as i16).to_le_bytes();
                Ok(Frame::new(address, v1::REQUEST_ALGORITHM, &payload)?)
            }
            (HardwareRevision::V2, Request::SetAlgorithm(algorithm)) => {
                let payload = v2_params(algorithm.to_byte(), [0; 4])?;
                Ok(Frame::new(address, v2::SET_ALGORITHM, &payload)?)
            }

            (HardwareRevision::V1, Request::SetMultiAlgorithm(_)) => Err(RequestError::Unsupported),
            (HardwareRevision::V2, Request::SetMultiAlgorithm(algorithms)) => {
                let count = algorithms.len();
                if !(MIN_MULTI_ALGORITHMS..=MAX_MULTI_ALGORITHMS).contains(&count) {
                    return Err(RequestError::Unsupported);
                }
                let mut payload = Payload::new();
                push_all(&mut payload, &[count as u8, 0])?;
                for slot in 0..count.max(V2_ALGORITHM_SLOTS) {
                    let id = algorithms.get(slot).map_or(0, |a| a.to_byte() as i16);
                    push_all(&mut payload, &id.to_le_bytes())?;
                }
                Ok(Frame::new(address, v2::SET_MULTI_ALGORITHM, &payload)?)
            }

            (HardwareRevision::V1, Request::Query { scope, .. }) => match scope {
                QueryScope::All => Ok(Frame::empty(address, v1::REQUEST)),
                QueryScope::Learned => Ok(Frame::empty(address, v1::REQUEST_LEARNED)),
                QueryScope::ById(id) => {
                    Ok(Frame::new(address, v1::REQUEST_BY_ID, &id.to_le_bytes())?)
                }
            },
            // V2 always fetches everything; id/learned filtering happens after decode
            (HardwareRevision::V2, Request::Query { algorithm, .. }) => {
                Ok(Frame::empty(algorithm.to_byte(), v2::GET_RESULT))
            }

            (HardwareRevision::V1, Request::FirmwareVersion) => {
                Ok(Frame::empty(address, v1::REQUEST_FIRMWARE_VERSION))
            }
            (HardwareRevision::V2, Request::FirmwareVersion) => Err(RequestError::Unsupported),

            (HardwareRevision::V1, Request::DrawText { text, x, y, .. }) => {
                let y = u8::try_from(y).map_err(|_| RequestError::InvalidArgument)?;
                let len = u8::try_from(text.len()).map_err(|_| RequestError::InvalidArgument)?;
                let (x_hi, x_lo) = if x > 255 {
                    (0xFF, (x % 255) as u8)
                } else {
                    (0x00, x as u8)
                };
                let mut payload = Payload::new();
                push_all(&mut payload, &[len, x_hi, x_lo, y])?;
                push_all(&mut payload, text.as_bytes())?;
                Ok(Frame::new(address, v1::REQUEST_CUSTOM_TEXT, &payload)?)
            }
            (HardwareRevision::V2, Request::DrawText { text, x, y, color }) => {
                let x = i16::try_from(x).map_err(|_| RequestError::InvalidArgument)?;
                let y = i16::try_from(y).map_err(|_| RequestError::InvalidArgument)?;
                let len = u8::try_from(text.len()).map_err(|_| RequestError::InvalidArgument)?;
                let mut payload = v2_params(color.to_byte(), [x, y, 0, 0])?;
                push_all(&mut payload, &[len])?;
                push_all(&mut payload, text.as_bytes())?;
                Ok(Frame::new(address, v2::DRAW_TEXT, &payload)?)
            }

            (HardwareRevision::V1, Request::ClearText) => {
                Ok(Frame::empty(address, v1::REQUEST_CLEAR_TEXT))
            }
            (HardwareRevision::V2, Request::ClearText) => Ok(Frame::empty(address, v2::CLEAR_TEXT)),

            (HardwareRevision::V1, Request::DrawRect { .. }) => Err(RequestError::Unsupported),
            (HardwareRevision::V2, Request::DrawRect { x1, y1, x2, y2, color }) => {
                let payload = v2_params(color.to_byte(), [x1, y1, x2, y2])?;
                Ok(Frame::new(address, v2::DRAW_RECT, &payload)?)
            }

            (HardwareRevision::V1, Request::ClearRect) => Err(RequestError::Unsupported),
            (HardwareRevision::V2, Request::ClearRect) => Ok(Frame::empty(address, v2::CLEAR_RECT)),
        }
    }

    /// Command code the sensor answers this request with
    pub fn reply_code(&self, revision: HardwareRevision) -> u8 {
        match (revision, self) {
            (HardwareRevision::V1, Request::Query { .. }) => v1::RETURN_INFO,
            (HardwareRevision::V2, Request::Query { .. }) => v2::RETURN_INFO,
            (HardwareRevision::V1, Request::FirmwareVersion) => v1::REQUEST_FIRMWARE_VERSION,
            (HardwareRevision::V1, _) => v1::RETURN_OK,
            (HardwareRevision::V2, _) => v2::RETURN_OK,
        }
    }

    /// Returns true if the reply is followed by result record frames
    pub fn is_query(&self) -> bool {
        matches!(self, Request::Query { .. })
    }
}
