//! Result payload decoding
//!
//! Turns validated frame payloads into typed records. The frame's command
//! code is the record tag; the hardware revision picks the payload layout.
//!
//! ```text
//! V1 block / arrow:  x:i16 y:i16 w:i16 h:i16 id:i16            (10 bytes)
//! V2 base:           id:i8 conf:u8 x:i16 y:i16 w:i16 h:i16     (10 bytes)
//! V2 extension:      name_len name.. [content_len content..] keypoints..
//! ```

use huskylens_protocol::{Algorithm, HardwareRevision, RecordTag};

use crate::record::{Arrow, Block, DetectionRecord, KeypointBlock, Keypoints, Point, Text};

/// Size of the fixed part of every record payload
pub const BASE_RECORD_LEN: usize = 10;

/// Reasons a payload cannot be turned into a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Command code is not a result record
    UnknownRecord(u8),
    /// Payload size does not fit the record layout
    WrongLength { expected: usize, actual: usize },
    /// Info payload too short to hold a record count
    MissingCount,
    /// Info payload announces a negative record count
    NegativeCount(i16),
    /// A length-prefixed string runs past the payload
    TextOverrun,
    /// Name or content is not UTF-8
    InvalidUtf8,
    /// String longer than any frame can carry
    TextTooLong(usize),
    /// Keypoint bytes do not match the kind's table
    KeypointCount { expected: usize, actual: usize },
}

/// Keypoint-carrying record kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExtendedKind {
    Face,
    Hand,
    Pose,
}

impl ExtendedKind {
    /// The keypoint kind an algorithm reports, if any
    pub fn for_algorithm(algorithm: Algorithm) -> Option<Self> {
        match algorithm {
            Algorithm::FaceRecognition => Some(ExtendedKind::Face),
            Algorithm::HandRecognition => Some(ExtendedKind::Hand),
            Algorithm::PoseRecognition => Some(ExtendedKind::Pose),
            _ => None,
        }
    }
}

fn le_i16(bytes: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([bytes[at], bytes[at + 1]])
}

/// Number of record frames announced by an info payload
pub fn record_count(revision: HardwareRevision, payload: &[u8]) -> Result<u16, DecodeError> {
    let at = match revision {
        HardwareRevision::V1 => 0,
        HardwareRevision::V2 => 2,
    };
    if payload.len() < at + 2 {
        return Err(DecodeError::MissingCount);
    }
    let count = le_i16(payload, at);
    u16::try_from(count).map_err(|_| DecodeError::NegativeCount(count))
}

/// Decode one result frame payload
///
/// `algorithm` is the algorithm the reply belongs to. On V2 it selects the
/// keypoint kind; on both revisions it is stamped onto the record.
pub fn decode_record(
    revision: HardwareRevision,
    command: u8,
    payload: &[u8],
    algorithm: Algorithm,
) -> Result<DetectionRecord, DecodeError> {
    let tag = RecordTag::from_command(revision, command).ok_or(DecodeError::UnknownRecord(command))?;
    match revision {
        HardwareRevision::V1 => decode_v1(tag, payload, algorithm),
        HardwareRevision::V2 => decode_v2(tag, payload, algorithm),
    }
}

fn decode_v1(
    tag: RecordTag,
    payload: &[u8],
    algorithm: Algorithm,
) -> Result<DetectionRecord, DecodeError> {
    if payload.len() != BASE_RECORD_LEN {
        return Err(DecodeError::WrongLength {
            expected: BASE_RECORD_LEN,
            actual: payload.len(),
        });
    }
    let [a, b, c, d, id] = [0, 2, 4, 6, 8].map(|at| le_i16(payload, at));

    Ok(match tag {
        RecordTag::Block => DetectionRecord::Block(Block {
            x: a,
            y: b,
            width: c,
            height: d,
            id,
            confidence: None,
            name: None,
            content: None,
            algorithm,
        }),
        RecordTag::Arrow => DetectionRecord::Arrow(Arrow {
            tail: Point::new(a, b),
            head: Point::new(c, d),
            id,
            confidence: None,
            algorithm,
        }),
    })
}

fn decode_v2(
    tag: RecordTag,
    payload: &[u8],
    algorithm: Algorithm,
) -> Result<DetectionRecord, DecodeError> {
    if payload.len() < BASE_RECORD_LEN {
        return Err(DecodeError::WrongLength {
            expected: BASE_RECORD_LEN,
            actual: payload.len(),
        });
    }
    let id = i16::from(payload[0] as i8);
    let confidence = Some(payload[1]);
    let [a, b, c, d] = [2, 4, 6, 8].map(|at| le_i16(payload, at));

    if tag == RecordTag::Arrow {
        return Ok(DetectionRecord::Arrow(Arrow {
            tail: Point::new(a, b),
            head: Point::new(c, d),
            id,
            confidence,
            algorithm,
        }));
    }

    let mut rest = &payload[BASE_RECORD_LEN..];
    let name = take_text(&mut rest)?;
    let content = take_text(&mut rest)?;
    let block = Block {
        x: a,
        y: b,
        width: c,
        height: d,
        id,
        confidence,
        name,
        content,
        algorithm,
    };

    // Anything after the strings is keypoint data
    Ok(match ExtendedKind::for_algorithm(algorithm) {
        None => DetectionRecord::Block(block),
        Some(ExtendedKind::Face) => DetectionRecord::Face(KeypointBlock {
            block,
            keypoints: Keypoints::parse(rest)?,
        }),
        Some(ExtendedKind::Hand) => DetectionRecord::Hand(KeypointBlock {
            block,
            keypoints: Keypoints::parse(rest)?,
        }),
        Some(ExtendedKind::Pose) => DetectionRecord::Pose(KeypointBlock {
            block,
            keypoints: Keypoints::parse(rest)?,
        }),
    })
}

/// Consume one length-prefixed string, `None` when absent or empty
fn take_text(rest: &mut &[u8]) -> Result<Option<Text>, DecodeError> {
    let Some((&len, tail)) = rest.split_first() else {
        return Ok(None);
    };
    let len = usize::from(len);
    if tail.len() < len {
        return Err(DecodeError::TextOverrun);
    }
    let (raw, remaining) = tail.split_at(len);
    *rest = remaining;
    if raw.is_empty() {
        return Ok(None);
    }

    let text = core::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)?;
    let mut stored = Text::new();
    stored
        .push_str(text)
        .map_err(|_| DecodeError::TextTooLong(raw.len()))?;
    Ok(Some(stored))
}
