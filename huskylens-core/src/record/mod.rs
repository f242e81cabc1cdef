//! Detection records
//!
//! Every result frame decodes to one [`DetectionRecord`]. Blocks and arrows
//! exist on both revisions; faces, hands and poses are V2 blocks that carry
//! a fixed keypoint set chosen by the algorithm that produced them.

pub mod keypoints;

use heapless::{String, Vec};
use huskylens_protocol::{Algorithm, MAX_PAYLOAD_SIZE};

use crate::decode::BASE_RECORD_LEN;

pub use keypoints::{FaceLandmark, HandJoint, KeypointName, Keypoints, PoseJoint};

/// Maximum records kept from a single query
pub const MAX_RECORDS: usize = 16;

/// Longest name or content string, in bytes
///
/// One length byte after the fixed record fields leaves the rest of a full
/// payload for the text, so any string the sensor can send fits.
pub const MAX_TEXT_LEN: usize = MAX_PAYLOAD_SIZE - BASE_RECORD_LEN - 1;

/// Free text attached to a V2 record (class name, OCR or code content)
pub type Text = String<MAX_TEXT_LEN>;

/// Screen coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// Rectangular detection
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Block {
    /// Box centre
    pub x: i16,
    pub y: i16,
    pub width: i16,
    pub height: i16,
    /// 0 if unlearned
    pub id: i16,
    /// V2 only
    pub confidence: Option<u8>,
    /// V2 only
    pub name: Option<Text>,
    /// V2 only
    pub content: Option<Text>,
    pub algorithm: Algorithm,
}

impl Block {
    pub fn learned(&self) -> bool {
        self.id > 0
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Directed line segment, as reported by line tracking
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Arrow {
    pub tail: Point,
    pub head: Point,
    /// 0 if unlearned
    pub id: i16,
    /// V2 only
    pub confidence: Option<u8>,
    pub algorithm: Algorithm,
}

impl Arrow {
    pub fn learned(&self) -> bool {
        self.id > 0
    }

    /// Angle of the tail-to-head vector in degrees, in `[0, 360)`
    pub fn direction(&self) -> f32 {
        let dx = f32::from(self.head.x) - f32::from(self.tail.x);
        let dy = f32::from(self.head.y) - f32::from(self.tail.y);
        let degrees = libm::atan2f(dy, dx).to_degrees();
        let normalized = if degrees < 0.0 { degrees + 360.0 } else { degrees };
        // A tiny negative angle rounds up to exactly 360.0
        if normalized >= 360.0 {
            0.0
        } else {
            normalized
        }
    }
}

/// A block extended with a keypoint set
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeypointBlock<K: KeypointName, const N: usize> {
    pub block: Block,
    pub keypoints: Keypoints<K, N>,
}

impl<K: KeypointName, const N: usize> KeypointBlock<K, N> {
    /// Coordinates of one keypoint, `None` if not reported
    pub fn keypoint(&self, name: K) -> Option<Point> {
        self.keypoints.get(name)
    }
}

pub type Face = KeypointBlock<FaceLandmark, 5>;
pub type Hand = KeypointBlock<HandJoint, 21>;
pub type Pose = KeypointBlock<PoseJoint, 17>;

/// Record kind, as used for grouping and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordKind {
    Block,
    Arrow,
    Face,
    Hand,
    Pose,
}

/// Any decoded detection
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DetectionRecord {
    Block(Block),
    Arrow(Arrow),
    Face(Face),
    Hand(Hand),
    Pose(Pose),
}

impl DetectionRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            DetectionRecord::Block(_) => RecordKind::Block,
            DetectionRecord::Arrow(_) => RecordKind::Arrow,
            DetectionRecord::Face(_) => RecordKind::Face,
            DetectionRecord::Hand(_) => RecordKind::Hand,
            DetectionRecord::Pose(_) => RecordKind::Pose,
        }
    }

    /// The underlying block for every block-shaped kind
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            DetectionRecord::Block(b) => Some(b),
            DetectionRecord::Face(f) => Some(&f.block),
            DetectionRecord::Hand(h) => Some(&h.block),
            DetectionRecord::Pose(p) => Some(&p.block),
            DetectionRecord::Arrow(_) => None,
        }
    }

    pub fn id(&self) -> i16 {
        match self {
            DetectionRecord::Arrow(a) => a.id,
            other => other.as_block().map_or(0, |b| b.id),
        }
    }

    pub fn learned(&self) -> bool {
        self.id() > 0
    }

    /// Box centre, or arrow tail
    pub fn anchor(&self) -> Point {
        match self {
            DetectionRecord::Arrow(a) => a.tail,
            other => other.as_block().map_or(Point::default(), Block::center),
        }
    }

    /// Algorithm that produced this record
    pub fn algorithm(&self) -> Algorithm {
        match self {
            DetectionRecord::Block(b) => b.algorithm,
            DetectionRecord::Arrow(a) => a.algorithm,
            DetectionRecord::Face(f) => f.block.algorithm,
            DetectionRecord::Hand(h) => h.block.algorithm,
            DetectionRecord::Pose(p) => p.block.algorithm,
        }
    }
}

/// Ordered result of one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
    records: Vec<DetectionRecord, MAX_RECORDS>,
}

impl Detections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, handing it back if the collection is full
    pub fn push(&mut self, record: DetectionRecord) -> Result<(), DetectionRecord> {
        self.records.push(record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.is_full()
    }

    pub fn get(&self, index: usize) -> Option<&DetectionRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, DetectionRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[DetectionRecord] {
        &self.records
    }

    /// Plain blocks (not faces, hands or poses)
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.iter().filter_map(|r| match r {
            DetectionRecord::Block(b) => Some(b),
            _ => None,
        })
    }

    pub fn arrows(&self) -> impl Iterator<Item = &Arrow> + '_ {
        self.iter().filter_map(|r| match r {
            DetectionRecord::Arrow(a) => Some(a),
            _ => None,
        })
    }

    pub fn faces(&self) -> impl Iterator<Item = &Face> + '_ {
        self.iter().filter_map(|r| match r {
            DetectionRecord::Face(f) => Some(f),
            _ => None,
        })
    }

    pub fn hands(&self) -> impl Iterator<Item = &Hand> + '_ {
        self.iter().filter_map(|r| match r {
            DetectionRecord::Hand(h) => Some(h),
            _ => None,
        })
    }

    pub fn poses(&self) -> impl Iterator<Item = &Pose> + '_ {
        self.iter().filter_map(|r| match r {
            DetectionRecord::Pose(p) => Some(p),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a Detections {
    type Item = &'a DetectionRecord;
    type IntoIter = core::slice::Iter<'a, DetectionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for Detections {
    type Item = DetectionRecord;
    type IntoIter = <Vec<DetectionRecord, MAX_RECORDS> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: i16) -> Block {
        Block {
            x: 10,
            y: 20,
            width: 30,
            height: 40,
            id,
            confidence: None,
            name: None,
            content: None,
            algorithm: Algorithm::ObjectRecognition,
        }
    }

    fn arrow(tail: (i16, i16), head: (i16, i16)) -> Arrow {
        Arrow {
            tail: Point::new(tail.0, tail.1),
            head: Point::new(head.0, head.1),
            id: 0,
            confidence: None,
            algorithm: Algorithm::LineTracking,
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_learned_flag() {
        assert!(!block(0).learned());
        assert!(block(3).learned());
        assert!(!block(-1).learned());
    }

    #[test]
    fn test_arrow_direction_quadrants() {
        assert!(close(arrow((0, 0), (10, 0)).direction(), 0.0));
        assert!(close(arrow((0, 0), (0, 10)).direction(), 90.0));
        assert!(close(arrow((0, 0), (-10, 0)).direction(), 180.0));
        assert!(close(arrow((0, 0), (0, -10)).direction(), 270.0));
        assert!(close(arrow((5, 5), (15, 15)).direction(), 45.0));
    }

    #[test]
    fn test_arrow_direction_range() {
        for (hx, hy) in [(1, -1), (-1, -1), (-1, 1), (0, 0), (-100, -1)] {
            let d = arrow((0, 0), (hx, hy)).direction();
            assert!((0.0..360.0).contains(&d), "{d}");
        }
    }

    #[test]
    fn test_record_accessors() {
        let face = DetectionRecord::Face(Face {
            block: Block {
                algorithm: Algorithm::FaceRecognition,
                ..block(2)
            },
            keypoints: Keypoints::missing(),
        });
        assert_eq!(face.kind(), RecordKind::Face);
        assert_eq!(face.id(), 2);
        assert!(face.learned());
        assert_eq!(face.anchor(), Point::new(10, 20));
        assert_eq!(face.algorithm(), Algorithm::FaceRecognition);

        let line = DetectionRecord::Arrow(arrow((1, 2), (3, 4)));
        assert_eq!(line.anchor(), Point::new(1, 2));
        assert!(line.as_block().is_none());
        assert!(!line.learned());
    }

    #[test]
    fn test_views_split_by_kind() {
        let mut d = Detections::new();
        d.push(DetectionRecord::Block(block(1))).unwrap();
        d.push(DetectionRecord::Arrow(arrow((0, 0), (1, 1)))).unwrap();
        d.push(DetectionRecord::Block(block(2))).unwrap();
        d.push(DetectionRecord::Hand(Hand {
            block: block(0),
            keypoints: Keypoints::missing(),
        }))
        .unwrap();

        assert_eq!(d.len(), 4);
        let ids: std::vec::Vec<i16> = d.blocks().map(|b| b.id).collect();
        assert_eq!(ids, [1, 2]);
        assert_eq!(d.arrows().count(), 1);
        assert_eq!(d.hands().count(), 1);
        assert_eq!(d.faces().count(), 0);
        assert_eq!(d.poses().count(), 0);
    }

    #[test]
    fn test_push_past_capacity() {
        let mut d = Detections::new();
        for i in 0..MAX_RECORDS {
            d.push(DetectionRecord::Block(block(i as i16))).unwrap();
        }
        assert!(d.is_full());
        assert!(d.push(DetectionRecord::Block(block(99))).is_err());
    }

    #[test]
    fn test_into_iter_by_value_keeps_order() {
        let mut d = Detections::new();
        d.push(DetectionRecord::Block(block(3))).unwrap();
        d.push(DetectionRecord::Arrow(arrow((0, 0), (2, 2)))).unwrap();
        d.push(DetectionRecord::Block(block(5))).unwrap();

        let ids: std::vec::Vec<i16> = d.into_iter().map(|r| r.id()).collect();
        assert_eq!(ids, [3, 0, 5]);
    }
}
