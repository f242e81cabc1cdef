//! Named keypoint sets for face, hand and pose records
//!
//! Each kind has a fixed, ordered table of keypoint names. The wire carries
//! the coordinate pairs in table order, so a pair's position selects its
//! name. Lookups go through the name enum; there is no string keyed access.

use core::marker::PhantomData;

use super::Point;
use crate::decode::DecodeError;

/// A fixed table of keypoint names
pub trait KeypointName: Copy + 'static {
    /// Number of keypoints of this kind
    const COUNT: usize;

    /// Every name in wire order
    fn all() -> &'static [Self];

    /// Position of this keypoint on the wire
    fn index(self) -> usize;

    /// Snake-case label
    fn label(self) -> &'static str;
}

macro_rules! keypoint_table {
    (
        $(#[$meta:meta])*
        $name:ident, $count:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            const ALL: [$name; $count] = [$($name::$variant),+];
        }

        impl KeypointName for $name {
            const COUNT: usize = $count;

            fn all() -> &'static [Self] {
                &Self::ALL
            }

            fn index(self) -> usize {
                self as usize
            }

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }
    };
}

keypoint_table! {
    /// Facial landmarks
    FaceLandmark, 5 {
        LeftEye => "left_eye",
        RightEye => "right_eye",
        Nose => "nose",
        MouthLeft => "mouth_left",
        MouthRight => "mouth_right",
    }
}

keypoint_table! {
    /// Hand joints, wrist first, then each finger from base to tip
    HandJoint, 21 {
        Wrist => "wrist",
        ThumbCmc => "thumb_cmc",
        ThumbMcp => "thumb_mcp",
        ThumbIp => "thumb_ip",
        ThumbTip => "thumb_tip",
        IndexMcp => "index_mcp",
        IndexPip => "index_pip",
        IndexDip => "index_dip",
        IndexTip => "index_tip",
        MiddleMcp => "middle_mcp",
        MiddlePip => "middle_pip",
        MiddleDip => "middle_dip",
        MiddleTip => "middle_tip",
        RingMcp => "ring_mcp",
        RingPip => "ring_pip",
        RingDip => "ring_dip",
        RingTip => "ring_tip",
        PinkyMcp => "pinky_mcp",
        PinkyPip => "pinky_pip",
        PinkyDip => "pinky_dip",
        PinkyTip => "pinky_tip",
    }
}

keypoint_table! {
    /// Body joints
    PoseJoint, 17 {
        Nose => "nose",
        LeftEye => "left_eye",
        RightEye => "right_eye",
        LeftEar => "left_ear",
        RightEar => "right_ear",
        LeftShoulder => "left_shoulder",
        RightShoulder => "right_shoulder",
        LeftElbow => "left_elbow",
        RightElbow => "right_elbow",
        LeftWrist => "left_wrist",
        RightWrist => "right_wrist",
        LeftHip => "left_hip",
        RightHip => "right_hip",
        LeftKnee => "left_knee",
        RightKnee => "right_knee",
        LeftAnkle => "left_ankle",
        RightAnkle => "right_ankle",
    }
}

/// Coordinates for every name of one keypoint kind
///
/// A keypoint the sensor did not report is `None`, never `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keypoints<K, const N: usize> {
    points: [Option<Point>; N],
    _kind: PhantomData<K>,
}

impl<K: KeypointName, const N: usize> Keypoints<K, N> {
    /// All keypoints missing
    pub fn missing() -> Self {
        Self {
            points: [None; N],
            _kind: PhantomData,
        }
    }

    /// Parse the trailing keypoint bytes of a record
    ///
    /// The bytes must be empty (nothing reported) or hold exactly `N`
    /// little-endian `(x, y)` pairs.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Ok(Self::missing());
        }
        let expected = N * 4;
        if bytes.len() != expected {
            return Err(DecodeError::KeypointCount {
                expected,
                actual: bytes.len(),
            });
        }

        let mut points = [None; N];
        for (slot, pair) in points.iter_mut().zip(bytes.chunks_exact(4)) {
            *slot = Some(Point::new(
                i16::from_le_bytes([pair[0], pair[1]]),
                i16::from_le_bytes([pair[2], pair[3]]),
            ));
        }
        Ok(Self {
            points,
            _kind: PhantomData,
        })
    }

    /// Coordinates of one keypoint
    pub fn get(&self, name: K) -> Option<Point> {
        self.points.get(name.index()).copied().flatten()
    }

    /// Number of named keypoints (always `N`)
    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Returns true if the sensor reported no keypoints at all
    pub fn all_missing(&self) -> bool {
        self.points.iter().all(Option::is_none)
    }

    /// Every name paired with its coordinates, in wire order
    pub fn iter(&self) -> impl Iterator<Item = (K, Option<Point>)> + '_ {
        K::all().iter().copied().zip(self.points.iter().copied())
    }
}

#[cfg(feature = "defmt")]
impl<K, const N: usize> defmt::Format for Keypoints<K, N> {
    fn format(&self, f: defmt::Formatter) {
        let present = self.points.iter().filter(|p| p.is_some()).count();
        defmt::write!(f, "Keypoints({}/{})", present, N)
    }
}
