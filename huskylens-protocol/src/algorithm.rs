//! Recognition algorithms and drawing colors

use crate::revision::HardwareRevision;

/// Recognition mode selected on the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Algorithm {
    FaceRecognition,
    ObjectTracking,
    ObjectRecognition,
    LineTracking,
    ColorRecognition,
    TagRecognition,
    ObjectClassification,
    /// V2 only
    Ocr,
    /// V2 only
    LicenseRecognition,
    /// V2 only
    QrCodeRecognition,
    /// V2 only
    BarcodeRecognition,
    /// V2 only
    FaceEmotionRecognition,
    /// V2 only
    PoseRecognition,
    /// V2 only
    HandRecognition,
}

// Wire format values (V2 numbering)
const ALG_FACE_RECOGNITION: u8 = 1;
const ALG_OBJECT_TRACKING: u8 = 2;
const ALG_OBJECT_RECOGNITION: u8 = 3;
const ALG_LINE_TRACKING: u8 = 4;
const ALG_COLOR_RECOGNITION: u8 = 5;
const ALG_TAG_RECOGNITION: u8 = 6;
const ALG_OBJECT_CLASSIFICATION: u8 = 7;
const ALG_OCR: u8 = 8;
const ALG_LICENSE_RECOGNITION: u8 = 9;
const ALG_QR_CODE_RECOGNITION: u8 = 10;
const ALG_BARCODE_RECOGNITION: u8 = 11;
const ALG_FACE_EMOTION_RECOGNITION: u8 = 12;
const ALG_POSE_RECOGNITION: u8 = 13;
const ALG_HAND_RECOGNITION: u8 = 14;

impl Algorithm {
    /// Every algorithm in identifier order
    pub const ALL: [Algorithm; 14] = [
        Algorithm::FaceRecognition,
        Algorithm::ObjectTracking,
        Algorithm::ObjectRecognition,
        Algorithm::LineTracking,
        Algorithm::ColorRecognition,
        Algorithm::TagRecognition,
        Algorithm::ObjectClassification,
        Algorithm::Ocr,
        Algorithm::LicenseRecognition,
        Algorithm::QrCodeRecognition,
        Algorithm::BarcodeRecognition,
        Algorithm::FaceEmotionRecognition,
        Algorithm::PoseRecognition,
        Algorithm::HandRecognition,
    ];

    /// Parse an algorithm from its identifier (1-14)
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            ALG_FACE_RECOGNITION => Some(Algorithm::FaceRecognition),
            ALG_OBJECT_TRACKING => Some(Algorithm::ObjectTracking),
            ALG_OBJECT_RECOGNITION => Some(Algorithm::ObjectRecognition),
            ALG_LINE_TRACKING => Some(Algorithm::LineTracking),
            ALG_COLOR_RECOGNITION => Some(Algorithm::ColorRecognition),
            ALG_TAG_RECOGNITION => Some(Algorithm::TagRecognition),
            ALG_OBJECT_CLASSIFICATION => Some(Algorithm::ObjectClassification),
            ALG_OCR => Some(Algorithm::Ocr),
            ALG_LICENSE_RECOGNITION => Some(Algorithm::LicenseRecognition),
            ALG_QR_CODE_RECOGNITION => Some(Algorithm::QrCodeRecognition),
            ALG_BARCODE_RECOGNITION => Some(Algorithm::BarcodeRecognition),
            ALG_FACE_EMOTION_RECOGNITION => Some(Algorithm::FaceEmotionRecognition),
            ALG_POSE_RECOGNITION => Some(Algorithm::PoseRecognition),
            ALG_HAND_RECOGNITION => Some(Algorithm::HandRecognition),
            _ => None,
        }
    }

    /// Convert to identifier byte
    pub fn to_byte(self) -> u8 {
        match self {
            Algorithm::FaceRecognition => ALG_FACE_RECOGNITION,
            Algorithm::ObjectTracking => ALG_OBJECT_TRACKING,
            Algorithm::ObjectRecognition => ALG_OBJECT_RECOGNITION,
            Algorithm::LineTracking => ALG_LINE_TRACKING,
            Algorithm::ColorRecognition => ALG_COLOR_RECOGNITION,
            Algorithm::TagRecognition => ALG_TAG_RECOGNITION,
            Algorithm::ObjectClassification => ALG_OBJECT_CLASSIFICATION,
            Algorithm::Ocr => ALG_OCR,
            Algorithm::LicenseRecognition => ALG_LICENSE_RECOGNITION,
            Algorithm::QrCodeRecognition => ALG_QR_CODE_RECOGNITION,
            Algorithm::BarcodeRecognition => ALG_BARCODE_RECOGNITION,
            Algorithm::FaceEmotionRecognition => ALG_FACE_EMOTION_RECOGNITION,
            Algorithm::PoseRecognition => ALG_POSE_RECOGNITION,
            Algorithm::HandRecognition => ALG_HAND_RECOGNITION,
        }
    }

    /// Returns true if only V2 hardware implements this algorithm
    pub fn is_v2_only(self) -> bool {
        self.to_byte() >= ALG_OCR
    }

    /// Returns true if `revision` can run this algorithm
    pub fn supported_on(self, revision: HardwareRevision) -> bool {
        match revision {
            HardwareRevision::V1 => !self.is_v2_only(),
            HardwareRevision::V2 => true,
        }
    }

    /// Zero-based index used by the V1 set-algorithm command
    ///
    /// Returns `None` for algorithms V1 does not have.
    pub fn v1_index(self) -> Option<u8> {
        if self.is_v2_only() {
            None
        } else {
            Some(self.to_byte() - 1)
        }
    }
}

/// Drawing color for on-screen text and rectangles (V2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Color {
    Black,
    #[default]
    White,
    Red,
    Green,
    Blue,
    Yellow,
}

impl Color {
    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            Color::Black => 0,
            Color::White => 1,
            Color::Red => 2,
            Color::Green => 3,
            Color::Blue => 4,
            Color::Yellow => 5,
        }
    }
}
