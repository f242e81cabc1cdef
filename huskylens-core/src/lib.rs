//! Board-agnostic core logic for the HuskyLens driver
//!
//! This crate contains everything between a validated frame and the
//! caller that does not touch a transport:
//!
//! - Detection record types and per-kind keypoint tables
//! - Result payload decoding for both hardware revisions
//! - Post-decode record filtering
//! - Session state machine
//! - Session configuration

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod decode;
pub mod filter;
pub mod record;
pub mod state;

pub use config::{KnockPolicy, SessionConfig};
pub use decode::{decode_record, record_count, DecodeError, ExtendedKind};
pub use filter::RecordFilter;
pub use record::{
    Arrow, Block, DetectionRecord, Detections, Face, Hand, KeypointBlock, Point, Pose, RecordKind,
};
pub use state::{SessionEvent, SessionState};
