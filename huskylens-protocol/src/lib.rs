//! HuskyLens wire protocol
//!
//! This crate defines the byte-level protocol spoken by the HuskyLens AI
//! vision sensor over I2C or UART. It is transport independent: encoding
//! produces bytes, decoding pulls bytes from any [`ByteSource`].
//!
//! # Protocol Overview
//!
//! Every request and response is a checksummed frame:
//! ```text
//! ┌────────┬─────────────────────────┬─────────────┬──────────┐
//! │ PREFIX │ HEADER                  │ PAYLOAD     │ CHECKSUM │
//! │ 55 AA  │ 3B, order per revision  │ 0–255B      │ 1B       │
//! └────────┴─────────────────────────┴─────────────┴──────────┘
//! ```
//!
//! V1 hardware orders the header `ADDRESS LENGTH COMMAND`, V2 hardware
//! orders it `COMMAND ADDRESS LENGTH`. The checksum is the sum of every
//! preceding byte, truncated to eight bits.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod algorithm;
pub mod commands;
pub mod frame;
pub mod revision;

pub use algorithm::{Algorithm, Color};
pub use commands::{QueryScope, RecordTag, Request, RequestError};
pub use frame::{
    decode_frame, ByteSource, Frame, FrameBudget, FrameError, FrameParser, ReadError,
    DEFAULT_MAX_IDLE_POLLS, DEFAULT_MAX_SKIPPED, FRAME_PREFIX, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
pub use revision::{FrameLayout, HardwareRevision};
