//! HuskyLens session driver
//!
//! This crate ties the protocol, transport and record layers into a
//! blocking session API:
//!
//! - [`HuskyLens`] - probe, algorithm selection, queries, on-screen drawing
//! - [`connect_i2c`] / [`connect_serial`] - pick an adapter and probe
//! - [`Error`] - the single error type every operation returns
//!
//! # Example
//!
//! ```ignore
//! let mut lens = connect_i2c(i2c, delay, SessionConfig::default())?;
//! lens.set_algorithm(Algorithm::ObjectRecognition)?;
//! for block in lens.blocks(RecordFilter::new().learned())? {
//!     log::info!("id {} at ({}, {})", block.id, block.x, block.y);
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod connect;
pub mod error;
mod link;
pub mod session;

#[cfg(test)]
mod testing;

pub use connect::{connect_i2c, connect_serial, Unconnected};
pub use error::Error;
pub use session::{FirmwareVersion, HuskyLens, DEFAULT_ALGORITHM};

// Types callers need alongside the session
pub use huskylens_core::{
    Detections, DetectionRecord, RecordFilter, SessionConfig, SessionState,
};
pub use huskylens_protocol::{Algorithm, Color, HardwareRevision};
