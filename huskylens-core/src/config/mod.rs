//! Configuration types
//!
//! Timing and retry knobs for a session. Every value is plain data so a
//! configuration can be built in a `const` or loaded through serde.

pub mod session;

pub use session::*;
