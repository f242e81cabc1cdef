//! Session state machine
//!
//! Tracks whether the sensor has answered a probe and which revision it
//! speaks. Transitions are explicit, finite and deterministic.

pub mod events;
pub mod machine;

pub use events::SessionEvent;
pub use machine::SessionState;
