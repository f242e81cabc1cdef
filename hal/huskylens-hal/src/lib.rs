//! HuskyLens transport adapters
//!
//! This crate turns caller-supplied bus and serial handles into a uniform
//! byte link for the protocol layer. Handles are expected to be open and
//! configured already; nothing here touches pins, clocks or baud rates.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  huskylens-drivers (session, exchange)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  huskylens-hal (Transport trait)        │
//! └─────────────────────────────────────────┘
//!          │                  │          │
//!          ▼                  ▼          ▼
//! ┌───────────────┐ ┌──────────────┐ ┌────────────┐
//! │  RegisterBus  │ │  DirectBus   │ │ SerialLink │
//! │   (V1 I2C)    │ │  (V2 I2C)    │ │   (UART)   │
//! └───────────────┘ └──────────────┘ └────────────┘
//! ```
//!
//! # Traits
//!
//! - [`Transport`] - write bytes, query waiting bytes, read bytes
//!
//! Bus adapters are generic over [`embedded_hal::i2c::I2c`], the serial
//! adapter over [`embedded_io`] `Read + Write + ReadReady`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod i2c;
pub mod transport;
pub mod uart;

// Re-export key types at crate root for convenience
pub use i2c::{DirectBus, I2cLink, RegisterBus};
pub use transport::{LinkError, LinkKind, Transport};
pub use uart::{BlockingRead, SerialLink};
