//! Link factory
//!
//! Picks the transport adapter for a caller-supplied handle and probes the
//! sensor through it. I2C tries the V1 register bus before the V2 direct
//! bus; serial tries V2 framing before V1 (inside [`HuskyLens::knock`]).

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use embedded_io::{Read, ReadReady, Write};
use log::debug;

use huskylens_core::SessionConfig;
use huskylens_hal::{I2cLink, SerialLink};
use huskylens_protocol::HardwareRevision;

use crate::error::Error;
use crate::session::HuskyLens;

/// Handles given back when no sensor answered
pub struct Unconnected<H, D> {
    /// Error from the last probe
    pub error: Error,
    pub handle: H,
    pub delay: D,
}

impl<H, D> core::fmt::Debug for Unconnected<H, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Unconnected").field("error", &self.error).finish()
    }
}

/// Session over I2C, with the revision detected from which address answers
pub fn connect_i2c<I, D>(
    i2c: I,
    delay: D,
    config: SessionConfig,
) -> Result<HuskyLens<I2cLink<I>, D>, Unconnected<I, D>>
where
    I: I2c,
    D: DelayNs,
{
    let mut lens = HuskyLens::new(I2cLink::for_revision(i2c, HardwareRevision::V1), delay, config);
    match lens.knock() {
        Ok(_) => return Ok(lens),
        Err(e) => debug!("huskylens: no V1 sensor on I2C: {}", e),
    }

    let (link, delay) = lens.release();
    let mut lens = HuskyLens::new(
        I2cLink::for_revision(link.release(), HardwareRevision::V2),
        delay,
        config,
    );
    match lens.knock() {
        Ok(_) => Ok(lens),
        Err(error) => {
            debug!("huskylens: no V2 sensor on I2C: {}", error);
            let (link, delay) = lens.release();
            Err(Unconnected {
                error,
                handle: link.release(),
                delay,
            })
        }
    }
}

/// Session over an open serial port
pub fn connect_serial<U, D>(
    uart: U,
    delay: D,
    config: SessionConfig,
) -> Result<HuskyLens<SerialLink<U>, D>, Unconnected<U, D>>
where
    U: Read + Write + ReadReady,
    D: DelayNs,
{
    let mut lens = HuskyLens::new(SerialLink::new(uart), delay, config);
    match lens.knock() {
        Ok(_) => Ok(lens),
        Err(error) => {
            let (link, delay) = lens.release();
            Err(Unconnected {
                error,
                handle: link.release(),
                delay,
            })
        }
    }
}
