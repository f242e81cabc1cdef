//! Byte link abstraction
//!
//! The protocol layer only needs to push bytes out, ask how many bytes are
//! waiting, and pull bytes in. Each link kind implements that contract once.

use huskylens_protocol::HardwareRevision;

/// Failure of the underlying bus or serial primitive
///
/// Distinct from protocol errors: the bytes never made it across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// I2C transfer failed (NACK, arbitration, bus fault)
    I2c(embedded_hal::i2c::ErrorKind),
    /// Serial read or write failed
    Serial(embedded_io::ErrorKind),
}

/// Which adapter a link is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkKind {
    /// I2C with writes and reads through a fixed register (V1)
    RegisterBus,
    /// I2C with plain addressed writes and reads (V2)
    DirectBus,
    /// UART byte stream (either revision)
    Serial,
}

/// Uniform byte link to the sensor
pub trait Transport {
    /// Adapter kind
    fn kind(&self) -> LinkKind;

    /// Revision implied by the link's addressing, if any
    ///
    /// Bus adapters only reach one revision; a serial link can reach both.
    fn revision(&self) -> Option<HardwareRevision>;

    /// Send a complete request
    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Number of bytes that can be read without waiting
    fn read_available(&mut self) -> Result<usize, LinkError>;

    /// Read up to `buf.len()` bytes
    ///
    /// Returns the number of bytes read. Zero means nothing arrived within
    /// the adapter's own polling window.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// Drop leftover reply bytes before a new request
    fn discard_stale(&mut self, revision: HardwareRevision) -> Result<(), LinkError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn kind(&self) -> LinkKind {
        (**self).kind()
    }

    fn revision(&self) -> Option<HardwareRevision> {
        (**self).revision()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        (**self).write(bytes)
    }

    fn read_available(&mut self) -> Result<usize, LinkError> {
        (**self).read_available()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        (**self).read(buf)
    }

    fn discard_stale(&mut self, revision: HardwareRevision) -> Result<(), LinkError> {
        (**self).discard_stale(revision)
    }
}
