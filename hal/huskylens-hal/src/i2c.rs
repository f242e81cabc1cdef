//! I2C bus adapters
//!
//! V1 hardware exposes its frame stream through register 0x0C at address
//! 0x32. V2 hardware answers plain reads and writes at address 0x50, but
//! keeps replaying its last reply until drained.

use embedded_hal::i2c::{I2c, Operation};
use huskylens_protocol::HardwareRevision;

use crate::transport::{LinkError, LinkKind, Transport};

/// 7-bit address of V1 hardware
pub const V1_ADDRESS: u8 = 0x32;

/// 7-bit address of V2 hardware
pub const V2_ADDRESS: u8 = 0x50;

/// Register carrying the V1 frame stream
pub const V1_REGISTER: u8 = 0x0C;

/// Chunk size used when draining a V2 bus
const DRAIN_CHUNK: usize = 16;

/// Number of chunks read when draining a V2 bus
const DRAIN_ROUNDS: usize = 5;

fn bus_error<E: embedded_hal::i2c::Error>(e: E) -> LinkError {
    LinkError::I2c(e.kind())
}

/// Register-addressed bus (V1)
///
/// Every write and read goes through a fixed register. The device clocks out
/// its reply on demand, so reads are always satisfied in full.
pub struct RegisterBus<I> {
    i2c: I,
    address: u8,
    register: u8,
}

impl<I: I2c> RegisterBus<I> {
    /// Create an adapter at the standard V1 address and register
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, V1_ADDRESS, V1_REGISTER)
    }

    /// Create an adapter at a custom address and register
    pub fn with_address(i2c: I, address: u8, register: u8) -> Self {
        Self {
            i2c,
            address,
            register,
        }
    }

    /// Device address in use
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Give back the bus handle
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> Transport for RegisterBus<I> {
    fn kind(&self) -> LinkKind {
        LinkKind::RegisterBus
    }

    fn revision(&self) -> Option<HardwareRevision> {
        Some(HardwareRevision::V1)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        // Adjacent writes merge into one transfer: [register, frame...]
        let register = [self.register];
        self.i2c
            .transaction(
                self.address,
                &mut [Operation::Write(&register), Operation::Write(bytes)],
            )
            .map_err(bus_error)
    }

    fn read_available(&mut self) -> Result<usize, LinkError> {
        Ok(usize::MAX)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        self.i2c
            .write_read(self.address, &[self.register], buf)
            .map_err(bus_error)?;
        Ok(buf.len())
    }

    fn discard_stale(&mut self, _revision: HardwareRevision) -> Result<(), LinkError> {
        Ok(())
    }
}

/// Direct-addressed bus (V2)
pub struct DirectBus<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> DirectBus<I> {
    /// Create an adapter at the standard V2 address
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, V2_ADDRESS)
    }

    /// Create an adapter at a custom address
    pub fn with_address(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Device address in use
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Give back the bus handle
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> Transport for DirectBus<I> {
    fn kind(&self) -> LinkKind {
        LinkKind::DirectBus
    }

    fn revision(&self) -> Option<HardwareRevision> {
        Some(HardwareRevision::V2)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.i2c.write(self.address, bytes).map_err(bus_error)
    }

    fn read_available(&mut self) -> Result<usize, LinkError> {
        Ok(usize::MAX)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        self.i2c.read(self.address, buf).map_err(bus_error)?;
        Ok(buf.len())
    }

    fn discard_stale(&mut self, _revision: HardwareRevision) -> Result<(), LinkError> {
        let mut scratch = [0u8; DRAIN_CHUNK];
        for _ in 0..DRAIN_ROUNDS {
            self.i2c.read(self.address, &mut scratch).map_err(bus_error)?;
        }
        Ok(())
    }
}

/// Either I2C adapter, chosen once the revision is known
pub enum I2cLink<I> {
    Register(RegisterBus<I>),
    Direct(DirectBus<I>),
}

impl<I: I2c> I2cLink<I> {
    /// Adapter matching `revision` at its standard address
    pub fn for_revision(i2c: I, revision: HardwareRevision) -> Self {
        match revision {
            HardwareRevision::V1 => I2cLink::Register(RegisterBus::new(i2c)),
            HardwareRevision::V2 => I2cLink::Direct(DirectBus::new(i2c)),
        }
    }

    /// Give back the bus handle
    pub fn release(self) -> I {
        match self {
            I2cLink::Register(bus) => bus.release(),
            I2cLink::Direct(bus) => bus.release(),
        }
    }
}

impl<I: I2c> Transport for I2cLink<I> {
    fn kind(&self) -> LinkKind {
        match self {
            I2cLink::Register(bus) => bus.kind(),
            I2cLink::Direct(bus) => bus.kind(),
        }
    }

    fn revision(&self) -> Option<HardwareRevision> {
        match self {
            I2cLink::Register(bus) => bus.revision(),
            I2cLink::Direct(bus) => bus.revision(),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        match self {
            I2cLink::Register(bus) => bus.write(bytes),
            I2cLink::Direct(bus) => bus.write(bytes),
        }
    }

    fn read_available(&mut self) -> Result<usize, LinkError> {
        match self {
            I2cLink::Register(bus) => bus.read_available(),
            I2cLink::Direct(bus) => bus.read_available(),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        match self {
            I2cLink::Register(bus) => bus.read(buf),
            I2cLink::Direct(bus) => bus.read(buf),
        }
    }

    fn discard_stale(&mut self, revision: HardwareRevision) -> Result<(), LinkError> {
        match self {
            I2cLink::Register(bus) => bus.discard_stale(revision),
            I2cLink::Direct(bus) => bus.discard_stale(revision),
        }
    }
}
