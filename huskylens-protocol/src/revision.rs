//! Hardware revisions and their frame layouts

/// Address byte carried by every V1 frame
pub const V1_ADDRESS: u8 = 0x11;

/// HuskyLens hardware revision
///
/// Determined once per session by the knock probe. Everything that differs
/// between revisions (header order, command codes, payload shapes, bus
/// addressing) is selected by matching on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareRevision {
    /// Original HuskyLens
    V1,
    /// HuskyLens 2 (extended algorithms, keypoints, drawing)
    V2,
}

/// Order of the three header bytes that follow the prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameLayout {
    /// `ADDRESS LENGTH COMMAND` (V1)
    AddressFirst,
    /// `COMMAND ADDRESS LENGTH` (V2)
    CommandFirst,
}

impl HardwareRevision {
    /// Header layout used by this revision
    pub const fn layout(self) -> FrameLayout {
        match self {
            HardwareRevision::V1 => FrameLayout::AddressFirst,
            HardwareRevision::V2 => FrameLayout::CommandFirst,
        }
    }

    /// Address byte for outbound control frames
    pub const fn request_address(self) -> u8 {
        match self {
            HardwareRevision::V1 => V1_ADDRESS,
            HardwareRevision::V2 => 0,
        }
    }

    /// Returns true if stale reply bytes must be drained before a request
    pub const fn needs_flush(self) -> bool {
        matches!(self, HardwareRevision::V2)
    }
}

impl FrameLayout {
    /// Split a header into `(address, command, length)`
    pub const fn split(self, header: [u8; 3]) -> (u8, u8, u8) {
        match self {
            FrameLayout::AddressFirst => (header[0], header[2], header[1]),
            FrameLayout::CommandFirst => (header[1], header[0], header[2]),
        }
    }

    /// Build a header from `(address, command, length)`
    pub const fn join(self, address: u8, command: u8, length: u8) -> [u8; 3] {
        match self {
            FrameLayout::AddressFirst => [address, length, command],
            FrameLayout::CommandFirst => [command, address, length],
        }
    }
}
