// Clickrs Identifier Types
// Opaque device and button identifiers, stable for the life of a device attachment

use std::fmt;

/// Identifies one attached pointing device.
///
/// The value is opaque to this crate; the device layer picks it (registry ID,
/// IOKit service ID, evdev node number, ...) and guarantees it stays stable
/// until the matching detach notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(u64);

impl DeviceId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for DeviceId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 1-based hardware button number on a pointing device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ButtonNumber(u8);

impl ButtonNumber {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl From<u8> for ButtonNumber {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ButtonNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
