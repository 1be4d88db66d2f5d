//! # Buses and Functions

use crate::regs::{ClassReg, PciId};
use core::fmt;
use kernel_acpi::mcfg::ecam_offset;
use kernel_info::addr::PhysicalAddress;

const CLASS_NAMES: [&str; 7] = [
    "Unknown",
    "Mass storage controller",
    "Network controller",
    "Display controller",
    "Multimedia device",
    "Memory controller",
    "Bridge device",
];

/// Human readable name of a base class code.
#[must_use]
pub fn class_name(class: u8) -> &'static str {
    CLASS_NAMES
        .get(usize::from(class))
        .copied()
        .unwrap_or(CLASS_NAMES[0])
}

/// A bus inside one ECAM window.
#[derive(Debug, Copy, Clone)]
pub struct PciBus<'a> {
    /// ECAM base of the segment the bus belongs to.
    pub base: PhysicalAddress,
    pub number: u8,
    /// The bridge this bus sits behind; `None` for a root bus.
    pub parent_bridge: Option<&'a PciFunction<'a>>,
}

impl PciBus<'_> {
    #[must_use]
    pub const fn root(base: PhysicalAddress, number: u8) -> Self {
        Self {
            base,
            number,
            parent_bridge: None,
        }
    }

    /// Configuration space address of `device.function` on this bus, or
    /// `None` if the firmware's window base puts it past the address space.
    #[must_use]
    pub const fn function_address(&self, device: u8, function: u8) -> Option<PhysicalAddress> {
        self.base.checked_add(ecam_offset(self.number, device, function))
    }
}

/// A present function, as handed to driver attach callbacks.
#[derive(Debug, Copy, Clone)]
pub struct PciFunction<'a> {
    pub bus: &'a PciBus<'a>,
    pub device: u8,
    pub function: u8,
    pub id: PciId,
    pub class: ClassReg,
    pub irq_line: u8,
}

impl PciFunction<'_> {
    #[must_use]
    pub const fn config_address(&self) -> Option<PhysicalAddress> {
        self.bus.function_address(self.device, self.function)
    }

    /// `bb:dd.f`
    #[must_use]
    pub const fn location(&self) -> Location {
        Location {
            bus: self.bus.number,
            device: self.device,
            function: self.function,
        }
    }
}

/// `bus:device.function` triple.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Location {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}.{}", self.bus, self.device, self.function)
    }
}

/// `00:1f.2 8086:2922 01.06 v2 Mass storage controller`
impl fmt::Display for PciFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:04x}:{:04x} {:02x}.{:02x} v{:x} {}",
            self.location(),
            self.id.vendor(),
            self.id.device(),
            self.class.class(),
            self.class.subclass(),
            self.class.revision(),
            class_name(self.class.class())
        )
    }
}
