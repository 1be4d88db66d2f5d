//! # Driver Matching

use crate::bridge::PciBridgeDriver;
use crate::device::{Location, PciBus, PciFunction};
use crate::regs::{PCI_CLASS_BRIDGE, PCI_SUBCLASS_BRIDGE_PCI};
use kernel_info::addr::PhysicalAddress;

/// Outcome of a successful attach callback.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Attach {
    /// The driver owns the function; matching stops.
    Claimed,
    /// Not handled; the next matching driver is tried.
    Declined,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum AttachError {
    #[error("configuration space of {0} could not be mapped")]
    Unmapped(PhysicalAddress),
    #[error("configuration space of {0} lies past the physical address space")]
    AddressOverflow(Location),
    #[error("secondary bus {secondary} is not behind bus {bus}")]
    BusNumbering { bus: u8, secondary: u8 },
    #[error("{0}")]
    Device(&'static str),
}

/// Services the enumerator offers to drivers during attach.
pub trait BusScanner {
    /// Enumerate every device on `bus`, dispatching drivers as usual.
    fn scan_bus(&self, bus: &PciBus<'_>);

    /// Read one dword of configuration space at `address + offset`.
    fn read_config(&self, address: PhysicalAddress, offset: u16) -> Option<u32>;
}

pub trait PciDriver: Sync {
    fn name(&self) -> &'static str;

    /// Try to take ownership of `func`.
    ///
    /// # Errors
    /// Any [`AttachError`] is logged by the enumerator, which then keeps
    /// trying further matching drivers.
    fn attach(&self, scanner: &dyn BusScanner, func: &PciFunction<'_>)
    -> Result<Attach, AttachError>;
}

/// A driver and the key it is matched by: `(class, subclass)` in the class
/// table, `(vendor, device)` in the vendor table.
#[derive(Copy, Clone)]
pub struct DriverEntry<'d> {
    pub key: (u16, u16),
    pub driver: &'d dyn PciDriver,
}

impl<'d> DriverEntry<'d> {
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn class(class: u8, subclass: u8, driver: &'d dyn PciDriver) -> Self {
        Self {
            key: (class as u16, subclass as u16),
            driver,
        }
    }

    #[must_use]
    pub const fn vendor(vendor: u16, device: u16, driver: &'d dyn PciDriver) -> Self {
        Self {
            key: (vendor, device),
            driver,
        }
    }
}

/// Drivers matched by class and subclass.
pub static CLASS_DRIVERS: &[DriverEntry<'static>] = &[DriverEntry::class(
    PCI_CLASS_BRIDGE,
    PCI_SUBCLASS_BRIDGE_PCI,
    &PciBridgeDriver,
)];

/// Drivers matched by vendor and device id.
pub static VENDOR_DRIVERS: &[DriverEntry<'static>] = &[];

impl PciFunction<'_> {
    /// Read one dword of this function's configuration space.
    ///
    /// # Errors
    /// [`AttachError::Unmapped`] if the window cannot be mapped,
    /// [`AttachError::AddressOverflow`] if it has no physical address.
    pub fn read_config(&self, scanner: &dyn BusScanner, offset: u16) -> Result<u32, AttachError> {
        let address = self
            .config_address()
            .ok_or(AttachError::AddressOverflow(self.location()))?;
        scanner
            .read_config(address, offset)
            .ok_or(AttachError::Unmapped(address))
    }
}
