//! # Bus Enumeration

use crate::config::{ConfigWindow, MmioMapper};
use crate::device::{PciBus, PciFunction};
use crate::driver::{Attach, BusScanner, CLASS_DRIVERS, DriverEntry, VENDOR_DRIVERS};
use crate::regs::{
    Bhlc, ClassReg, InterruptReg, PCI_BHLC_REG, PCI_CLASS_REG, PCI_ID_REG, PCI_INTERRUPT_REG,
    PCI_VENDOR_NONE, PciId,
};
use core::cell::Cell;
use kernel_acpi::mcfg::{Mcfg, McfgAllocation};
use kernel_acpi::{AcpiError, AcpiTables, Signature};
use kernel_info::addr::PhysicalAddress;
use log::{debug, info, warn};

const DEVICES_PER_BUS: u8 = 32;
const FUNCTIONS_PER_DEVICE: u8 = 8;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PciError {
    #[error("MCFG not found!")]
    MissingMcfg,
    #[error(transparent)]
    Acpi(#[from] AcpiError),
}

/// Counters collected during one enumeration.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ScanSummary {
    pub buses: usize,
    pub functions: usize,
    pub attached: usize,
    pub attach_errors: usize,
}

/// Walks buses through ECAM and hands every present function to the drivers.
pub struct Enumerator<'d, M: MmioMapper + ?Sized> {
    mapper: &'d M,
    class_drivers: &'d [DriverEntry<'d>],
    vendor_drivers: &'d [DriverEntry<'d>],
    summary: Cell<ScanSummary>,
}

impl<'d, M: MmioMapper + ?Sized> Enumerator<'d, M> {
    /// Enumerator using the built-in driver tables.
    #[must_use]
    pub fn new(mapper: &'d M) -> Self {
        Self::with_drivers(mapper, CLASS_DRIVERS, VENDOR_DRIVERS)
    }

    #[must_use]
    pub const fn with_drivers(
        mapper: &'d M,
        class_drivers: &'d [DriverEntry<'d>],
        vendor_drivers: &'d [DriverEntry<'d>],
    ) -> Self {
        Self {
            mapper,
            class_drivers,
            vendor_drivers,
            summary: Cell::new(ScanSummary {
                buses: 0,
                functions: 0,
                attached: 0,
                attach_errors: 0,
            }),
        }
    }

    #[must_use]
    pub fn summary(&self) -> ScanSummary {
        self.summary.get()
    }

    fn count(&self, f: impl FnOnce(&mut ScanSummary)) {
        let mut s = self.summary.get();
        f(&mut s);
        self.summary.set(s);
    }

    /// Scan the start bus of every MCFG allocation.
    ///
    /// Buses other than the start bus are only reached through bridges.
    #[must_use]
    pub fn enumerate(&self, mcfg: &Mcfg<'_>) -> ScanSummary {
        for alloc in mcfg.allocations() {
            self.scan_segment(&alloc);
        }
        self.summary()
    }

    pub fn scan_segment(&self, alloc: &McfgAllocation) {
        info!(
            "PCIe: {} [bus {}-{}]",
            alloc.base, alloc.start_bus, alloc.end_bus
        );
        self.scan_bus(&PciBus::root(alloc.base, alloc.start_bus));
    }

    fn probe(&self, bus: &PciBus<'_>, device: u8, function: u8) -> Option<(PciId, ClassReg, u8)> {
        let Some(address) = bus.function_address(device, function) else {
            warn!(
                "PCI: {:02x}:{:02x}.{} lies past the end of the address space",
                bus.number, device, function
            );
            return None;
        };
        let Some(window) = ConfigWindow::open(self.mapper, address) else {
            warn!("PCI: cannot map configuration space at {address}");
            return None;
        };

        let id = PciId::from_bits(window.read32(PCI_ID_REG));
        if id.vendor() == PCI_VENDOR_NONE {
            return None;
        }
        let irq_line = InterruptReg::from_bits(window.read32(PCI_INTERRUPT_REG)).line();
        let class = ClassReg::from_bits(window.read32(PCI_CLASS_REG));
        Some((id, class, irq_line))
    }

    fn attach(&self, func: &PciFunction<'_>) -> bool {
        let class_key = (u16::from(func.class.class()), u16::from(func.class.subclass()));
        let vendor_key = (func.id.vendor(), func.id.device());
        self.attach_match(class_key, self.class_drivers, func)
            || self.attach_match(vendor_key, self.vendor_drivers, func)
    }

    fn attach_match(
        &self,
        key: (u16, u16),
        list: &[DriverEntry<'_>],
        func: &PciFunction<'_>,
    ) -> bool {
        for entry in list.iter().filter(|e| e.key == key) {
            match entry.driver.attach(self, func) {
                Ok(Attach::Claimed) => {
                    self.count(|s| s.attached += 1);
                    return true;
                }
                Ok(Attach::Declined) => {}
                Err(e) => {
                    warn!(
                        "PCI: {}: attaching {:x}.{:x} ({}): {e}",
                        func.location(),
                        key.0,
                        key.1,
                        entry.driver.name()
                    );
                    self.count(|s| s.attach_errors += 1);
                }
            }
        }
        false
    }
}

impl<M: MmioMapper + ?Sized> BusScanner for Enumerator<'_, M> {
    fn scan_bus(&self, bus: &PciBus<'_>) {
        self.count(|s| s.buses += 1);

        for device in 0..DEVICES_PER_BUS {
            // Empty slots read all-ones, which decodes as an unsupported header type.
            let Some(bhlc) = bus
                .function_address(device, 0)
                .and_then(|address| self.read_config(address, PCI_BHLC_REG))
            else {
                continue;
            };
            let bhlc = Bhlc::from_bits(bhlc);
            if bhlc.header_type() > 1 {
                continue;
            }

            let functions = if bhlc.multifunction() {
                FUNCTIONS_PER_DEVICE
            } else {
                1
            };

            for function in 0..functions {
                let Some((id, class, irq_line)) = self.probe(bus, device, function) else {
                    continue;
                };
                let func = PciFunction {
                    bus,
                    device,
                    function,
                    id,
                    class,
                    irq_line,
                };
                self.count(|s| s.functions += 1);
                info!("PCI: {func}");
                if !self.attach(&func) {
                    debug!("PCI: {}: no driver", func.location());
                }
            }
        }
    }

    fn read_config(&self, address: PhysicalAddress, offset: u16) -> Option<u32> {
        ConfigWindow::open(self.mapper, address).map(|w| w.read32(offset))
    }
}

/// Enumerate every PCI segment described by the MCFG.
///
/// # Errors
/// [`PciError::MissingMcfg`] if the firmware exposes no MCFG, or
/// [`PciError::Acpi`] if it is too short to parse.
pub fn pcie_init<M: MmioMapper + ?Sized>(
    tables: &AcpiTables<'_>,
    mapper: &M,
) -> Result<ScanSummary, PciError> {
    let table = tables.lookup(Signature::MCFG).ok_or(PciError::MissingMcfg)?;
    let mcfg = Mcfg::parse(table)?;
    let summary = Enumerator::new(mapper).enumerate(&mcfg);
    info!(
        "PCI: {} function(s) on {} bus(es), {} attached",
        summary.functions, summary.buses, summary.attached
    );
    Ok(summary)
}
