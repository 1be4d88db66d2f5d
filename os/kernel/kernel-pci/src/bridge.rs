//! # PCI-to-PCI Bridge Driver

use crate::device::{PciBus, PciFunction};
use crate::driver::{Attach, AttachError, BusScanner, PciDriver};
use crate::regs::{BridgeBus, BridgeStatusIo, PCI_BRIDGE_BUS_REG, PCI_BRIDGE_STATIO_REG};
use log::info;

/// Recurses into the secondary bus of PCI-to-PCI bridges.
///
/// The child bus shares the parent's ECAM window; only the bus number
/// changes. Bridges decoding 32-bit I/O are left alone.
pub struct PciBridgeDriver;

impl PciDriver for PciBridgeDriver {
    fn name(&self) -> &'static str {
        "pci-bridge"
    }

    fn attach(
        &self,
        scanner: &dyn BusScanner,
        func: &PciFunction<'_>,
    ) -> Result<Attach, AttachError> {
        let io = BridgeStatusIo::from_bits(func.read_config(scanner, PCI_BRIDGE_STATIO_REG)?);
        let buses = BridgeBus::from_bits(func.read_config(scanner, PCI_BRIDGE_BUS_REG)?);

        if io.io_32bit() {
            info!("PCI: {}: 32-bit bridge IO not supported.", func.location());
            return Ok(Attach::Declined);
        }

        // Bus numbers grow away from the root; anything else would loop.
        if buses.secondary() <= func.bus.number {
            return Err(AttachError::BusNumbering {
                bus: func.bus.number,
                secondary: buses.secondary(),
            });
        }

        info!(
            "PCI: {}: bridge to PCI bus {}--{}",
            func.location(),
            buses.secondary(),
            buses.subordinate()
        );

        let child = PciBus {
            base: func.bus.base,
            number: buses.secondary(),
            parent_bridge: Some(func),
        };
        scanner.scan_bus(&child);
        Ok(Attach::Claimed)
    }
}
