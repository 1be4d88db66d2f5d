//! # Boot-Time Entry Points
//!
//! Thin wrappers over the discovery crates that turn every fatal condition
//! into a panic carrying the diagnostic. The kernel's panic handler halts.

use kernel_acpi::rsdp::find_rsdp;
use kernel_acpi::{AcpiTables, PhysMapRo, Signature, TableRef};
use kernel_ahci::{Ahci, AhciError, DmaMemory, HbaIo, PortPages};
use kernel_info::config::DiscoveryConfig;
use kernel_mp::{MpError, Topology};
use kernel_pci::{MmioMapper, PciError, ScanSummary};
use log::{error, info};

/// Locate the RSDP and index every valid ACPI table.
///
/// # Panics
/// `ACPI: No RSDP found`, or `ACPI: <reason>` if the root table is unusable
/// or lists too many tables.
///
/// # Safety
/// `map` must expose low memory and every table the firmware references,
/// for as long as the returned tables are used.
#[must_use]
pub unsafe fn acpi_init<'a>(map: &impl PhysMapRo) -> AcpiTables<'a> {
    let Some(rsdp) = (unsafe { find_rsdp(map) }) else {
        panic!("ACPI: No RSDP found");
    };
    info!("ACPI: {rsdp}");
    match unsafe { AcpiTables::init(map, &rsdp) } {
        Ok(tables) => tables,
        Err(e) => panic!("ACPI: {e}"),
    }
}

/// The first discovered table with the given signature.
#[must_use]
pub fn acpi_get_table<'a>(
    tables: &AcpiTables<'a>,
    signature: impl Into<Signature>,
) -> Option<TableRef<'a>> {
    tables.lookup(signature.into())
}

/// Build the processor inventory from the MADT.
///
/// # Panics
/// `ACPI: No MADT found` if the firmware has none.
#[must_use]
pub fn mp_init(tables: &AcpiTables<'_>) -> Topology {
    match kernel_mp::mp_init(tables) {
        Ok(topology) => topology,
        Err(MpError::MissingMadt) => panic!("ACPI: No MADT found"),
        Err(e) => panic!("ACPI: {e}"),
    }
}

/// Enumerate PCI through the MCFG and attach drivers.
///
/// # Panics
/// `PCIe: MCFG not found!` if the firmware has no MCFG.
#[must_use]
pub fn pcie_init<M: MmioMapper + ?Sized>(tables: &AcpiTables<'_>, mapper: &M) -> ScanSummary {
    match kernel_pci::pcie_init(tables, mapper) {
        Ok(summary) => summary,
        Err(PciError::MissingMcfg) => panic!("PCIe: MCFG not found!"),
        Err(e) => panic!("PCIe: {e}"),
    }
}

/// Bring up the controller at `config.ahci_window` and adopt the first
/// working disk.
///
/// # Panics
/// `AHCI not mapped` if `hba` is not the configured window or the window is
/// not mapped, `Disk not found!` if no port has a usable device.
#[must_use]
pub fn ahci_init<'p, R: HbaIo, D: DmaMemory>(
    hba: R,
    dma: D,
    pages: &'p mut PortPages,
    config: &DiscoveryConfig,
) -> Ahci<'p, R, D> {
    if hba.base() != config.ahci_window {
        error!(
            "AHCI: registers at {:#x}, configured window {:#x}",
            hba.base(),
            config.ahci_window
        );
        panic!("AHCI not mapped");
    }
    match Ahci::init(hba, dma, pages, config.poll) {
        Ok(ahci) => ahci,
        Err(e) => panic!("{e}"),
    }
}

/// Read `count` sectors (at most one block) starting at `sector`.
///
/// # Errors
/// Range, alignment, device and timeout errors from the driver.
pub fn ahci_read<R: HbaIo, D: DmaMemory>(
    ahci: &mut Ahci<'_, R, D>,
    sector: u64,
    buf: &mut [u8],
    count: u16,
) -> Result<(), AhciError> {
    ahci.read(sector, buf, count)
}

/// Write `count` sectors (at most one block) starting at `sector`.
///
/// # Errors
/// Range, alignment, device and timeout errors from the driver.
pub fn ahci_write<R: HbaIo, D: DmaMemory>(
    ahci: &mut Ahci<'_, R, D>,
    sector: u64,
    buf: &[u8],
    count: u16,
) -> Result<(), AhciError> {
    ahci.write(sector, buf, count)
}
