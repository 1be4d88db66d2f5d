//! # Fixed Capacities

/// Maximum number of processors recorded in the CPU inventory.
///
/// Additional enabled Local APIC entries are dropped.
pub const NCPU: usize = 8;

/// Maximum number of ACPI tables the locator indexes.
///
/// Firmware exposing more valid tables is outside the supported envelope.
pub const ACPI_MAX_TABLES: usize = 32;

/// Maximum number of interrupt source overrides kept from the MADT.
pub const MAX_INTERRUPT_OVERRIDES: usize = 16;

/// Number of port slots in an AHCI controller.
pub const AHCI_MAX_PORTS: usize = 32;

/// Number of command headers in one AHCI command list.
pub const AHCI_COMMAND_SLOTS: usize = 32;

/// Size of a disk sector in bytes.
pub const SECTOR_SIZE: usize = 512;

/// Size of a file-system block in bytes.
pub const BLOCK_SIZE: usize = 4096;

/// Sectors per file-system block, and the largest transfer of one command.
pub const BLOCK_SECTORS: usize = BLOCK_SIZE / SECTOR_SIZE;

/// Largest byte count a single physical region descriptor can describe.
pub const PRD_MAX_BYTES: usize = 4 * 1024 * 1024;

const _: () = {
    assert!(BLOCK_SIZE.is_multiple_of(SECTOR_SIZE));
    assert!(BLOCK_SECTORS * SECTOR_SIZE <= PRD_MAX_BYTES);
    assert!(AHCI_MAX_PORTS == 32, "ports-implemented is a 32-bit bitmap");
    assert!(NCPU > 0);
};
