//! # ACPI (Advanced Configuration and Power Interface) Table Discovery
//!
//! This crate locates and validates the static ACPI tables the firmware
//! leaves in memory, and parses the two of them the boot-time device layer
//! depends on: the MADT (processor and interrupt controller inventory) and
//! the MCFG (PCI Express configuration space windows).
//!
//! ## Overview
//!
//! ACPI defines a standardized interface between the operating system and the
//! platform firmware (BIOS/UEFI). Only the static description tables are
//! consumed here; no AML is interpreted.
//!
//! ## Architecture
//!
//! ```text
//! EBDA (first 1 KiB) / BIOS ROM (0xE0000..0x100000)
//!     ↓  16-byte aligned "RSD PTR " scan
//! RSDP (Root System Description Pointer)
//!     ↓  revision < 2: RSDT (32-bit entries), revision ≥ 2: XSDT (64-bit entries)
//! RSDT/XSDT (Root/Extended System Description Table)
//!     ↓  one physical address per table, each checksummed on its own
//! Individual ACPI Tables (APIC, MCFG, FACP, HPET, ...)
//! ```
//!
//! ## Key Components
//!
//! ### Physical Memory Mapping ([`PhysMapRo`])
//! Abstract trait for mapping physical memory regions into the kernel's
//! address space. The locator never dereferences a physical address
//! directly; it always asks the mapper for a read-only slice.
//!
//! ### RSDP Discovery ([`rsdp`])
//! * **Search**: first KiB of the EBDA, then the 128 KiB BIOS ROM window
//! * **Validation**: signature, 20-byte checksum, and the extended
//!   full-length checksum for revision 2 and later
//!
//! ### Table Index ([`tables`])
//! * **Root Validation**: a root table with the wrong signature or a bad
//!   checksum is an error; nothing after it can be trusted
//! * **Entry Walk**: sub-tables failing their checksum are skipped
//! * **Capacity**: at most [`ACPI_MAX_TABLES`](kernel_info::limits::ACPI_MAX_TABLES)
//!   entries; a firmware exposing more is rejected
//! * **Lookup**: linear search by [`Signature`], first match wins
//!
//! ### Table Parsers ([`madt`], [`mcfg`])
//! * **MADT**: Local APIC, I/O APIC and interrupt source override records
//! * **MCFG**: ECAM segment allocations and address computation
//!
//! ### Byte Cursor ([`cursor`])
//! Every variable-length record walk goes through [`cursor::ByteCursor`],
//! which bounds each read by the bytes actually remaining. A record whose
//! self-declared length is zero or overruns the table stops the walk.
//!
//! ## Safety Considerations
//!
//! The only unsafe operations are the calls into [`PhysMapRo::map_ro`] and
//! unaligned reads of `#[repr(C, packed)]` headers out of slices whose
//! length has already been checked. Everything downstream of a mapped slice
//! is safe, bounds-checked parsing.
//!
//! ## Usage Patterns
//!
//! ```rust,no_run
//! use kernel_acpi::{PhysMapRo, Signature, rsdp::find_rsdp, tables::AcpiTables};
//! use kernel_info::addr::PhysicalAddress;
//!
//! struct Hhdm;
//! impl PhysMapRo for Hhdm {
//!     unsafe fn map_ro<'a>(&self, paddr: PhysicalAddress, len: usize) -> &'a [u8] {
//!         let va = 0xffff_8880_0000_0000u64 + paddr.as_u64();
//!         unsafe { core::slice::from_raw_parts(va as *const u8, len) }
//!     }
//! }
//!
//! let rsdp = unsafe { find_rsdp(&Hhdm) }.expect("no RSDP");
//! let tables = unsafe { AcpiTables::init(&Hhdm, &rsdp) }.expect("bad root table");
//! if let Some(madt) = tables.lookup(Signature::APIC) {
//!     println!("MADT at {}", madt.phys());
//! }
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod cursor;
pub mod madt;
pub mod mcfg;
pub mod rsdp;
pub mod sdt;
pub mod tables;

use core::fmt;
use kernel_info::addr::PhysicalAddress;

pub use sdt::{SdtHeader, TableRef};
pub use tables::AcpiTables;

/// Map a physical region and return a *read-only* byte slice for its contents.
/// You provide the implementation (identity map, kmap, etc.).
pub trait PhysMapRo {
    /// # Safety
    /// The implementor must ensure the returned slice is valid for `len` bytes.
    unsafe fn map_ro<'a>(&self, paddr: PhysicalAddress, len: usize) -> &'a [u8];
}

fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |a, &b| a.wrapping_add(b))
}

/// Whether the unsigned byte sum of `bytes` is zero modulo 256.
#[must_use]
pub fn checksum_ok(bytes: &[u8]) -> bool {
    sum(bytes) == 0
}

/// Render a fixed-width firmware string, dropping trailing padding.
pub(crate) fn ascii(bytes: &[u8]) -> &str {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |i| i + 1);
    core::str::from_utf8(&bytes[..end]).unwrap_or("?")
}

/// Four-character ACPI table signature.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Signature(pub [u8; 4]);

impl Signature {
    /// Multiple APIC Description Table.
    pub const APIC: Self = Self(*b"APIC");
    /// PCI Express memory-mapped configuration space.
    pub const MCFG: Self = Self(*b"MCFG");
    /// Root System Description Table (32-bit entries).
    pub const RSDT: Self = Self(*b"RSDT");
    /// Extended System Description Table (64-bit entries).
    pub const XSDT: Self = Self(*b"XSDT");
    /// Fixed ACPI Description Table.
    pub const FACP: Self = Self(*b"FACP");
    /// High Precision Event Timer.
    pub const HPET: Self = Self(*b"HPET");

    #[must_use]
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for Signature {
    fn from(value: [u8; 4]) -> Self {
        Self(value)
    }
}

impl PartialEq<[u8; 4]> for Signature {
    fn eq(&self, other: &[u8; 4]) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' {
                char::from(b)
            } else {
                '?'
            };
            fmt::Write::write_char(f, c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(\"{self}\")")
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum AcpiError {
    #[error("No RSDP found")]
    RsdpNotFound,
    #[error("Incorrect {expected} signature (found {found})")]
    BadRootSignature {
        expected: Signature,
        found: Signature,
    },
    #[error("Bad {0} checksum")]
    BadRootChecksum(Signature),
    #[error("more than {capacity} tables")]
    TooManyTables { capacity: usize },
    #[error("table at {phys} is too short ({length} bytes)")]
    TableTooShort { phys: PhysicalAddress, length: u32 },
    #[error("expected {expected} table, found {found}")]
    WrongTable {
        expected: Signature,
        found: Signature,
    },
    #[error("malformed {table} record at offset {offset}")]
    MalformedRecord { table: Signature, offset: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_wraps() {
        assert!(checksum_ok(&[0x80, 0x80]));
        assert!(checksum_ok(&[]));
        assert!(!checksum_ok(&[1, 2, 3]));
        assert!(checksum_ok(&[1, 2, 3, 0xFA]));
    }

    #[test]
    fn ascii_trims_padding() {
        assert_eq!(ascii(b"BOCHS "), "BOCHS");
        assert_eq!(ascii(b"AB\0\0"), "AB");
        assert_eq!(ascii(b"    "), "");
    }

    #[test]
    fn signature_display() {
        assert_eq!(format!("{}", Signature::APIC), "APIC");
        assert_eq!(format!("{}", Signature::new([b'A', 0, b'C', 0xFF])), "A?C?");
        assert_eq!(format!("{:?}", Signature::MCFG), "Signature(\"MCFG\")");
        assert_eq!(Signature::XSDT, *b"XSDT");
    }
}
