//! # MCFG (PCI Express Memory-Mapped Configuration)
//!
//! After the common header and eight reserved bytes, the MCFG lists one
//! 16-byte allocation per PCI segment group:
//!
//! ```text
//! +0   base address of the ECAM window (u64)
//! +8   PCI segment group number (u16)
//! +10  start bus number (u8)
//! +11  end bus number (u8, inclusive)
//! +12  reserved (u32)
//! ```

use crate::cursor::ByteCursor;
use crate::sdt::SDT_HEADER_LEN;
use crate::{AcpiError, Signature, TableRef};
use core::fmt;
use kernel_info::addr::PhysicalAddress;

/// Common header plus eight reserved bytes.
pub const MCFG_HEADER_LEN: usize = SDT_HEADER_LEN + 8;

/// Size of one configuration space allocation record.
pub const MCFG_ALLOCATION_LEN: usize = 16;

/// Bytes of configuration space per function.
pub const ECAM_FUNCTION_SIZE: usize = 4096;

/// Offset of a function's configuration space inside an ECAM window.
#[must_use]
#[allow(clippy::cast_lossless)]
pub const fn ecam_offset(bus: u8, device: u8, function: u8) -> u64 {
    ((bus as u64) << 20) | (((device & 0x1F) as u64) << 15) | (((function & 0x7) as u64) << 12)
}

/// One ECAM window.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct McfgAllocation {
    pub base: PhysicalAddress,
    pub segment: u16,
    pub start_bus: u8,
    pub end_bus: u8,
}

impl McfgAllocation {
    fn read(record: &[u8]) -> Option<Self> {
        let mut c = ByteCursor::new(record);
        Some(Self {
            base: PhysicalAddress::new(c.u64()?),
            segment: c.u16()?,
            start_bus: c.u8()?,
            end_bus: c.u8()?,
        })
    }
}

/// `0xB0000000 segment 0 [bus 00-ff]`
impl fmt::Display for McfgAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} segment {} [bus {:02x}-{:02x}]",
            self.base, self.segment, self.start_bus, self.end_bus
        )
    }
}

/// A validated MCFG.
#[derive(Debug, Copy, Clone)]
pub struct Mcfg<'a> {
    table: TableRef<'a>,
}

impl<'a> Mcfg<'a> {
    /// # Errors
    /// [`AcpiError::WrongTable`] if `table` is not an `MCFG` table,
    /// [`AcpiError::TableTooShort`] if it cannot hold the MCFG header.
    pub fn parse(table: TableRef<'a>) -> Result<Self, AcpiError> {
        let found = table.signature();
        if found != Signature::MCFG {
            return Err(AcpiError::WrongTable {
                expected: Signature::MCFG,
                found,
            });
        }
        if table.len() < MCFG_HEADER_LEN {
            return Err(AcpiError::TableTooShort {
                phys: table.phys(),
                length: table.header().length,
            });
        }
        Ok(Self { table })
    }

    /// Allocation records in table order; a trailing partial record is ignored.
    pub fn allocations(&self) -> impl Iterator<Item = McfgAllocation> + 'a {
        self.table.bytes()[MCFG_HEADER_LEN..]
            .chunks_exact(MCFG_ALLOCATION_LEN)
            .filter_map(McfgAllocation::read)
    }

    #[must_use]
    pub const fn table(&self) -> TableRef<'a> {
        self.table
    }
}
