//! # MADT (Multiple APIC Description Table)
//!
//! After the common header the MADT carries the local APIC address and a
//! flags word, followed by a stream of variable-length interrupt
//! controller structures:
//!
//! ```text
//! +0  type   (u8)
//! +1  length (u8, including these two bytes)
//! +2  type-specific payload
//! ```

use crate::cursor::ByteCursor;
use crate::sdt::SDT_HEADER_LEN;
use crate::{AcpiError, Signature, TableRef};
use kernel_info::addr::PhysicalAddress;

/// Common header plus local APIC address and flags.
pub const MADT_HEADER_LEN: usize = SDT_HEADER_LEN + 8;

const TYPE_LOCAL_APIC: u8 = 0;
const TYPE_IO_APIC: u8 = 1;
const TYPE_INTERRUPT_OVERRIDE: u8 = 2;

const LOCAL_APIC_ENABLED: u32 = 1 << 0;
const PCAT_COMPAT: u32 = 1 << 0;

/// Processor Local APIC structure (type 0).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LocalApic {
    pub processor_id: u8,
    pub apic_id: u8,
    pub flags: u32,
}

impl LocalApic {
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.flags & LOCAL_APIC_ENABLED != 0
    }
}

/// I/O APIC structure (type 1).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IoApic {
    pub id: u8,
    pub address: PhysicalAddress,
    /// First global system interrupt this I/O APIC handles.
    pub gsi_base: u32,
}

/// Interrupt Source Override structure (type 2).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InterruptOverride {
    pub bus: u8,
    /// Bus-relative (ISA) interrupt source.
    pub source: u8,
    pub gsi: u32,
    /// MPS INTI flags (polarity, trigger mode).
    pub flags: u16,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MadtEntry {
    LocalApic(LocalApic),
    IoApic(IoApic),
    InterruptOverride(InterruptOverride),
    /// A structure this parser does not decode.
    Other { kind: u8, length: u8 },
}

/// A validated MADT.
#[derive(Debug, Copy, Clone)]
pub struct Madt<'a> {
    table: TableRef<'a>,
    local_apic_address: u32,
    flags: u32,
}

impl<'a> Madt<'a> {
    /// # Errors
    /// [`AcpiError::WrongTable`] if `table` is not an `APIC` table,
    /// [`AcpiError::TableTooShort`] if it cannot hold the MADT header.
    pub fn parse(table: TableRef<'a>) -> Result<Self, AcpiError> {
        let found = table.signature();
        if found != Signature::APIC {
            return Err(AcpiError::WrongTable {
                expected: Signature::APIC,
                found,
            });
        }

        let mut c = ByteCursor::new(table.body());
        let (Some(local_apic_address), Some(flags)) = (c.u32(), c.u32()) else {
            return Err(AcpiError::TableTooShort {
                phys: table.phys(),
                length: table.header().length,
            });
        };

        Ok(Self {
            table,
            local_apic_address,
            flags,
        })
    }

    /// Physical address of every processor's local APIC.
    #[must_use]
    pub fn local_apic_address(&self) -> PhysicalAddress {
        PhysicalAddress::from(self.local_apic_address)
    }

    /// Whether the system also has dual legacy 8259 PICs.
    #[must_use]
    pub const fn pcat_compat(&self) -> bool {
        self.flags & PCAT_COMPAT != 0
    }

    #[must_use]
    pub const fn table(&self) -> TableRef<'a> {
        self.table
    }

    /// The interrupt controller structures, in table order.
    #[must_use]
    pub fn entries(&self) -> MadtEntries<'a> {
        MadtEntries {
            cursor: ByteCursor::new(&self.table.bytes()[MADT_HEADER_LEN..]),
            done: false,
        }
    }
}

/// Iterator over MADT structures.
///
/// Yields an error and stops when a structure declares a length shorter than
/// its own type/length prefix (including zero) or longer than what is left
/// of the table.
pub struct MadtEntries<'a> {
    cursor: ByteCursor<'a>,
    done: bool,
}

impl MadtEntries<'_> {
    fn malformed(&mut self, start: usize) -> AcpiError {
        self.done = true;
        AcpiError::MalformedRecord {
            table: Signature::APIC,
            offset: MADT_HEADER_LEN + start,
        }
    }
}

impl Iterator for MadtEntries<'_> {
    type Item = Result<MadtEntry, AcpiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.cursor.is_empty() {
            return None;
        }

        let start = self.cursor.position();
        let (kind, length) = match self.cursor.rest() {
            [kind, length, ..] => (*kind, *length),
            _ => return Some(Err(self.malformed(start))),
        };
        if length < 2 {
            return Some(Err(self.malformed(start)));
        }
        let Some(record) = self.cursor.take(usize::from(length)) else {
            return Some(Err(self.malformed(start)));
        };

        Some(decode(kind, length, &record[2..]).ok_or_else(|| self.malformed(start)))
    }
}

fn decode(kind: u8, length: u8, payload: &[u8]) -> Option<MadtEntry> {
    let mut c = ByteCursor::new(payload);
    let entry = match kind {
        TYPE_LOCAL_APIC => MadtEntry::LocalApic(LocalApic {
            processor_id: c.u8()?,
            apic_id: c.u8()?,
            flags: c.u32()?,
        }),
        TYPE_IO_APIC => {
            let id = c.u8()?;
            c.skip(1)?;
            MadtEntry::IoApic(IoApic {
                id,
                address: PhysicalAddress::from(c.u32()?),
                gsi_base: c.u32()?,
            })
        }
        TYPE_INTERRUPT_OVERRIDE => MadtEntry::InterruptOverride(InterruptOverride {
            bus: c.u8()?,
            source: c.u8()?,
            gsi: c.u32()?,
            flags: c.u16()?,
        }),
        kind => MadtEntry::Other { kind, length },
    };
    Some(entry)
}
