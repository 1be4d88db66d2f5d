//! # Discovered Table Index
//!
//! Walks the RSDT/XSDT entry array and keeps every sub-table that passes
//! its own checksum, up to [`ACPI_MAX_TABLES`].

use crate::cursor::ByteCursor;
use crate::rsdp::{RootTable, RsdpTable};
use crate::{AcpiError, PhysMapRo, Signature, TableRef};
use kernel_info::addr::PhysicalAddress;
use kernel_info::limits::ACPI_MAX_TABLES;
use log::{info, warn};

/// The ACPI tables found at boot, in root-table order.
pub struct AcpiTables<'a> {
    rsdp: RsdpTable,
    root: TableRef<'a>,
    entries: [Option<TableRef<'a>>; ACPI_MAX_TABLES],
    len: usize,
}

impl<'a> AcpiTables<'a> {
    /// Validate the root table selected by `rsdp` and index its entries.
    ///
    /// # Safety
    /// The mapper must expose the root table and every table it references.
    ///
    /// # Errors
    /// * [`AcpiError::BadRootSignature`] / [`AcpiError::BadRootChecksum`] if
    ///   the root table cannot be trusted.
    /// * [`AcpiError::TooManyTables`] if more than [`ACPI_MAX_TABLES`] valid
    ///   tables are referenced.
    pub unsafe fn init(map: &impl PhysMapRo, rsdp: &RsdpTable) -> Result<Self, AcpiError> {
        let kind = rsdp.root();
        let expected = kind.signature();
        let root = unsafe { TableRef::map(map, kind.address()) }?;

        let found = root.signature();
        if found != expected {
            return Err(AcpiError::BadRootSignature { expected, found });
        }
        if !root.checksum_ok() {
            return Err(AcpiError::BadRootChecksum(expected));
        }
        info!("ACPI: {root}");

        let mut tables = Self {
            rsdp: *rsdp,
            root,
            entries: [None; ACPI_MAX_TABLES],
            len: 0,
        };

        let mut cursor = ByteCursor::new(root.body());
        while let Some(phys) = next_entry(&mut cursor, kind) {
            if phys.is_null() {
                warn!("ACPI: {expected} has a null entry");
                continue;
            }

            let table = match unsafe { TableRef::map(map, phys) } {
                Ok(table) if table.checksum_ok() => table,
                Ok(table) => {
                    warn!("ACPI: skipping {} at {phys}: bad checksum", table.signature());
                    continue;
                }
                Err(e) => {
                    warn!("ACPI: skipping entry: {e}");
                    continue;
                }
            };

            info!("ACPI: {table}");
            tables.push(table)?;
        }

        Ok(tables)
    }

    fn push(&mut self, table: TableRef<'a>) -> Result<(), AcpiError> {
        let slot = self
            .entries
            .get_mut(self.len)
            .ok_or(AcpiError::TooManyTables {
                capacity: ACPI_MAX_TABLES,
            })?;
        *slot = Some(table);
        self.len += 1;
        Ok(())
    }

    /// The first discovered table carrying `signature`.
    #[must_use]
    pub fn lookup(&self, signature: Signature) -> Option<TableRef<'a>> {
        self.iter().find(|t| t.signature() == signature)
    }

    pub fn iter(&self) -> impl Iterator<Item = TableRef<'a>> + '_ {
        self.entries[..self.len].iter().flatten().copied()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn rsdp(&self) -> &RsdpTable {
        &self.rsdp
    }

    /// The validated RSDT or XSDT.
    #[must_use]
    pub const fn root(&self) -> TableRef<'a> {
        self.root
    }
}

fn next_entry(cursor: &mut ByteCursor<'_>, kind: RootTable) -> Option<PhysicalAddress> {
    match kind {
        RootTable::Rsdt(_) => cursor.u32().map(PhysicalAddress::from),
        RootTable::Xsdt(_) => cursor.u64().map(PhysicalAddress::from),
    }
}
