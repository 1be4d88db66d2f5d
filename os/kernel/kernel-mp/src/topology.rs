use crate::cpu::{CpuList, OverrideList};
use kernel_acpi::madt::{Madt, MadtEntry};
use kernel_acpi::{AcpiError, AcpiTables, Signature};
use kernel_info::addr::PhysicalAddress;
use log::{debug, info, warn};

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum MpError {
    #[error("No MADT found")]
    MissingMadt,
    #[error(transparent)]
    Acpi(#[from] AcpiError),
}

/// The I/O APIC the kernel routes interrupts through.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IoApicInfo {
    pub id: u8,
    pub address: PhysicalAddress,
}

/// Processor and interrupt controller inventory.
#[derive(Debug, Clone)]
pub struct Topology {
    pub cpus: CpuList,
    /// Physical address of the local APIC register block.
    pub lapic_address: PhysicalAddress,
    /// The I/O APIC with global system interrupt base 0, if any.
    pub ioapic: Option<IoApicInfo>,
    pub overrides: OverrideList,
}

impl Topology {
    #[must_use]
    pub const fn ncpu(&self) -> usize {
        self.cpus.len()
    }
}

/// Walk the MADT and collect processors, the I/O APIC and ISA overrides.
#[must_use]
pub fn discover_topology(madt: &Madt<'_>) -> Topology {
    let mut topology = Topology {
        cpus: CpuList::new(),
        lapic_address: madt.local_apic_address(),
        ioapic: None,
        overrides: OverrideList::default(),
    };

    for entry in madt.entries() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("SMP: {e}, ignoring rest of MADT");
                break;
            }
        };

        match entry {
            MadtEntry::LocalApic(lapic) if lapic.is_enabled() => {
                if !topology.cpus.push(lapic.apic_id) {
                    debug!("SMP: dropping CPU with APIC id {}", lapic.apic_id);
                }
            }
            MadtEntry::IoApic(io) if io.gsi_base == 0 && topology.ioapic.is_none() => {
                topology.ioapic = Some(IoApicInfo {
                    id: io.id,
                    address: io.address,
                });
            }
            MadtEntry::IoApic(io) => {
                debug!(
                    "SMP: ignoring IOAPIC {} at {} (GSI base {})",
                    io.id, io.address, io.gsi_base
                );
            }
            MadtEntry::InterruptOverride(o) => {
                if !topology.overrides.push(o) {
                    warn!("SMP: dropping override IRQ {} -> GSI {}", o.source, o.gsi);
                }
            }
            MadtEntry::LocalApic(_) | MadtEntry::Other { .. } => {}
        }
    }

    topology
}

/// Discover the processor inventory from the indexed ACPI tables.
///
/// # Errors
/// [`MpError::MissingMadt`] if the firmware exposes no MADT, or
/// [`MpError::Acpi`] if the MADT cannot hold its own header.
pub fn mp_init(tables: &AcpiTables<'_>) -> Result<Topology, MpError> {
    let table = tables.lookup(Signature::APIC).ok_or(MpError::MissingMadt)?;
    let madt = Madt::parse(table)?;
    let topology = discover_topology(&madt);

    info!("SMP: {} CPU(s)", topology.ncpu());
    if topology.cpus.dropped() > 0 {
        warn!("SMP: {} CPU(s) above the limit were ignored", topology.cpus.dropped());
    }
    Ok(topology)
}
