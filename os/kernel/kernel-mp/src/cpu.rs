use kernel_acpi::madt::InterruptOverride;
use kernel_info::limits::{MAX_INTERRUPT_OVERRIDES, NCPU};

/// Life-cycle state of a processor.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum CpuStatus {
    /// Known from the MADT but not started yet.
    #[default]
    Unused,
    /// Running kernel code.
    Started,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct CpuInfo {
    /// Local APIC id; not necessarily equal to the index in [`CpuList`].
    pub apic_id: u8,
    pub status: CpuStatus,
}

/// Processors in MADT order, capped at [`NCPU`].
#[derive(Debug, Clone)]
pub struct CpuList {
    cpus: [CpuInfo; NCPU],
    len: usize,
    dropped: usize,
}

impl CpuList {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cpus: [CpuInfo {
                apic_id: 0,
                status: CpuStatus::Unused,
            }; NCPU],
            len: 0,
            dropped: 0,
        }
    }

    /// Append a processor. The first one becomes the boot processor and is
    /// marked [`CpuStatus::Started`]. Returns `false` once the list is full.
    pub fn push(&mut self, apic_id: u8) -> bool {
        let Some(slot) = self.cpus.get_mut(self.len) else {
            self.dropped += 1;
            return false;
        };
        let status = if self.len == 0 {
            CpuStatus::Started
        } else {
            CpuStatus::Unused
        };
        *slot = CpuInfo { apic_id, status };
        self.len += 1;
        true
    }

    #[must_use]
    pub fn boot_cpu(&self) -> Option<&CpuInfo> {
        self.as_slice().first()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[CpuInfo] {
        &self.cpus[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CpuInfo> {
        self.as_slice().iter()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Enabled processors that did not fit.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped
    }
}

impl Default for CpuList {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt source overrides in MADT order, capped at [`MAX_INTERRUPT_OVERRIDES`].
#[derive(Debug, Clone, Default)]
pub struct OverrideList {
    entries: [Option<InterruptOverride>; MAX_INTERRUPT_OVERRIDES],
    len: usize,
}

impl OverrideList {
    pub(crate) fn push(&mut self, entry: InterruptOverride) -> bool {
        let Some(slot) = self.entries.get_mut(self.len) else {
            return false;
        };
        *slot = Some(entry);
        self.len += 1;
        true
    }

    /// The global system interrupt an ISA IRQ is routed to.
    #[must_use]
    pub fn gsi_for_isa_irq(&self, irq: u8) -> u32 {
        self.iter()
            .find(|o| o.bus == 0 && o.source == irq)
            .map_or(u32::from(irq), |o| o.gsi)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InterruptOverride> {
        self.entries[..self.len].iter().flatten()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}
