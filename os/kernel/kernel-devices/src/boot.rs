use crate::init::{acpi_init, ahci_init, ahci_read, ahci_write, mp_init, pcie_init};
use kernel_acpi::{AcpiTables, PhysMapRo, Signature, TableRef};
use kernel_ahci::{Ahci, AhciError, DiskInfo, DmaMemory, HbaIo, PortPages};
use kernel_info::config::DiscoveryConfig;
use kernel_mp::Topology;
use kernel_pci::{MmioMapper, ScanSummary};

/// Everything hardware discovery produced at boot.
pub struct BootDevices<'a, 'p, R, D> {
    pub acpi: AcpiTables<'a>,
    pub topology: Topology,
    pub pci: ScanSummary,
    pub ahci: Ahci<'p, R, D>,
}

impl<'a, 'p, R: HbaIo, D: DmaMemory> BootDevices<'a, 'p, R, D> {
    /// Runs ACPI, MP, PCIe and AHCI discovery in that order.
    ///
    /// # Panics
    /// On any fatal discovery failure (see [`crate::init`]).
    ///
    /// # Safety
    /// As for [`acpi_init`]: `map` must expose every firmware table for `'a`.
    #[must_use]
    pub unsafe fn discover<M: MmioMapper + ?Sized>(
        map: &impl PhysMapRo,
        mapper: &M,
        hba: R,
        dma: D,
        pages: &'p mut PortPages,
        config: &DiscoveryConfig,
    ) -> Self {
        let acpi = unsafe { acpi_init(map) };
        let topology = mp_init(&acpi);
        let pci = pcie_init(&acpi, mapper);
        let ahci = ahci_init(hba, dma, pages, config);
        Self {
            acpi,
            topology,
            pci,
            ahci,
        }
    }

    #[must_use]
    pub fn table(&self, signature: impl Into<Signature>) -> Option<TableRef<'a>> {
        crate::acpi_get_table(&self.acpi, signature)
    }

    #[must_use]
    pub fn disk(&self) -> Option<&DiskInfo> {
        self.ahci.disk()
    }

    /// # Errors
    /// See [`ahci_read`].
    pub fn read(&mut self, sector: u64, buf: &mut [u8], count: u16) -> Result<(), AhciError> {
        ahci_read(&mut self.ahci, sector, buf, count)
    }

    /// # Errors
    /// See [`ahci_write`].
    pub fn write(&mut self, sector: u64, buf: &[u8], count: u16) -> Result<(), AhciError> {
        ahci_write(&mut self.ahci, sector, buf, count)
    }

    /// # Errors
    /// See [`Ahci::flush`].
    pub fn flush(&mut self) -> Result<(), AhciError> {
        self.ahci.flush()
    }
}
