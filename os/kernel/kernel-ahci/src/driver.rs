//! The controller context.

use crate::command::{CommandHeader, PortPage, PortPages, PrdEntry};
use crate::error::AhciError;
use crate::fis::{FisRegH2d, LBA48_SECTORS};
use crate::identify::{AtaString, IdentifyDevice};
use crate::io::{DmaMemory, HbaIo};
use crate::port::{Port, PortState, Transfer};
use crate::regs::{Ghc, HBA_GHC, HBA_PI, HBA_VS};
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;
use kernel_info::limits::{AHCI_MAX_PORTS, BLOCK_SECTORS, SECTOR_SIZE};
use kernel_info::poll::PollBound;
use log::{debug, info, warn};

/// The disk the driver adopted during [`Ahci::probe`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DiskInfo {
    pub port: u8,
    pub sectors: u64,
    pub model: AtaString<40>,
}

impl DiskInfo {
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.sectors.saturating_mul(SECTOR_SIZE as u64)
    }
}

impl fmt::Display for DiskInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AHCI.{}: {} bytes", self.port, self.size_bytes())
    }
}

/// An AHCI controller with at most one adopted disk.
///
/// `R` reaches the register window, `D` translates buffers to bus addresses
/// and `pages` holds the per-port command lists for as long as the driver
/// lives.
pub struct Ahci<'p, R, D> {
    hba: R,
    dma: D,
    pages: NonNull<PortPage>,
    _pages: PhantomData<&'p mut PortPages>,
    poll: PollBound,
    states: [PortState; AHCI_MAX_PORTS],
    disk: Option<DiskInfo>,
}

impl<'p, R: HbaIo, D: DmaMemory> Ahci<'p, R, D> {
    /// Takes over the controller and switches it to AHCI mode.
    ///
    /// # Errors
    /// [`AhciError::NotMapped`] if the register window is not mapped.
    pub fn new(
        hba: R,
        dma: D,
        pages: &'p mut PortPages,
        poll: PollBound,
    ) -> Result<Self, AhciError> {
        let base = hba.base();
        if !dma.is_mapped(base) {
            return Err(AhciError::NotMapped { base });
        }

        let ghc = Ghc::from_bits(hba.read32(HBA_GHC)).with_ae(true);
        hba.write32(HBA_GHC, ghc.into_bits());
        debug!(
            "AHCI: version {:#010x}, ports implemented {:#010x}",
            hba.read32(HBA_VS),
            hba.read32(HBA_PI)
        );

        Ok(Self {
            hba,
            dma,
            pages: pages.first_page(),
            _pages: PhantomData,
            poll,
            states: [PortState::Idle; AHCI_MAX_PORTS],
            disk: None,
        })
    }

    /// [`new`](Self::new) followed by [`probe`](Self::probe).
    ///
    /// # Errors
    /// See [`new`](Self::new) and [`probe`](Self::probe).
    pub fn init(
        hba: R,
        dma: D,
        pages: &'p mut PortPages,
        poll: PollBound,
    ) -> Result<Self, AhciError> {
        let mut ahci = Self::new(hba, dma, pages, poll)?;
        ahci.probe()?;
        Ok(ahci)
    }

    /// Adopts the first implemented port that resets and answers IDENTIFY.
    ///
    /// # Errors
    /// [`AhciError::NoDisk`] if no port qualifies.
    pub fn probe(&mut self) -> Result<DiskInfo, AhciError> {
        let pi = self.implemented_ports();
        for port in (0u8..).take(AHCI_MAX_PORTS).filter(|p| pi & (1 << p) != 0) {
            match self.reset_port(port) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!("AHCI.{port}: reset failed: {e}");
                    continue;
                }
            }

            match self.identify(port) {
                Ok(id) => {
                    let disk = DiskInfo {
                        port,
                        sectors: id.sectors(),
                        model: id.model(),
                    };
                    info!("{disk}");
                    debug!("AHCI.{port}: {id:?}");
                    self.disk = Some(disk);
                    return Ok(disk);
                }
                Err(e) => warn!("AHCI.{port}: IDENTIFY failed: {e}"),
            }
        }
        Err(AhciError::NoDisk)
    }

    /// Bitmap of ports the controller implements.
    #[must_use]
    pub fn implemented_ports(&self) -> u32 {
        self.hba.read32(HBA_PI)
    }

    /// Stops and restarts `port` on its DMA page.
    ///
    /// Returns `Ok(false)` if nothing is attached. Safe to call repeatedly.
    ///
    /// # Errors
    /// [`AhciError::NoSuchPort`] for a port the controller does not implement,
    /// [`AhciError::Timeout`] if the engines never stop under a bounded poll.
    pub fn reset_port(&mut self, port: u8) -> Result<bool, AhciError> {
        if usize::from(port) >= AHCI_MAX_PORTS || self.implemented_ports() & (1 << port) == 0 {
            return Err(AhciError::NoSuchPort { port });
        }
        let page = self.page(port)?;
        Port::new(&self.hba, port, page, self.poll)
            .reset(&self.dma, &mut self.states[usize::from(port)])
    }

    /// Runs IDENTIFY DEVICE on a running port.
    ///
    /// # Errors
    /// Any failure of the command itself.
    pub fn identify(&mut self, port: u8) -> Result<IdentifyDevice, AhciError> {
        let mut id = IdentifyDevice::ZERO;
        let va = (&raw mut id).expose_provenance();
        self.issue(
            port,
            &FisRegH2d::identify(),
            Transfer::In {
                va,
                len: SECTOR_SIZE,
            },
        )?;
        // SAFETY: the transfer has completed; `id` is a live local.
        Ok(unsafe { (&raw const id).read_volatile() })
    }

    /// Reads `count` sectors starting at `sector` into `buf`.
    ///
    /// # Panics
    /// If `count` exceeds one block ([`BLOCK_SECTORS`]).
    ///
    /// # Errors
    /// [`AhciError::NoDisk`] before a disk was adopted,
    /// [`AhciError::BufferTooSmall`], [`AhciError::OutOfRange`] past the end of
    /// the disk, or a command failure.
    pub fn read(&mut self, sector: u64, buf: &mut [u8], count: u16) -> Result<(), AhciError> {
        let len = transfer_len(buf.len(), count)?;
        if len == 0 {
            return Ok(());
        }
        self.check_range(sector, count)?;
        let va = buf.as_mut_ptr().expose_provenance();
        self.issue_disk(&FisRegH2d::read_dma_ext(sector, count), Transfer::In { va, len })?;
        Ok(())
    }

    /// Writes `count` sectors from `buf` starting at `sector`.
    ///
    /// # Panics
    /// If `count` exceeds one block ([`BLOCK_SECTORS`]).
    ///
    /// # Errors
    /// As for [`read`](Self::read).
    pub fn write(&mut self, sector: u64, buf: &[u8], count: u16) -> Result<(), AhciError> {
        let len = transfer_len(buf.len(), count)?;
        if len == 0 {
            return Ok(());
        }
        self.check_range(sector, count)?;
        let va = buf.as_ptr().expose_provenance();
        self.issue_disk(
            &FisRegH2d::write_dma_ext(sector, count),
            Transfer::Out { va, len },
        )?;
        Ok(())
    }

    /// Flushes the adopted disk's write cache.
    ///
    /// # Errors
    /// [`AhciError::NoDisk`] or a command failure.
    pub fn flush(&mut self) -> Result<(), AhciError> {
        self.issue_disk(&FisRegH2d::flush_cache(), Transfer::None)?;
        Ok(())
    }

    #[must_use]
    pub const fn disk(&self) -> Option<&DiskInfo> {
        self.disk.as_ref()
    }

    #[must_use]
    pub fn port_state(&self, port: u8) -> PortState {
        self.states
            .get(usize::from(port))
            .copied()
            .unwrap_or_default()
    }

    /// Slot 0's command header as last written by the driver or the HBA.
    #[must_use]
    pub fn command_header(&self, port: u8) -> Option<CommandHeader> {
        let page = self.page(port).ok()?;
        // SAFETY: the page is owned by the driver; a torn read only affects
        // `prdbc`, which the HBA updates atomically.
        Some(unsafe { (&raw const (*page.as_ptr()).cmdh[0]).read_volatile() })
    }

    /// Slot 0's only PRD entry.
    #[must_use]
    pub fn prd(&self, port: u8) -> Option<PrdEntry> {
        let page = self.page(port).ok()?;
        // SAFETY: see `command_header`.
        Some(unsafe { (&raw const (*page.as_ptr()).cmdt.prdt[0]).read_volatile() })
    }

    #[must_use]
    pub const fn hba(&self) -> &R {
        &self.hba
    }

    fn check_range(&self, sector: u64, count: u16) -> Result<(), AhciError> {
        let disk = self.disk.ok_or(AhciError::NoDisk)?;
        check_range(sector, count, disk.sectors)
    }

    fn issue_disk(&mut self, fis: &FisRegH2d, transfer: Transfer) -> Result<u32, AhciError> {
        let port = self.disk.ok_or(AhciError::NoDisk)?.port;
        self.issue(port, fis, transfer)
    }

    fn issue(&mut self, port: u8, fis: &FisRegH2d, transfer: Transfer) -> Result<u32, AhciError> {
        let page = self.page(port)?;
        Port::new(&self.hba, port, page, self.poll).issue(
            &self.dma,
            &mut self.states[usize::from(port)],
            fis,
            transfer,
        )
    }

    fn page(&self, port: u8) -> Result<NonNull<PortPage>, AhciError> {
        if usize::from(port) >= AHCI_MAX_PORTS {
            return Err(AhciError::NoSuchPort { port });
        }
        // SAFETY: `pages` is the first of `AHCI_MAX_PORTS` contiguous pages.
        Ok(unsafe { self.pages.add(usize::from(port)) })
    }
}

fn transfer_len(buf_len: usize, count: u16) -> Result<usize, AhciError> {
    assert!(
        usize::from(count) <= BLOCK_SECTORS,
        "AHCI: {count} sectors exceed one block"
    );
    let len = usize::from(count) * SECTOR_SIZE;
    if buf_len < len {
        return Err(AhciError::BufferTooSmall {
            len: buf_len,
            sectors: count,
        });
    }
    Ok(len)
}

/// `sector..sector + count` must lie on a disk of `sectors` sectors and be
/// addressable with 48 bits.
fn check_range(sector: u64, count: u16, sectors: u64) -> Result<(), AhciError> {
    let limit = sectors.min(LBA48_SECTORS);
    match sector.checked_add(u64::from(count)) {
        Some(end) if end <= limit => Ok(()),
        _ => Err(AhciError::OutOfRange {
            sector,
            count,
            limit,
        }),
    }
}
