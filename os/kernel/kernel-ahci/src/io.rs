//! Register and DMA access seams.

use crate::regs::{
    AtaStatus, PX_CI, PX_CMD, PX_SSTS, PX_TFD, PortCmd, SataStatus, TaskFileData, port_offset,
};
use core::ptr::NonNull;
use kernel_info::addr::PhysicalAddress;

/// 32-bit access to the controller's register window.
///
/// Offsets are relative to the start of the window (ABAR).
pub trait HbaIo {
    /// Virtual address the window is reachable at.
    fn base(&self) -> usize;

    fn read32(&self, offset: usize) -> u32;

    fn write32(&self, offset: usize, value: u32);
}

/// The controller's register window, accessed with volatile loads and stores.
pub struct MmioHba {
    base: NonNull<u32>,
}

impl MmioHba {
    /// # Safety
    /// `base` must point at the controller's 0x1100-byte register window,
    /// mapped uncached, for as long as the value is alive.
    #[must_use]
    pub const unsafe fn new(base: NonNull<u8>) -> Self {
        Self { base: base.cast() }
    }
}

impl HbaIo for MmioHba {
    fn base(&self) -> usize {
        self.base.as_ptr() as usize
    }

    fn read32(&self, offset: usize) -> u32 {
        debug_assert_eq!(offset % 4, 0);
        // SAFETY: the window is mapped for the lifetime of `self` (see `new`).
        unsafe { self.base.byte_add(offset).read_volatile() }
    }

    fn write32(&self, offset: usize, value: u32) {
        debug_assert_eq!(offset % 4, 0);
        // SAFETY: the window is mapped for the lifetime of `self` (see `new`).
        unsafe { self.base.byte_add(offset).write_volatile(value) }
    }
}

/// Translation from kernel virtual addresses to bus addresses the HBA can
/// reach.
///
/// # Safety
/// `virt_to_phys` must return the address the controller will actually hit
/// for `va`; a wrong answer makes the device DMA into unrelated memory.
pub unsafe trait DmaMemory {
    /// Whether `va` is currently backed by a mapping.
    fn is_mapped(&self, va: usize) -> bool;

    fn virt_to_phys(&self, va: usize) -> Option<PhysicalAddress>;
}

/// The register block of one port.
pub(crate) struct PortRegs<'h, R: ?Sized> {
    hba: &'h R,
    base: usize,
}

impl<'h, R: HbaIo + ?Sized> PortRegs<'h, R> {
    pub(crate) fn new(hba: &'h R, port: u8) -> Self {
        Self {
            hba,
            base: port_offset(usize::from(port)),
        }
    }

    pub(crate) fn read(&self, reg: usize) -> u32 {
        self.hba.read32(self.base + reg)
    }

    pub(crate) fn write(&self, reg: usize, value: u32) {
        self.hba.write32(self.base + reg, value);
    }

    pub(crate) fn write_address(&self, low: usize, high: usize, addr: PhysicalAddress) {
        self.write(low, addr.low_u32());
        self.write(high, addr.high_u32());
    }

    pub(crate) fn cmd(&self) -> PortCmd {
        PortCmd::from_bits(self.read(PX_CMD))
    }

    pub(crate) fn set_cmd(&self, cmd: PortCmd) {
        self.write(PX_CMD, cmd.into_bits());
    }

    pub(crate) fn tfd(&self) -> TaskFileData {
        TaskFileData::from_bits(self.read(PX_TFD))
    }

    pub(crate) fn status(&self) -> AtaStatus {
        self.tfd().status()
    }

    pub(crate) fn ssts(&self) -> SataStatus {
        SataStatus::from_bits(self.read(PX_SSTS))
    }

    pub(crate) fn ci(&self) -> u32 {
        self.read(PX_CI)
    }
}
