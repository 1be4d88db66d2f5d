//! # Scoped Configuration Space Access

use core::ptr::NonNull;
use kernel_acpi::mcfg::ECAM_FUNCTION_SIZE;
use kernel_info::addr::PhysicalAddress;

/// Maps memory-mapped I/O regions on demand.
///
/// # Safety
/// A pointer returned from [`map`](MmioMapper::map) must stay valid for
/// volatile accesses to `len` bytes until it is passed to
/// [`unmap`](MmioMapper::unmap).
pub unsafe trait MmioMapper {
    /// Map `len` bytes at `phys` uncached, or `None` if no address space is left.
    fn map(&self, phys: PhysicalAddress, len: usize) -> Option<NonNull<u8>>;

    /// # Safety
    /// `va` and `len` must come from a prior [`map`](MmioMapper::map) call
    /// that has not been unmapped yet.
    unsafe fn unmap(&self, va: NonNull<u8>, len: usize);
}

/// One function's configuration space, mapped for the lifetime of the guard.
pub struct ConfigWindow<'m, M: MmioMapper + ?Sized> {
    mapper: &'m M,
    va: NonNull<u8>,
}

impl<'m, M: MmioMapper + ?Sized> ConfigWindow<'m, M> {
    #[must_use]
    pub fn open(mapper: &'m M, phys: PhysicalAddress) -> Option<Self> {
        let va = mapper.map(phys, ECAM_FUNCTION_SIZE)?;
        Some(Self { mapper, va })
    }

    /// Read the aligned dword containing `offset`.
    #[must_use]
    pub fn read32(&self, offset: u16) -> u32 {
        let offset = usize::from(offset) & (ECAM_FUNCTION_SIZE - 1) & !0b11;
        // SAFETY: offset is aligned and inside the mapped 4 KiB window.
        unsafe { self.va.as_ptr().add(offset).cast::<u32>().read_volatile() }
    }
}

impl<M: MmioMapper + ?Sized> Drop for ConfigWindow<'_, M> {
    fn drop(&mut self) {
        // SAFETY: va was returned by map() with the same length.
        unsafe { self.mapper.unmap(self.va, ECAM_FUNCTION_SIZE) }
    }
}
