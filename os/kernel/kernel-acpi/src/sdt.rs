//! # System Description Table Header

use crate::{AcpiError, PhysMapRo, Signature, ascii, sum};
use core::fmt;
use kernel_info::addr::PhysicalAddress;

/// Length of the header shared by every system description table.
pub const SDT_HEADER_LEN: usize = 36;

/// Common header of every ACPI system description table.
#[derive(Debug, Copy, Clone)]
#[repr(C, packed)]
pub struct SdtHeader {
    pub signature: Signature,
    /// Length of the whole table, header included.
    pub length: u32,
    pub revision: u8,
    /// Makes the byte sum over `length` bytes zero.
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: [u8; 4],
    pub creator_revision: u32,
}

const _: () = assert!(size_of::<SdtHeader>() == SDT_HEADER_LEN);

impl SdtHeader {
    /// Copy the header out of the start of `bytes`.
    #[must_use]
    pub fn read(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < SDT_HEADER_LEN {
            return None;
        }
        // SAFETY: length checked above; the type is packed, so any alignment works.
        Some(unsafe { bytes.as_ptr().cast::<Self>().read_unaligned() })
    }
}

/// A mapped ACPI table: its physical address plus exactly `length` bytes.
#[derive(Copy, Clone)]
pub struct TableRef<'a> {
    phys: PhysicalAddress,
    bytes: &'a [u8],
}

impl<'a> TableRef<'a> {
    /// Wrap an already-mapped table.
    ///
    /// The slice is truncated to the length the header declares.
    ///
    /// # Errors
    /// [`AcpiError::TableTooShort`] if the slice cannot hold the header, or
    /// the declared length is shorter than the header or longer than the slice.
    pub fn from_bytes(phys: PhysicalAddress, bytes: &'a [u8]) -> Result<Self, AcpiError> {
        let too_short = |length| AcpiError::TableTooShort { phys, length };
        let header = SdtHeader::read(bytes).ok_or_else(|| too_short(0))?;
        let length = header.length;
        let len = length as usize;
        if len < SDT_HEADER_LEN || len > bytes.len() {
            return Err(too_short(length));
        }
        Ok(Self {
            phys,
            bytes: &bytes[..len],
        })
    }

    /// Map the table at `phys`: first its header, then its declared length.
    ///
    /// # Safety
    /// `phys` must point at memory the mapper can expose for the length the
    /// header declares.
    ///
    /// # Errors
    /// [`AcpiError::TableTooShort`] if the declared length is below the header size.
    pub unsafe fn map(map: &impl PhysMapRo, phys: PhysicalAddress) -> Result<Self, AcpiError> {
        let head = unsafe { map.map_ro(phys, SDT_HEADER_LEN) };
        let length = SdtHeader::read(head).map_or(0, |h| h.length);
        if (length as usize) < SDT_HEADER_LEN {
            return Err(AcpiError::TableTooShort { phys, length });
        }
        let bytes = unsafe { map.map_ro(phys, length as usize) };
        Self::from_bytes(phys, bytes)
    }

    #[must_use]
    pub const fn phys(&self) -> PhysicalAddress {
        self.phys
    }

    #[must_use]
    pub fn header(&self) -> SdtHeader {
        // SAFETY: construction guarantees at least SDT_HEADER_LEN bytes.
        unsafe { self.bytes.as_ptr().cast::<SdtHeader>().read_unaligned() }
    }

    #[must_use]
    pub fn signature(&self) -> Signature {
        self.header().signature
    }

    /// The whole table, header included.
    #[must_use]
    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Table contents following the common header.
    #[must_use]
    pub fn body(&self) -> &'a [u8] {
        &self.bytes[SDT_HEADER_LEN..]
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn checksum_ok(&self) -> bool {
        sum(self.bytes) == 0
    }
}

impl fmt::Debug for TableRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableRef")
            .field("signature", &self.signature())
            .field("phys", &self.phys)
            .field("len", &self.len())
            .finish()
    }
}

/// `APIC 0x7FFE1A2B 000078 v01 BOCHS BXPCAPIC 01 BXPC 01`
impl fmt::Display for TableRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.header();
        let (length, oem_revision, creator_revision) =
            (h.length, h.oem_revision, h.creator_revision);
        write!(
            f,
            "{} {} {:06x} v{:02} {} {} {:02} {} {:02}",
            h.signature,
            self.phys,
            length,
            h.revision,
            ascii(&h.oem_id),
            ascii(&h.oem_table_id),
            oem_revision,
            ascii(&h.creator_id),
            creator_revision,
        )
    }
}
