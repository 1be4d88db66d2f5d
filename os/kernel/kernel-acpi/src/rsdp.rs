//! # RSDP/XSDP (Root/Extended System Description Pointer)

use crate::{PhysMapRo, Signature, ascii, sum};
use core::fmt;
use kernel_info::addr::PhysicalAddress;
use kernel_info::platform::{
    BIOS_ROM_BASE, BIOS_ROM_LEN, EBDA_SEARCH_LEN, EBDA_SEGMENT_PTR, RSDP_ALIGN,
};
use log::debug;

pub const RSDP_SIGNATURE: [u8; 8] = *b"RSD PTR ";

/// ACPI 1.0 Root System Description Pointer (RSDP)
#[derive(Clone, Copy)]
#[repr(C, packed)]
struct Rsdp {
    signature: [u8; 8], // "RSD PTR "
    checksum: u8,       // sum of first 20 bytes == 0
    oem_id: [u8; 6],
    revision: u8, // 0 for ACPI 1.0
    rsdt_addr: u32,
}

/// ACPI 2.0 Extended System Description Pointer (XSDP)
#[derive(Clone, Copy)]
#[repr(C, packed)]
struct Xsdp {
    v1: Rsdp,
    length: u32,
    xsdt_addr: u64,
    ext_checksum: u8, // checksum of entire table
    reserved: [u8; 3],
}

const RSDP_LEN: usize = size_of::<Rsdp>();
const XSDP_LEN: usize = size_of::<Xsdp>();

const _: () = {
    assert!(RSDP_LEN == 20);
    assert!(XSDP_LEN == 36);
};

/// Which root table a validated RSDP points to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RootTable {
    /// RSDT: 32-bit entry addresses.
    Rsdt(PhysicalAddress),
    /// XSDT: 64-bit entry addresses.
    Xsdt(PhysicalAddress),
}

impl RootTable {
    #[must_use]
    pub const fn address(self) -> PhysicalAddress {
        match self {
            Self::Rsdt(a) | Self::Xsdt(a) => a,
        }
    }

    #[must_use]
    pub const fn signature(self) -> Signature {
        match self {
            Self::Rsdt(_) => Signature::RSDT,
            Self::Xsdt(_) => Signature::XSDT,
        }
    }

    /// Width in bytes of one entry in the table's address array.
    #[must_use]
    pub const fn entry_size(self) -> usize {
        match self {
            Self::Rsdt(_) => 4,
            Self::Xsdt(_) => 8,
        }
    }
}

/// A validated root pointer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RsdpTable {
    pub phys: PhysicalAddress,
    pub revision: u8,
    pub oem_id: [u8; 6],
    pub rsdt_addr: PhysicalAddress,
    /// Present for revision 2 and later.
    pub xsdt_addr: Option<PhysicalAddress>,
    /// Bytes covered by the checksums (20 before revision 2).
    pub length: u32,
}

impl RsdpTable {
    /// Validate the RSDP/XSDP at the physical address.
    ///
    /// Checks the signature and the 20-byte checksum; for revision 2 and
    /// later also the extended checksum over the declared length.
    ///
    /// # Safety
    /// The mapper must be able to expose the candidate and, for revision 2
    /// and later, the length it declares.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub unsafe fn parse(map: &impl PhysMapRo, phys: PhysicalAddress) -> Option<Self> {
        if phys.is_null() {
            return None;
        }

        let v1 = unsafe { map.map_ro(phys, RSDP_LEN) };
        if v1.len() < RSDP_LEN || v1[..8] != RSDP_SIGNATURE || sum(&v1[..RSDP_LEN]) != 0 {
            return None;
        }

        // SAFETY: length checked above; packed type has alignment 1.
        let rsdp = unsafe { v1.as_ptr().cast::<Rsdp>().read_unaligned() };
        let rsdt_addr = PhysicalAddress::from(rsdp.rsdt_addr);

        if rsdp.revision < 2 {
            return Some(Self {
                phys,
                revision: rsdp.revision,
                oem_id: rsdp.oem_id,
                rsdt_addr,
                xsdt_addr: None,
                length: RSDP_LEN as u32,
            });
        }

        // Need full v2 to read length + xsdt
        let v2 = unsafe { map.map_ro(phys, XSDP_LEN) };
        if v2.len() < XSDP_LEN {
            return None;
        }
        // SAFETY: length checked above.
        let xsdp = unsafe { v2.as_ptr().cast::<Xsdp>().read_unaligned() };
        let length = xsdp.length;
        if (length as usize) < XSDP_LEN {
            return None;
        }
        let full = unsafe { map.map_ro(phys, length as usize) };
        if full.len() < length as usize || sum(full) != 0 {
            return None;
        }

        Some(Self {
            phys,
            revision: rsdp.revision,
            oem_id: rsdp.oem_id,
            rsdt_addr,
            xsdt_addr: Some(PhysicalAddress::new(xsdp.xsdt_addr)),
            length,
        })
    }

    /// The root table this pointer selects.
    #[must_use]
    pub const fn root(&self) -> RootTable {
        match self.xsdt_addr {
            Some(x) => RootTable::Xsdt(x),
            None => RootTable::Rsdt(self.rsdt_addr),
        }
    }
}

/// `RSDP 0x000F5A60 000024 v02 BOCHS`
impl fmt::Display for RsdpTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RSDP {} {:06x} v{:02} {}",
            self.phys,
            self.length,
            self.revision,
            ascii(&self.oem_id)
        )
    }
}

/// Look for the RSDP in the `len` bytes at physical address `base`.
///
/// # Safety
/// The mapper must be able to expose `base..base + len`.
#[must_use]
pub unsafe fn scan_region(
    map: &impl PhysMapRo,
    base: PhysicalAddress,
    len: usize,
) -> Option<RsdpTable> {
    let region = unsafe { map.map_ro(base, len) };
    region
        .chunks(RSDP_ALIGN)
        .enumerate()
        .filter(|(_, chunk)| chunk.starts_with(&RSDP_SIGNATURE))
        .find_map(|(i, _)| {
            let candidate = base.checked_add((i * RSDP_ALIGN) as u64)?;
            unsafe { RsdpTable::parse(map, candidate) }
        })
}

/// Search for the RSDP in the first KiB of the EBDA, then in the BIOS ROM
/// between `0xE0000` and `0xFFFFF`.
///
/// # Safety
/// The mapper must expose low physical memory (below 1 MiB).
#[must_use]
pub unsafe fn find_rsdp(map: &impl PhysMapRo) -> Option<RsdpTable> {
    // The 16-bit segment of the EBDA is in the two bytes at 0x40:0x0E.
    let ptr = unsafe { map.map_ro(EBDA_SEGMENT_PTR, 2) };
    let segment = match ptr {
        [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]),
        _ => 0,
    };
    let ebda = PhysicalAddress::new(u64::from(segment) << 4);

    if ebda.is_null() {
        debug!("ACPI: no EBDA, searching BIOS ROM only");
    } else if let Some(rsdp) = unsafe { scan_region(map, ebda, EBDA_SEARCH_LEN) } {
        return Some(rsdp);
    }

    unsafe { scan_region(map, BIOS_ROM_BASE, BIOS_ROM_LEN) }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat "physical memory" starting at address 0.
    struct TestPhys {
        mem: Vec<u8>,
    }

    impl PhysMapRo for TestPhys {
        unsafe fn map_ro<'a>(&self, paddr: PhysicalAddress, len: usize) -> &'a [u8] {
            let start = usize::try_from(paddr.as_u64()).unwrap();
            let end = (start + len).min(self.mem.len());
            // SAFETY: the buffer outlives every test using the mapper.
            unsafe { core::slice::from_raw_parts(self.mem.as_ptr().add(start), end - start) }
        }
    }

    fn v1(rsdt: u32) -> [u8; 20] {
        let mut b = [0u8; 20];
        b[..8].copy_from_slice(&RSDP_SIGNATURE);
        b[9..15].copy_from_slice(b"BOCHS ");
        b[16..20].copy_from_slice(&rsdt.to_le_bytes());
        b[8] = 0u8.wrapping_sub(sum(&b));
        b
    }

    fn v2(xsdt: u64) -> [u8; 36] {
        let mut b = [0u8; 36];
        b[..20].copy_from_slice(&v1(0x1234));
        b[15] = 2;
        b[8] = 0;
        b[8] = 0u8.wrapping_sub(sum(&b[..20]));
        b[20..24].copy_from_slice(&36u32.to_le_bytes());
        b[24..32].copy_from_slice(&xsdt.to_le_bytes());
        b[32] = 0u8.wrapping_sub(sum(&b));
        b
    }

    fn memory() -> TestPhys {
        TestPhys {
            mem: vec![0; 0x10_0000],
        }
    }

    #[test]
    fn finds_v1_in_bios_rom() {
        let mut phys = memory();
        phys.mem[0xF_5A60..0xF_5A60 + 20].copy_from_slice(&v1(0x7FE_0000));

        let rsdp = unsafe { find_rsdp(&phys) }.unwrap();
        assert_eq!(rsdp.phys, PhysicalAddress::new(0xF_5A60));
        assert_eq!(rsdp.revision, 0);
        assert_eq!(rsdp.root(), RootTable::Rsdt(PhysicalAddress::new(0x7FE_0000)));
        assert_eq!(rsdp.root().entry_size(), 4);
        assert_eq!(format!("{rsdp}"), "RSDP 0x000F5A60 000014 v00 BOCHS");
    }

    #[test]
    fn prefers_ebda() {
        let mut phys = memory();
        phys.mem[0x40E..0x410].copy_from_slice(&0x9FC0u16.to_le_bytes());
        phys.mem[0x9_FC10..0x9_FC10 + 36].copy_from_slice(&v2(0x7FE_1000));
        phys.mem[0xE_0000..0xE_0000 + 20].copy_from_slice(&v1(0x1));

        let rsdp = unsafe { find_rsdp(&phys) }.unwrap();
        assert_eq!(rsdp.phys, PhysicalAddress::new(0x9_FC10));
        assert_eq!(rsdp.root(), RootTable::Xsdt(PhysicalAddress::new(0x7FE_1000)));
        assert_eq!(rsdp.length, 36);
    }

    #[test]
    fn skips_candidates_with_bad_checksum() {
        let mut phys = memory();
        let mut bad = v1(0xAAAA);
        bad[19] ^= 1;
        phys.mem[0xE_0000..0xE_0014].copy_from_slice(&bad);
        phys.mem[0xE_0100..0xE_0114].copy_from_slice(&v1(0xBBBB));

        let rsdp = unsafe { find_rsdp(&phys) }.unwrap();
        assert_eq!(rsdp.rsdt_addr, PhysicalAddress::new(0xBBBB));
    }

    #[test]
    fn v2_needs_extended_checksum() {
        let mut phys = memory();
        let mut b = v2(0x5000);
        b[33] = 0x55;
        phys.mem[0xE_0040..0xE_0040 + 36].copy_from_slice(&b);
        assert!(unsafe { find_rsdp(&phys) }.is_none());
    }

    #[test]
    fn ignores_unaligned_signature() {
        let mut phys = memory();
        phys.mem[0xE_0008..0xE_0008 + 20].copy_from_slice(&v1(0x1000));
        assert!(unsafe { find_rsdp(&phys) }.is_none());
    }

    #[test]
    fn nothing_found() {
        assert!(unsafe { find_rsdp(&memory()) }.is_none());
    }
}
