//! # Firmware Memory Regions
//!
//! Fixed physical locations that legacy BIOS and most UEFI CSM firmware
//! populate before handing over control.

use crate::addr::PhysicalAddress;

/// Real-mode word holding the EBDA segment (`segment << 4` is its base).
pub const EBDA_SEGMENT_PTR: PhysicalAddress = PhysicalAddress::new(0x40E);

/// Number of EBDA bytes searched for the RSDP signature.
pub const EBDA_SEARCH_LEN: usize = 1024;

/// Start of the read-only BIOS area searched for the RSDP signature.
pub const BIOS_ROM_BASE: PhysicalAddress = PhysicalAddress::new(0xE_0000);

/// Length of the BIOS area search (`0xE0000..0x100000`).
pub const BIOS_ROM_LEN: usize = 0x2_0000;

/// The RSDP is always placed on a 16-byte boundary.
pub const RSDP_ALIGN: usize = 16;

/// Virtual address at which the boot code pre-maps the AHCI register window.
pub const AHCI_WINDOW_BASE: usize = 0xFFFF_FFFF_FEB0_0000;

const _: () = {
    assert!(BIOS_ROM_BASE.as_u64() + BIOS_ROM_LEN as u64 == 0x10_0000);
    assert!(EBDA_SEARCH_LEN.is_multiple_of(RSDP_ALIGN));
    assert!(BIOS_ROM_LEN.is_multiple_of(RSDP_ALIGN));
};
