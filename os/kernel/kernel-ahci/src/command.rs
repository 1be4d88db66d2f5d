//! # Command List Structures
//!
//! Everything the HBA reads or writes over DMA for one port lives in a single
//! 4 KiB [`PortPage`]:
//!
//! | Offset  | Contents                          |
//! |---------|-----------------------------------|
//! | `0x000` | received-FIS area (256 bytes)     |
//! | `0x400` | command list, 32 headers × 32 B   |
//! | `0x800` | command table for slot 0          |
//!
//! Only slot 0 is ever used, with a single PRDT entry.

use bitfield_struct::bitfield;
use core::mem::offset_of;
use core::ptr::NonNull;
use kernel_info::addr::PhysicalAddress;
use kernel_info::limits::{AHCI_COMMAND_SLOTS, AHCI_MAX_PORTS, BLOCK_SIZE, PRD_MAX_BYTES};

/// Length of a register host-to-device FIS in dwords.
pub const CMD_FIS_DWORDS: u8 = 5;

/// First dword of a command header.
#[bitfield(u16)]
#[derive(Eq, PartialEq)]
pub struct CommandFlags {
    /// Command FIS Length in dwords (2..=16).
    #[bits(5)]
    pub cfl: u8,
    /// ATAPI.
    pub atapi: bool,
    /// Write: the transfer goes from memory to the device.
    pub write: bool,
    /// Prefetchable.
    pub prefetchable: bool,
    /// Reset.
    pub reset: bool,
    /// BIST.
    pub bist: bool,
    /// Clear Busy upon R_OK.
    pub clear_busy: bool,
    #[bits(default = false)]
    _reserved_11: bool,
    /// Port Multiplier Port.
    #[bits(4)]
    pub pmp: u8,
}

/// One entry of the command list.
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CommandHeader {
    pub flags: CommandFlags,
    /// Physical Region Descriptor Table Length.
    pub prdtl: u16,
    /// PRD Byte Count transferred, updated by the HBA.
    pub prdbc: u32,
    pub ctba: u32,
    pub ctbau: u32,
    _reserved: [u32; 4],
}

impl CommandHeader {
    pub const ZERO: Self = Self {
        flags: CommandFlags::new(),
        prdtl: 0,
        prdbc: 0,
        ctba: 0,
        ctbau: 0,
        _reserved: [0; 4],
    };

    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn table_address(&self) -> PhysicalAddress {
        PhysicalAddress::new((self.ctbau as u64) << 32 | self.ctba as u64)
    }

    pub const fn set_table_address(&mut self, addr: PhysicalAddress) {
        self.ctba = addr.low_u32();
        self.ctbau = addr.high_u32();
    }
}

/// Fourth dword of a PRD entry.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct PrdByteCount {
    /// Data Byte Count, stored as length minus one.
    #[bits(22)]
    pub dbc: u32,
    #[bits(9, default = 0)]
    _reserved_22_30: u16,
    /// Interrupt on Completion.
    pub interrupt: bool,
}

/// Physical Region Descriptor.
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PrdEntry {
    pub dba: u32,
    pub dbau: u32,
    _reserved: u32,
    pub count: PrdByteCount,
}

impl PrdEntry {
    pub const ZERO: Self = Self {
        dba: 0,
        dbau: 0,
        _reserved: 0,
        count: PrdByteCount::new(),
    };

    /// Describes `len` bytes at `addr`. `len` must be in `1..=4 MiB`.
    #[must_use]
    pub const fn new(addr: PhysicalAddress, len: usize) -> Self {
        debug_assert!(len > 0 && len <= PRD_MAX_BYTES);
        #[allow(clippy::cast_possible_truncation)]
        let dbc = (len - 1) as u32;
        Self {
            dba: addr.low_u32(),
            dbau: addr.high_u32(),
            _reserved: 0,
            count: PrdByteCount::new().with_dbc(dbc),
        }
    }

    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn address(&self) -> PhysicalAddress {
        PhysicalAddress::new((self.dbau as u64) << 32 | self.dba as u64)
    }

    /// Number of bytes described.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count.dbc() as usize + 1
    }
}

/// Command table for one slot, with room for a single PRD.
#[repr(C, align(128))]
#[derive(Debug, Copy, Clone)]
pub struct CommandTable {
    pub cfis: [u8; 0x40],
    pub acmd: [u8; 0x10],
    _reserved: [u8; 0x30],
    pub prdt: [PrdEntry; 1],
}

impl CommandTable {
    pub const ZERO: Self = Self {
        cfis: [0; 0x40],
        acmd: [0; 0x10],
        _reserved: [0; 0x30],
        prdt: [PrdEntry::ZERO],
    };
}

/// Received-FIS area the HBA copies incoming FISes into.
#[repr(C, align(256))]
#[derive(Debug, Copy, Clone)]
pub struct ReceivedFis {
    /// DMA Setup FIS.
    pub dsfis: [u8; 0x1C],
    _reserved0: [u8; 0x04],
    /// PIO Setup FIS.
    pub psfis: [u8; 0x14],
    _reserved1: [u8; 0x0C],
    /// D2H Register FIS.
    pub rfis: [u8; 0x14],
    _reserved2: [u8; 0x04],
    /// Set Device Bits FIS.
    pub sdbfis: [u8; 0x08],
    /// Unknown FIS.
    pub ufis: [u8; 0x40],
    _reserved3: [u8; 0x60],
}

impl ReceivedFis {
    pub const ZERO: Self = Self {
        dsfis: [0; 0x1C],
        _reserved0: [0; 0x04],
        psfis: [0; 0x14],
        _reserved1: [0; 0x0C],
        rfis: [0; 0x14],
        _reserved2: [0; 0x04],
        sdbfis: [0; 0x08],
        ufis: [0; 0x40],
        _reserved3: [0; 0x60],
    };
}

/// All DMA structures of one port.
#[repr(C, align(4096))]
pub struct PortPage {
    pub rfis: ReceivedFis,
    _pad: [u8; 0x400 - size_of::<ReceivedFis>()],
    pub cmdh: [CommandHeader; AHCI_COMMAND_SLOTS],
    pub cmdt: CommandTable,
}

impl PortPage {
    pub const ZERO: Self = Self {
        rfis: ReceivedFis::ZERO,
        _pad: [0; 0x400 - size_of::<ReceivedFis>()],
        cmdh: [CommandHeader::ZERO; AHCI_COMMAND_SLOTS],
        cmdt: CommandTable::ZERO,
    };
}

/// One [`PortPage`] per possible port, owned by the caller for the lifetime
/// of the driver.
#[repr(C)]
pub struct PortPages {
    pages: [PortPage; AHCI_MAX_PORTS],
}

impl PortPages {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pages: [PortPage::ZERO; AHCI_MAX_PORTS],
        }
    }

    /// Pointer to the first page; pages are contiguous.
    pub(crate) fn first_page(&mut self) -> NonNull<PortPage> {
        NonNull::from(&mut self.pages).cast()
    }
}

impl Default for PortPages {
    fn default() -> Self {
        Self::new()
    }
}

const _: () = {
    assert!(size_of::<CommandHeader>() == 32);
    assert!(size_of::<PrdEntry>() == 16);
    assert!(offset_of!(CommandTable, prdt) == 0x80);
    assert!(size_of::<ReceivedFis>() == 0x100);
    assert!(offset_of!(ReceivedFis, rfis) == 0x40);
    assert!(offset_of!(ReceivedFis, ufis) == 0x60);
    assert!(offset_of!(PortPage, cmdh) == 0x400);
    assert!(offset_of!(PortPage, cmdt) == 0x800);
    assert!(size_of::<PortPage>() == BLOCK_SIZE);
    assert!(align_of::<PortPage>() == BLOCK_SIZE);
};
