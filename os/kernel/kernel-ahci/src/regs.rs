//! # HBA Register Layout
//!
//! The generic host control block is followed at `0x100` by 32 port
//! register blocks of `0x80` bytes each. The `#[repr(C)]` structs below are
//! never dereferenced; they pin the layout so that every register offset is
//! derived with [`offset_of!`](core::mem::offset_of).

use bitfield_struct::bitfield;
use core::mem::offset_of;
use kernel_info::limits::AHCI_MAX_PORTS;

/// Port x register block (AHCI 1.3.1, 3.3).
#[repr(C)]
pub struct PortRegisters {
    pub clb: u32,
    pub clbu: u32,
    pub fb: u32,
    pub fbu: u32,
    pub is: u32,
    pub ie: u32,
    pub cmd: u32,
    _reserved0: u32,
    pub tfd: u32,
    pub sig: u32,
    pub ssts: u32,
    pub sctl: u32,
    pub serr: u32,
    pub sact: u32,
    pub ci: u32,
    pub sntf: u32,
    pub fbs: u32,
    pub devslp: u32,
    _reserved1: [u8; 0x80 - 0x48],
}

/// Generic host control followed by the port blocks (AHCI 1.3.1, 3.1).
#[repr(C)]
pub struct HbaMemory {
    pub cap: u32,
    pub ghc: u32,
    pub is: u32,
    pub pi: u32,
    pub vs: u32,
    pub ccc_ctl: u32,
    pub ccc_ports: u32,
    pub em_loc: u32,
    pub em_ctl: u32,
    pub cap2: u32,
    pub bohc: u32,
    _reserved: [u8; 0x100 - 0x2C],
    pub ports: [PortRegisters; AHCI_MAX_PORTS],
}

/// Size of the register window the controller decodes.
pub const HBA_WINDOW_SIZE: usize = size_of::<HbaMemory>();

const _: () = {
    assert!(size_of::<PortRegisters>() == 0x80);
    assert!(size_of::<HbaMemory>() == 0x1100);
    assert!(offset_of!(HbaMemory, ports) == 0x100);
    assert!(offset_of!(PortRegisters, tfd) == 0x20);
    assert!(offset_of!(PortRegisters, devslp) == 0x44);
};

pub const HBA_CAP: usize = offset_of!(HbaMemory, cap);
pub const HBA_GHC: usize = offset_of!(HbaMemory, ghc);
pub const HBA_IS: usize = offset_of!(HbaMemory, is);
pub const HBA_PI: usize = offset_of!(HbaMemory, pi);
pub const HBA_VS: usize = offset_of!(HbaMemory, vs);

pub const PX_CLB: usize = offset_of!(PortRegisters, clb);
pub const PX_CLBU: usize = offset_of!(PortRegisters, clbu);
pub const PX_FB: usize = offset_of!(PortRegisters, fb);
pub const PX_FBU: usize = offset_of!(PortRegisters, fbu);
pub const PX_IS: usize = offset_of!(PortRegisters, is);
pub const PX_CMD: usize = offset_of!(PortRegisters, cmd);
pub const PX_TFD: usize = offset_of!(PortRegisters, tfd);
pub const PX_SIG: usize = offset_of!(PortRegisters, sig);
pub const PX_SSTS: usize = offset_of!(PortRegisters, ssts);
pub const PX_SERR: usize = offset_of!(PortRegisters, serr);
pub const PX_CI: usize = offset_of!(PortRegisters, ci);

/// Offset of port `port`'s register block from the start of the window.
#[must_use]
pub const fn port_offset(port: usize) -> usize {
    offset_of!(HbaMemory, ports) + port * size_of::<PortRegisters>()
}

/// Offset `0x04`: GHC – Global HBA Control.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct Ghc {
    /// HBA Reset.
    pub hr: bool,
    /// Interrupt Enable.
    pub ie: bool,
    /// MSI Revert to Single Message.
    pub mrsm: bool,
    #[bits(28, default = 0)]
    _reserved_3_30: u32,
    /// AHCI Enable.
    pub ae: bool,
}

/// Port offset `0x18`: PxCMD – Command and Status.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct PortCmd {
    /// Start: process the command list.
    pub st: bool,
    /// Spin-Up Device.
    pub sud: bool,
    /// Power On Device.
    pub pod: bool,
    /// Command List Override.
    pub clo: bool,
    /// FIS Receive Enable.
    pub fre: bool,
    #[bits(3, default = 0)]
    _reserved_5_7: u8,
    /// Current Command Slot.
    #[bits(5)]
    pub ccs: u8,
    pub mpss: bool,
    /// FIS Receive Running.
    pub fr: bool,
    /// Command List Running.
    pub cr: bool,
    pub cps: bool,
    pub pma: bool,
    pub hpcp: bool,
    pub mpsp: bool,
    pub cpd: bool,
    pub esp: bool,
    pub fbscp: bool,
    pub apste: bool,
    pub atapi: bool,
    pub dlae: bool,
    pub alpe: bool,
    pub asp: bool,
    /// Interface Communication Control.
    #[bits(4)]
    pub icc: u8,
}

impl PortCmd {
    /// Whether the command engine or FIS receive engine is still running.
    #[must_use]
    pub const fn engines_running(&self) -> bool {
        self.cr() || self.fr()
    }
}

/// ATA status register, as mirrored in PxTFD.STS.
#[bitfield(u8)]
#[derive(Eq, PartialEq)]
pub struct AtaStatus {
    /// Error: the error register holds details.
    pub err: bool,
    #[bits(2, default = 0)]
    _obsolete_1_2: u8,
    /// Data Request.
    pub drq: bool,
    #[bits(default = false)]
    _command_specific_4: bool,
    /// Device Fault.
    pub df: bool,
    /// Device Ready.
    pub drdy: bool,
    /// Busy.
    pub bsy: bool,
}

impl AtaStatus {
    /// Whether the last command failed.
    #[must_use]
    pub const fn failed(&self) -> bool {
        self.err() || self.df()
    }
}

/// Port offset `0x20`: PxTFD – Task File Data.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct TaskFileData {
    #[bits(8)]
    pub status: AtaStatus,
    pub error: u8,
    #[bits(16, default = 0)]
    _reserved_16_31: u16,
}

/// Port offset `0x28`: PxSSTS – SATA Status (SStatus).
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct SataStatus {
    /// Device Detection: 3 = device present and PHY established.
    #[bits(4)]
    pub det: u8,
    /// Negotiated interface speed.
    #[bits(4)]
    pub spd: u8,
    /// Interface power management state.
    #[bits(4)]
    pub ipm: u8,
    #[bits(20, default = 0)]
    _reserved_12_31: u32,
}

impl SataStatus {
    /// A port whose status reads zero has nothing attached.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.into_bits() == 0
    }
}
