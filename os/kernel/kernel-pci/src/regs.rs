//! # Configuration Space Registers
//!
//! Offsets and bit layouts of the type 0/1 header registers the enumerator
//! and the bridge driver read. Every register is read as an aligned `u32`
//! and decoded through one of the types below.

use bitfield_struct::bitfield;

pub const PCI_ID_REG: u16 = 0x00;
pub const PCI_CLASS_REG: u16 = 0x08;
pub const PCI_BHLC_REG: u16 = 0x0C;
pub const PCI_BRIDGE_BUS_REG: u16 = 0x18;
pub const PCI_BRIDGE_STATIO_REG: u16 = 0x1C;
pub const PCI_INTERRUPT_REG: u16 = 0x3C;

/// Vendor id read back from an empty slot.
pub const PCI_VENDOR_NONE: u16 = 0xFFFF;

pub const PCI_CLASS_MASS_STORAGE: u8 = 0x01;
pub const PCI_SUBCLASS_MASS_STORAGE_SATA: u8 = 0x06;
pub const PCI_CLASS_BRIDGE: u8 = 0x06;
pub const PCI_SUBCLASS_BRIDGE_PCI: u8 = 0x04;

/// Offset `0x00`: vendor and device id.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct PciId {
    pub vendor: u16,
    pub device: u16,
}

/// Offset `0x08`: revision and class code.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct ClassReg {
    pub revision: u8,
    pub prog_if: u8,
    pub subclass: u8,
    pub class: u8,
}

/// Offset `0x0C`: BIST, header type, latency timer, cache line size.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct Bhlc {
    pub cache_line_size: u8,
    pub latency_timer: u8,
    /// 0: endpoint, 1: PCI-to-PCI bridge, 2: CardBus bridge.
    #[bits(7)]
    pub header_type: u8,
    pub multifunction: bool,
    pub bist: u8,
}

/// Offset `0x18` of a type 1 header: bus numbers behind the bridge.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct BridgeBus {
    pub primary: u8,
    pub secondary: u8,
    pub subordinate: u8,
    pub secondary_latency: u8,
}

/// Offset `0x1C` of a type 1 header: I/O window and secondary status.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct BridgeStatusIo {
    /// Low nibble of I/O base: 0 = 16-bit decode, 1 = 32-bit decode.
    #[bits(4)]
    pub io_base_kind: u8,
    #[bits(4)]
    pub io_base: u8,
    #[bits(4)]
    pub io_limit_kind: u8,
    #[bits(4)]
    pub io_limit: u8,
    pub secondary_status: u16,
}

impl BridgeStatusIo {
    /// Whether the bridge decodes 32-bit I/O addresses.
    #[must_use]
    pub const fn io_32bit(&self) -> bool {
        self.io_base_kind() == 1
    }
}

/// Offset `0x3C`: interrupt routing.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct InterruptReg {
    pub line: u8,
    pub pin: u8,
    pub min_grant: u8,
    pub max_latency: u8,
}
