//! Register host-to-device FIS and the ATA commands issued through it.

use bitfield_struct::bitfield;

/// FIS type of a register host-to-device FIS.
pub const FIS_TYPE_REG_H2D: u8 = 0x27;

/// Encoded length of [`FisRegH2d`].
pub const FIS_REG_H2D_LEN: usize = 20;

pub const ATA_CMD_READ_DMA_EXT: u8 = 0x25;
pub const ATA_CMD_WRITE_DMA_EXT: u8 = 0x35;
pub const ATA_CMD_FLUSH_CACHE: u8 = 0xE7;
pub const ATA_CMD_IDENTIFY: u8 = 0xEC;

/// Sectors addressable through a 48-bit LBA.
pub const LBA48_SECTORS: u64 = 1 << 48;

/// Device register: LBA addressing.
pub const ATA_DEV_LBA: u8 = 1 << 6;

/// Device control register: High Order Byte.
pub const ATA_CTL_HOB: u8 = 1 << 7;

/// Second byte of a register H2D FIS.
#[bitfield(u8)]
#[derive(Eq, PartialEq)]
pub struct FisFlags {
    /// Port Multiplier Port.
    #[bits(4)]
    pub pmport: u8,
    #[bits(3, default = 0)]
    _reserved_4_6: u8,
    /// The FIS carries a command rather than a device control update.
    pub command: bool,
}

/// Register host-to-device FIS.
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FisRegH2d {
    pub fis_type: u8,
    pub flags: FisFlags,
    pub command: u8,
    pub feature_low: u8,
    pub lba: [u8; 3],
    pub device: u8,
    pub lba_high: [u8; 3],
    pub feature_high: u8,
    pub count: [u8; 2],
    pub icc: u8,
    pub control: u8,
    _reserved: [u8; 4],
}

const _: () = assert!(size_of::<FisRegH2d>() == FIS_REG_H2D_LEN);

impl FisRegH2d {
    /// A command FIS with every other field zero.
    #[must_use]
    pub const fn command(command: u8) -> Self {
        Self {
            fis_type: FIS_TYPE_REG_H2D,
            flags: FisFlags::new().with_command(true),
            command,
            feature_low: 0,
            lba: [0; 3],
            device: 0,
            lba_high: [0; 3],
            feature_high: 0,
            count: [0; 2],
            icc: 0,
            control: 0,
            _reserved: [0; 4],
        }
    }

    /// IDENTIFY DEVICE, returning one 512-byte block.
    #[must_use]
    pub const fn identify() -> Self {
        let mut fis = Self::command(ATA_CMD_IDENTIFY);
        fis.count = [1, 0];
        fis
    }

    /// READ DMA EXT of `count` sectors starting at `lba`.
    #[must_use]
    pub const fn read_dma_ext(lba: u64, count: u16) -> Self {
        Self::dma_ext(ATA_CMD_READ_DMA_EXT, lba, count)
    }

    /// WRITE DMA EXT of `count` sectors starting at `lba`.
    #[must_use]
    pub const fn write_dma_ext(lba: u64, count: u16) -> Self {
        Self::dma_ext(ATA_CMD_WRITE_DMA_EXT, lba, count)
    }

    /// FLUSH CACHE.
    #[must_use]
    pub const fn flush_cache() -> Self {
        Self::command(ATA_CMD_FLUSH_CACHE)
    }

    /// Only the low 48 bits of `lba` are encoded; callers range-check first.
    const fn dma_ext(command: u8, lba: u64, count: u16) -> Self {
        let b = lba.to_le_bytes();
        let mut fis = Self::command(command);
        fis.lba = [b[0], b[1], b[2]];
        fis.lba_high = [b[3], b[4], b[5]];
        fis.count = count.to_le_bytes();
        fis.device = ATA_DEV_LBA;
        fis.control = ATA_CTL_HOB;
        fis
    }

    /// The 48-bit LBA carried by this FIS.
    #[must_use]
    pub const fn lba48(&self) -> u64 {
        u64::from_le_bytes([
            self.lba[0],
            self.lba[1],
            self.lba[2],
            self.lba_high[0],
            self.lba_high[1],
            self.lba_high[2],
            0,
            0,
        ])
    }

    #[must_use]
    pub const fn sector_count(&self) -> u16 {
        u16::from_le_bytes(self.count)
    }

    /// Wire encoding, as copied into the command table's CFIS area.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; FIS_REG_H2D_LEN] {
        [
            self.fis_type,
            self.flags.into_bits(),
            self.command,
            self.feature_low,
            self.lba[0],
            self.lba[1],
            self.lba[2],
            self.device,
            self.lba_high[0],
            self.lba_high[1],
            self.lba_high[2],
            self.feature_high,
            self.count[0],
            self.count[1],
            self.icc,
            self.control,
            0,
            0,
            0,
            0,
        ]
    }

    /// Decodes a FIS from a command table; `None` if it is not a register H2D FIS.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let b: &[u8; FIS_REG_H2D_LEN] = bytes.get(..FIS_REG_H2D_LEN)?.try_into().ok()?;
        if b[0] != FIS_TYPE_REG_H2D {
            return None;
        }
        let mut fis = Self::command(b[2]);
        fis.flags = FisFlags::from_bits(b[1]);
        fis.feature_low = b[3];
        fis.lba = [b[4], b[5], b[6]];
        fis.device = b[7];
        fis.lba_high = [b[8], b[9], b[10]];
        fis.feature_high = b[11];
        fis.count = [b[12], b[13]];
        fis.icc = b[14];
        fis.control = b[15];
        Some(fis)
    }
}
