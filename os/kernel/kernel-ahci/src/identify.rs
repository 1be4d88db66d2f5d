//! IDENTIFY DEVICE data.

use core::fmt;
use kernel_info::limits::SECTOR_SIZE;

const SERIAL: (usize, usize) = (10, 20);
const FIRMWARE: (usize, usize) = (23, 27);
const MODEL: (usize, usize) = (27, 47);
const LBA28_SECTORS: usize = 60;
const LBA48_SECTORS: usize = 100;

/// The 256-word block returned by IDENTIFY DEVICE.
#[repr(C, align(2))]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct IdentifyDevice {
    words: [u16; 256],
}

const _: () = assert!(size_of::<IdentifyDevice>() == SECTOR_SIZE);

impl IdentifyDevice {
    pub const ZERO: Self = Self { words: [0; 256] };

    #[must_use]
    pub const fn from_words(words: [u16; 256]) -> Self {
        Self { words }
    }

    #[must_use]
    pub fn from_bytes(bytes: &[u8; SECTOR_SIZE]) -> Self {
        let mut words = [0u16; 256];
        for (w, b) in words.iter_mut().zip(bytes.chunks_exact(2)) {
            *w = u16::from_le_bytes([b[0], b[1]]);
        }
        Self { words }
    }

    #[must_use]
    pub const fn words(&self) -> &[u16; 256] {
        &self.words
    }

    #[must_use]
    pub const fn word(&self, index: usize) -> u16 {
        self.words[index]
    }

    /// User-addressable sectors in 28-bit mode (words 60-61).
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn lba28_sectors(&self) -> u32 {
        (self.words[LBA28_SECTORS + 1] as u32) << 16 | self.words[LBA28_SECTORS] as u32
    }

    /// User-addressable sectors in 48-bit mode (words 100-103).
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn lba48_sectors(&self) -> u64 {
        let w = &self.words;
        (w[LBA48_SECTORS + 3] as u64) << 48
            | (w[LBA48_SECTORS + 2] as u64) << 32
            | (w[LBA48_SECTORS + 1] as u64) << 16
            | w[LBA48_SECTORS] as u64
    }

    /// Capacity in sectors, preferring the 48-bit count.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn sectors(&self) -> u64 {
        match self.lba48_sectors() {
            0 => self.lba28_sectors() as u64,
            n => n,
        }
    }

    /// Capacity in bytes, saturating for nonsensical sector counts.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.sectors().saturating_mul(SECTOR_SIZE as u64)
    }

    #[must_use]
    pub fn serial(&self) -> AtaString<20> {
        AtaString::from_words(&self.words[SERIAL.0..SERIAL.1])
    }

    #[must_use]
    pub fn firmware(&self) -> AtaString<8> {
        AtaString::from_words(&self.words[FIRMWARE.0..FIRMWARE.1])
    }

    #[must_use]
    pub fn model(&self) -> AtaString<40> {
        AtaString::from_words(&self.words[MODEL.0..MODEL.1])
    }
}

impl fmt::Debug for IdentifyDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifyDevice")
            .field("model", &self.model().as_str())
            .field("serial", &self.serial().as_str())
            .field("firmware", &self.firmware().as_str())
            .field("sectors", &self.sectors())
            .finish()
    }
}

/// An ATA string field: two characters per word, high byte first,
/// padded with spaces.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct AtaString<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> AtaString<N> {
    fn from_words(words: &[u16]) -> Self {
        let mut bytes = [0u8; N];
        for (pair, w) in bytes.chunks_exact_mut(2).zip(words) {
            pair.copy_from_slice(&w.to_be_bytes());
        }
        Self { bytes }
    }

    /// The string with trailing padding removed; non-ASCII content reads as
    /// empty.
    #[must_use]
    pub fn as_str(&self) -> &str {
        let end = self
            .bytes
            .iter()
            .rposition(|&b| b != b' ' && b != 0)
            .map_or(0, |i| i + 1);
        let text = &self.bytes[..end];
        if text.is_ascii() {
            core::str::from_utf8(text).unwrap_or_default()
        } else {
            ""
        }
    }
}

impl<const N: usize> fmt::Display for AtaString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> fmt::Debug for AtaString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}
