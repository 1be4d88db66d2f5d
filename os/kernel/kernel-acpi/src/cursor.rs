//! # Byte Cursor
//!
//! Little-endian reader over a borrowed byte slice. All variable-length
//! firmware records (MADT subtables, root table entry arrays, MCFG
//! allocations) are walked through this type so that every read is bounds
//! checked against the bytes that are actually left.

/// Forward-only reader over a byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Offset of the next unread byte from the start of the slice.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes not yet consumed.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread bytes, without consuming them.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    /// Consume `n` bytes, or nothing if fewer than `n` remain.
    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if n > self.remaining() {
            return None;
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Some(out)
    }

    /// Consume `N` bytes as an array.
    pub fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take(N)?.try_into().ok()
    }

    /// Skip `n` bytes, or nothing if fewer than `n` remain.
    pub fn skip(&mut self, n: usize) -> Option<()> {
        self.take(n).map(|_| ())
    }

    pub fn u8(&mut self) -> Option<u8> {
        self.array::<1>().map(|[b]| b)
    }

    pub fn u16(&mut self) -> Option<u16> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> Option<u32> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn u64(&mut self) -> Option<u64> {
        self.array().map(u64::from_le_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let bytes = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xAA];
        let mut c = ByteCursor::new(&bytes);
        assert_eq!(c.u8(), Some(1));
        assert_eq!(c.u16(), Some(0x1234));
        assert_eq!(c.u32(), Some(0x1234_5678));
        assert_eq!(c.remaining(), 1);
        assert_eq!(c.position(), 7);
    }

    #[test]
    fn short_read_consumes_nothing() {
        let bytes = [1, 2, 3];
        let mut c = ByteCursor::new(&bytes);
        assert_eq!(c.u32(), None);
        assert_eq!(c.remaining(), 3);
        assert_eq!(c.take(3), Some(&bytes[..]));
        assert!(c.is_empty());
        assert_eq!(c.u8(), None);
    }
}
