//! Bounds checked, big-endian reads over a borrowed byte slice.
//!
//! Every decoder in this crate reads through a `ByteCursor` so that a short buffer surfaces as a
//! `CursorUnderflow` error instead of a panic.  Writes go straight into `bytes::BytesMut` through
//! `BufMut`, with `write_u24` covering the one width `BufMut` has no method for.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytes::{BufMut, BytesMut};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("Attempted to read {requested} bytes but only {available} remained")]
pub struct CursorUnderflow {
    pub requested: usize,
    pub available: usize,
}

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> ByteCursor<'a> {
        ByteCursor { bytes, position: 0 }
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorUnderflow> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorUnderflow> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u24(&mut self) -> Result<u32, CursorUnderflow> {
        Ok(BigEndian::read_u24(self.read_bytes(3)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorUnderflow> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, CursorUnderflow> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], CursorUnderflow> {
        if count > self.remaining() {
            return Err(CursorUnderflow {
                requested: count,
                available: self.remaining(),
            });
        }

        let start = self.position;
        self.position += count;
        Ok(&self.bytes[start..self.position])
    }

    /// Reads at most `max` bytes, returning fewer (possibly none) when the slice runs out
    pub fn read_up_to(&mut self, max: usize) -> &'a [u8] {
        let count = max.min(self.remaining());
        let start = self.position;
        self.position += count;
        &self.bytes[start..self.position]
    }
}

/// Appends the low 24 bits of `value` in big-endian order
pub fn write_u24(bytes: &mut BytesMut, value: u32) {
    debug_assert!(value <= 0x00FF_FFFF, "{} does not fit in 24 bits", value);
    bytes.put_uint(value as u64, 3);
}

#[cfg(test)]
mod tests {
    use super::{write_u24, ByteCursor, CursorUnderflow};
    use bytes::BytesMut;

    #[test]
    fn reads_mixed_width_fields_in_order() {
        let bytes = [0x01, 0x00, 0x02, 0x00, 0x00, 0x03, 0x04, 0x00, 0x00, 0x00, 0xAA];
        let mut cursor = ByteCursor::new(&bytes);

        assert_eq!(cursor.read_u8(), Ok(1));
        assert_eq!(cursor.read_u16(), Ok(2));
        assert_eq!(cursor.read_u24(), Ok(3));
        assert_eq!(cursor.read_u32_le(), Ok(4));
        assert_eq!(cursor.position(), 10);
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.read_up_to(8), &[0xAA]);
        assert!(cursor.is_empty());
    }

    #[test]
    fn short_read_reports_underflow_without_advancing() {
        let bytes = [0x00, 0x01];
        let mut cursor = ByteCursor::new(&bytes);

        assert_eq!(
            cursor.read_u32(),
            Err(CursorUnderflow {
                requested: 4,
                available: 2
            })
        );
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn read_up_to_stops_at_end_of_slice() {
        let bytes = [1, 2, 3];
        let mut cursor = ByteCursor::new(&bytes);

        assert_eq!(cursor.read_up_to(2), &[1, 2]);
        assert_eq!(cursor.read_up_to(10), &[3]);
        assert!(cursor.read_up_to(10).is_empty());
        assert!(cursor.is_empty());
    }

    #[test]
    fn write_u24_is_big_endian() {
        let mut bytes = BytesMut::new();
        write_u24(&mut bytes, 0x0A0B0C);

        assert_eq!(&bytes[..], &[0x0A, 0x0B, 0x0C]);
    }
}
