//! Bounds-checked sequential reads over an immutable buffer.
//!
//! Every read either consumes exactly its width or fails with
//! [`OutOfBounds`] and leaves the cursor where it was. Reads stop at the
//! current limit, which is the buffer end unless narrowed.

use thiserror::Error;

/// A read needed more bytes than remain in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("out of bounds at offset {offset}: need {requested} bytes, {available} available")]
pub struct OutOfBounds {
    pub requested: usize,
    pub available: usize,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buffer: &'a [u8],
    offset: usize,
    limit: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            offset: 0,
            limit: buffer.len(),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.offset)
    }

    /// Exclusive end offset for reads.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Move the read limit, clamped to the buffer, and return the previous one.
    pub fn set_limit(&mut self, limit: usize) -> usize {
        std::mem::replace(&mut self.limit, limit.min(self.buffer.len()))
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn require(&self, needed: usize) -> Result<(), OutOfBounds> {
        if self.remaining() < needed {
            return Err(OutOfBounds {
                requested: needed,
                available: self.remaining(),
                offset: self.offset,
            });
        }
        Ok(())
    }

    /// Borrow `len` bytes starting `skip` bytes past the cursor without moving.
    pub fn peek_at(&self, skip: usize, len: usize) -> Result<&'a [u8], OutOfBounds> {
        let start = self.offset.saturating_add(skip);
        let end = start.saturating_add(len);
        let bytes = self.buffer.get(start..end).filter(|_| end <= self.limit);
        bytes.ok_or(OutOfBounds {
            requested: skip.saturating_add(len),
            available: self.remaining(),
            offset: self.offset,
        })
    }

    pub fn peek_bytes(&self, len: usize) -> Result<&'a [u8], OutOfBounds> {
        self.peek_at(0, len)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], OutOfBounds> {
        let bytes = self.peek_bytes(len)?;
        self.offset += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), OutOfBounds> {
        self.require(len)?;
        self.offset += len;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, OutOfBounds> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, OutOfBounds> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u24(&mut self) -> Result<u32, OutOfBounds> {
        let bytes = self.read_bytes(3)?;
        Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, OutOfBounds> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Big-endian unsigned integer of 1 to 8 bytes.
    pub fn read_uint(&mut self, width: usize) -> Result<u64, OutOfBounds> {
        debug_assert!((1..=8).contains(&width));
        let bytes = self.read_bytes(width)?;
        Ok(bytes
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
    }

    /// Read `width` bytes and keep the bits selected by `mask`, shifted down
    /// to bit zero.
    pub fn read_masked(&mut self, width: usize, mask: u64) -> Result<u64, OutOfBounds> {
        let raw = self.read_uint(width)?;
        Ok(apply_mask(raw, mask))
    }

    /// Peek `n_bits` (at most 64) starting `bit_offset` bits past the cursor.
    pub fn read_bits(&self, bit_offset: usize, n_bits: u32) -> Result<u64, OutOfBounds> {
        debug_assert!(n_bits <= 64);
        let bit_end = bit_offset + n_bits as usize;
        let bytes = self.peek_bytes(bit_end.div_ceil(8))?;
        let mut value = 0u64;
        for bit in bit_offset..bit_end {
            let set = (bytes[bit / 8] >> (7 - bit % 8)) & 1;
            value = (value << 1) | u64::from(set);
        }
        Ok(value)
    }
}

pub(crate) fn apply_mask(raw: u64, mask: u64) -> u64 {
    if mask == 0 {
        return 0;
    }
    (raw & mask) >> mask.trailing_zeros()
}

/// Sign-extend the low `bits` of `value`.
pub(crate) fn sign_extend(value: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

#[cfg(test)]
mod tests {
    use super::{ByteCursor, OutOfBounds, apply_mask, sign_extend};

    #[test]
    fn reads_big_endian_widths() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u8().unwrap(), 0x01);
        assert_eq!(cursor.read_u16().unwrap(), 0x0203);
        assert_eq!(cursor.read_u24().unwrap(), 0x040506);
        assert_eq!(cursor.read_u32().unwrap(), 0x0708090a);
        assert_eq!(cursor.offset(), data.len());
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn short_read_reports_context_and_keeps_offset() {
        let data = [0xaa, 0xbb, 0xcc];
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(2).unwrap();
        let err = cursor.read_u16().unwrap_err();
        assert_eq!(
            err,
            OutOfBounds {
                requested: 2,
                available: 1,
                offset: 2
            }
        );
        assert_eq!(cursor.offset(), 2);
        assert_eq!(cursor.read_u8().unwrap(), 0xcc);
    }

    #[test]
    fn masked_values_are_normalized() {
        let data = [0b1011_0110];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_masked(1, 0x3e).unwrap(), 0b11011);
        assert_eq!(apply_mask(0xffff, 0), 0);
        assert_eq!(apply_mask(0x8000, 0x8000), 1);
    }

    #[test]
    fn read_bits_spans_bytes() {
        // 33-bit value 0x1_0000_0001 followed by 6 reserved bits and 9-bit 0x1ff.
        let data = [0x80, 0x00, 0x00, 0x00, 0xff, 0xff];
        let cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_bits(0, 33).unwrap(), 0x1_0000_0001);
        assert_eq!(cursor.read_bits(39, 9).unwrap(), 0x1ff);
        assert_eq!(cursor.offset(), 0);
        assert!(cursor.read_bits(40, 9).is_err());
    }

    #[test]
    fn peek_at_does_not_move() {
        let data = [1, 2, 3, 4];
        let cursor = ByteCursor::new(&data);
        assert_eq!(cursor.peek_at(2, 2).unwrap(), &[3, 4]);
        assert!(cursor.peek_at(3, 2).is_err());
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn limit_bounds_reads_until_restored() {
        let data = [1, 2, 3, 4];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.set_limit(2), 4);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(
            cursor.peek_at(1, 2).unwrap_err(),
            OutOfBounds {
                requested: 3,
                available: 2,
                offset: 0
            }
        );
        assert_eq!(cursor.read_u16().unwrap(), 0x0102);
        assert!(cursor.read_u8().is_err());
        assert_eq!(cursor.set_limit(9), 2);
        assert_eq!(cursor.limit(), 4);
        assert_eq!(cursor.read_u16().unwrap(), 0x0304);
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0xff_ffff, 24), -1);
        assert_eq!(sign_extend(0x7f_ffff, 24), 0x7f_ffff);
        assert_eq!(sign_extend(0x80, 8), -128);
    }
}
