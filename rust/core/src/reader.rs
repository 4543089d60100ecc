// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cursor-based little-endian reader over a frame buffer
//!
//! Every typed read checks the remaining length first and fails with
//! [`Error::CorruptStream`] instead of returning partial data. A failed read
//! leaves the cursor where it was.

use crate::error::{Error, Result};

/// Little-endian reader with a mutable cursor over a borrowed buffer
#[derive(Debug, Clone)]
pub struct StreamReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StreamReader<'a> {
    /// Create a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current cursor offset from the start of the buffer
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Borrow the next `len` bytes and advance past them
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::CorruptStream {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    #[inline]
    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    #[inline]
    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    #[inline]
    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    /// Read a 64-bit id stored as two little-endian 32-bit words (`lo + hi * 2^32`)
    #[inline]
    pub fn read_u64(&mut self) -> Result<u64> {
        let words: [u8; 8] = self.read_array()?;
        let lo = u32::from_le_bytes([words[0], words[1], words[2], words[3]]);
        let hi = u32::from_le_bytes([words[4], words[5], words[6], words[7]]);
        Ok((u64::from(hi) << 32) | u64::from(lo))
    }

    /// Read an i32 element count, rejecting negative values
    pub fn read_count(&mut self) -> Result<usize> {
        let offset = self.pos;
        let count = self.read_i32()?;
        usize::try_from(count).map_err(|_| {
            self.pos = offset;
            Error::NegativeLength {
                offset,
                length: i64::from(count),
            }
        })
    }

    /// Read a string prefixed with its i16 byte length
    pub fn read_utf8(&mut self) -> Result<&'a str> {
        let start = self.pos;
        let len = self.read_i16()?;
        let len = match usize::try_from(len) {
            Ok(len) => len,
            Err(_) => {
                self.pos = start;
                return Err(Error::NegativeLength {
                    offset: start,
                    length: i64::from(len),
                });
            }
        };
        let bytes = match self.read_bytes(len) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.pos = start;
                return Err(e);
            }
        };
        std::str::from_utf8(bytes).map_err(|_| {
            self.pos = start;
            Error::InvalidString { offset: start }
        })
    }

    /// Borrow `count` elements of `size` bytes each
    fn read_elements(&mut self, count: usize, size: usize) -> Result<&'a [u8]> {
        let len = count.checked_mul(size).ok_or(Error::CorruptStream {
            offset: self.pos,
            needed: usize::MAX,
            available: self.remaining(),
        })?;
        self.read_bytes(len)
    }

    pub fn read_f64_array(&mut self, count: usize) -> Result<Vec<f64>> {
        let bytes = self.read_elements(count, 8)?;
        Ok(bytes
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect())
    }

    pub fn read_f32_array(&mut self, count: usize) -> Result<Vec<f32>> {
        let bytes = self.read_elements(count, 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    pub fn read_i16_array(&mut self, count: usize) -> Result<Vec<i16>> {
        let bytes = self.read_elements(count, 2)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    /// Advance to the next multiple of 4; no-op when already aligned
    #[inline]
    pub fn align4(&mut self) -> Result<()> {
        self.align_to(4)
    }

    /// Advance to the next multiple of 8; no-op when already aligned
    #[inline]
    pub fn align8(&mut self) -> Result<()> {
        self.align_to(8)
    }

    /// Move the cursor to the end of the buffer
    #[inline]
    pub fn skip_remaining(&mut self) {
        self.pos = self.data.len();
    }

    fn align_to(&mut self, boundary: usize) -> Result<()> {
        let rem = self.pos % boundary;
        if rem == 0 {
            return Ok(());
        }
        self.read_bytes(boundary - rem).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_primitive_reads_are_little_endian() {
        let mut data = vec![0x7f];
        data.extend_from_slice(&(-2i16).to_le_bytes());
        data.extend_from_slice(&123_456i32.to_le_bytes());
        data.extend_from_slice(&1.5f32.to_le_bytes());
        data.extend_from_slice(&(-0.25f64).to_le_bytes());

        let mut reader = StreamReader::new(&data);
        assert_eq!(reader.read_byte().unwrap(), 0x7f);
        assert_eq!(reader.read_i16().unwrap(), -2);
        assert_eq!(reader.read_i32().unwrap(), 123_456);
        assert_relative_eq!(reader.read_f32().unwrap(), 1.5);
        assert_relative_eq!(reader.read_f64().unwrap(), -0.25);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_u64_combines_low_and_high_words() {
        let cases: [(u32, u32); 4] = [(0, 0), (1, 0), (0xdead_beef, 1), (0xffff_ffff, 0x1f_ffff)];
        for (lo, hi) in cases {
            let mut data = lo.to_le_bytes().to_vec();
            data.extend_from_slice(&hi.to_le_bytes());
            let mut reader = StreamReader::new(&data);
            let expected = u64::from(lo) + u64::from(hi) * (1u64 << 32);
            assert_eq!(reader.read_u64().unwrap(), expected);
        }
        // 2^53 - 1, the largest id a double can hold exactly
        let mut reader = StreamReader::new(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x1f, 0x00]);
        assert_eq!(reader.read_u64().unwrap(), 9_007_199_254_740_991);
    }

    #[test]
    fn test_read_past_end_is_corrupt_stream() {
        let data = [1u8, 2, 3];
        let mut reader = StreamReader::new(&data);
        reader.read_byte().unwrap();
        let err = reader.read_i32().unwrap_err();
        assert_eq!(
            err,
            Error::CorruptStream {
                offset: 1,
                needed: 4,
                available: 2
            }
        );
        // Cursor did not move
        assert_eq!(reader.position(), 1);
        assert!(reader.read_f32_array(1).is_err());
        assert!(reader.read_f64().is_err());
    }

    #[test]
    fn test_align_is_noop_on_boundary() {
        let data = [0u8; 32];
        let mut reader = StreamReader::new(&data);
        reader.align8().unwrap();
        assert_eq!(reader.position(), 0);

        reader.read_bytes(8).unwrap();
        reader.align8().unwrap();
        assert_eq!(reader.position(), 8);
        reader.align4().unwrap();
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_align_moves_to_next_multiple() {
        let data = [0u8; 32];
        for start in 0..24 {
            let mut reader = StreamReader::new(&data);
            reader.read_bytes(start).unwrap();
            reader.align4().unwrap();
            assert_eq!(reader.position(), (start + 3) / 4 * 4);

            let mut reader = StreamReader::new(&data);
            reader.read_bytes(start).unwrap();
            reader.align8().unwrap();
            assert_eq!(reader.position(), (start + 7) / 8 * 8);
        }
    }

    #[test]
    fn test_align_past_end_fails() {
        let data = [0u8; 5];
        let mut reader = StreamReader::new(&data);
        reader.read_bytes(5).unwrap();
        assert!(reader.align8().is_err());
        assert!(reader.align4().is_err());
    }

    #[test]
    fn test_skip_remaining() {
        let data = [0u8; 5];
        let mut reader = StreamReader::new(&data);
        reader.read_byte().unwrap();
        reader.skip_remaining();
        assert_eq!(reader.position(), 5);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_read_utf8() {
        let mut data = 3i16.to_le_bytes().to_vec();
        data.extend_from_slice(b"BGS");
        let mut reader = StreamReader::new(&data);
        assert_eq!(reader.read_utf8().unwrap(), "BGS");

        let mut data = 10i16.to_le_bytes().to_vec();
        data.extend_from_slice(b"short");
        let mut reader = StreamReader::new(&data);
        assert!(matches!(reader.read_utf8(), Err(Error::CorruptStream { .. })));
        assert_eq!(reader.position(), 0);

        let mut data = 2i16.to_le_bytes().to_vec();
        data.extend_from_slice(&[0xff, 0xfe]);
        let mut reader = StreamReader::new(&data);
        assert_eq!(reader.read_utf8(), Err(Error::InvalidString { offset: 0 }));
    }

    #[test]
    fn test_negative_count_rejected() {
        let data = (-1i32).to_le_bytes();
        let mut reader = StreamReader::new(&data);
        assert_eq!(
            reader.read_count(),
            Err(Error::NegativeLength {
                offset: 0,
                length: -1
            })
        );
    }

    #[test]
    fn test_arrays() {
        let mut data = Vec::new();
        for v in [1.0f32, 2.0, 3.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        for v in [7i16, -8] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        for v in [0.5f64, 4.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let mut reader = StreamReader::new(&data);
        assert_eq!(reader.read_f32_array(3).unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(reader.read_i16_array(2).unwrap(), vec![7, -8]);
        assert_eq!(reader.read_f64_array(2).unwrap(), vec![0.5, 4.0]);
        assert_eq!(reader.read_f32_array(0).unwrap(), Vec::<f32>::new());
        assert!(reader.read_f64_array(usize::MAX).is_err());
    }
}
