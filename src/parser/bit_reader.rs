/// Least-significant-bit-first reader over the concatenated LZW sub-block bytes.
pub struct BitReader<'a> {
    buf: &'a [u8],
    // next byte to pull into the accumulator
    position: usize,
    bit_buffer: u32,
    bits_in_buffer: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            position: 0,
            bit_buffer: 0,
            bits_in_buffer: 0,
        }
    }

    /// Reads the next `count` bits (at most 16) as an unsigned value.
    ///
    /// Returns `None` once fewer than `count` bits remain; the partial bits are
    /// left unconsumed.
    pub fn next(&mut self, count: u32) -> Option<u16> {
        debug_assert!(count <= 16, "cannot read more than 16 bits at a time");

        while self.bits_in_buffer < count {
            let byte = *self.buf.get(self.position)?;
            self.bit_buffer |= u32::from(byte) << self.bits_in_buffer;
            self.bits_in_buffer += 8;
            self.position += 1;
        }

        let value = self.bit_buffer & ((1 << count) - 1);
        self.bit_buffer >>= count;
        self.bits_in_buffer -= count;

        Some(value as u16)
    }

    /// Bits that have not been consumed yet.
    pub fn remaining(&self) -> usize {
        (self.buf.len() - self.position) * 8 + self.bits_in_buffer as usize
    }
}

#[cfg(test)]
mod tests {
    use super::BitReader;

    const BUFFER: &[u8] = &[
        0b10000100,
        0b10001111,
        0b10101001,
        0b11001011,
        0b11101101,
        0b00001111,
        0b10100011
    ];

    #[test]
    fn it_works() {
        let mut reader = BitReader::new(BUFFER);
        assert_eq!(reader.next(3), Some(0b00000100));
        assert_eq!(reader.next(3), Some(0b00000000));
        assert_eq!(reader.next(3), Some(0b00000110));
        assert_eq!(reader.next(3), Some(0b00000111));
        assert_eq!(reader.next(3), Some(0b00000000));
        assert_eq!(reader.next(3), Some(0b00000011));
        assert_eq!(reader.next(3), Some(0b00000010));
        assert_eq!(reader.next(3), Some(0b00000101));
    }

    #[test]
    fn wide_codes_span_bytes() {
        let mut reader = BitReader::new(BUFFER);
        assert_eq!(reader.next(12), Some(3972));
        assert_eq!(reader.next(12), Some(2712));
        assert_eq!(reader.next(12), Some(3531));
        assert_eq!(reader.next(12), Some(254));
        assert_eq!(reader.remaining(), 8);
        assert_eq!(reader.next(12), None);
    }

    #[test]
    fn runs_dry_without_consuming_partial_code() {
        let mut reader = BitReader::new(BUFFER);
        for _ in 0..18 {
            assert!(reader.next(3).is_some());
        }
        assert_eq!(reader.remaining(), 2);
        assert_eq!(reader.next(3), None);
        assert_eq!(reader.next(2), Some(0b10));
        assert_eq!(reader.next(1), None);
    }

    #[test]
    fn empty_buffer() {
        let mut reader = BitReader::new(&[]);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.next(1), None);
    }
}
