use std::fmt;

/// Ordered bit sequence: one scanned barcode row, or a stream of payload bits.
///
/// `scale` is the number of pixels per module when known. Writer output is
/// 1.0 and [`BitArray::scaled`] multiplies it. Rows cut from an image carry
/// none until a reader has measured one. Equality ignores it.
#[derive(Debug, Clone)]
pub struct BitArray {
    words: Vec<u32>,
    size: usize,
    scale: Option<f32>,
}

impl PartialEq for BitArray {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.words == other.words
    }
}

impl BitArray {
    /// Create an all-zero sequence of `size` bits
    pub fn new(size: usize) -> Self {
        Self {
            words: vec![0; size.div_ceil(32)],
            size,
            scale: None,
        }
    }

    /// Empty sequence meant to be grown with the `append_*` methods
    pub fn empty() -> Self {
        Self::new(0)
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.size
    }

    /// True when the sequence holds no bits
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Pixels per module, if known
    pub fn scale(&self) -> Option<f32> {
        self.scale
    }

    /// Attach a pixels-per-module scale
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Bit at `i`; out of range reads as unset
    pub fn get(&self, i: usize) -> bool {
        if i >= self.size {
            return false;
        }
        (self.words[i / 32] >> (i % 32)) & 1 == 1
    }

    /// Set bit `i`
    pub fn set(&mut self, i: usize) {
        if i < self.size {
            self.words[i / 32] |= 1 << (i % 32);
        }
    }

    /// Flip bit `i`
    pub fn flip(&mut self, i: usize) {
        if i < self.size {
            self.words[i / 32] ^= 1 << (i % 32);
        }
    }

    /// Set bits in `[start, end)`
    pub fn set_range(&mut self, start: usize, end: usize) {
        for i in start..end.min(self.size) {
            self.set(i);
        }
    }

    /// Clear all bits
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// True when every bit in `[start, end)` equals `value`. An empty range is trivially true.
    pub fn is_range(&self, start: usize, end: usize, value: bool) -> bool {
        if end > self.size {
            return false;
        }
        (start..end).all(|i| self.get(i) == value)
    }

    /// Index of the first set bit at or after `from`, or `len()` if none
    pub fn next_set(&self, from: usize) -> usize {
        (from..self.size).find(|&i| self.get(i)).unwrap_or(self.size)
    }

    /// Index of the first unset bit at or after `from`, or `len()` if none
    pub fn next_unset(&self, from: usize) -> usize {
        (from..self.size).find(|&i| !self.get(i)).unwrap_or(self.size)
    }

    /// Append one bit
    pub fn append_bit(&mut self, bit: bool) {
        if self.size % 32 == 0 {
            self.words.push(0);
        }
        self.size += 1;
        if bit {
            self.set(self.size - 1);
        }
    }

    /// Append the low `num_bits` of `value`, most significant first
    pub fn append_bits(&mut self, value: u32, num_bits: usize) {
        debug_assert!(num_bits <= 32);
        for shift in (0..num_bits).rev() {
            self.append_bit((value >> shift) & 1 == 1);
        }
    }

    /// Append every bit of `other`
    pub fn append_bit_array(&mut self, other: &BitArray) {
        for i in 0..other.len() {
            self.append_bit(other.get(i));
        }
    }

    /// Read `num_bits` starting at `offset` as a big-endian integer. Bits past the end read as 0.
    pub fn read_bits(&self, offset: usize, num_bits: usize) -> u32 {
        let mut value = 0u32;
        for i in offset..offset + num_bits {
            value = (value << 1) | u32::from(self.get(i));
        }
        value
    }

    /// Reverse the bit order in place (a row read right to left)
    pub fn reverse(&mut self) {
        let bits: Vec<bool> = self.iter().collect();
        self.clear();
        for (i, bit) in bits.into_iter().rev().enumerate() {
            if bit {
                self.set(i);
            }
        }
    }

    /// Copy with every module widened to `factor` pixels
    pub fn scaled(&self, factor: usize) -> Self {
        let mut out = Self::new(self.size * factor);
        out.scale = self.scale.map(|scale| scale * factor as f32);
        for i in 0..self.size {
            if self.get(i) {
                out.set_range(i * factor, (i + 1) * factor);
            }
        }
        out
    }

    /// Iterate over the bits in order
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.size).map(move |i| self.get(i))
    }

    /// Parse a string of `1`/`0` characters; whitespace is ignored
    pub fn parse(bits: &str) -> Option<Self> {
        let mut out = Self::empty();
        for c in bits.chars() {
            match c {
                '1' => out.append_bit(true),
                '0' => out.append_bit(false),
                c if c.is_whitespace() => {}
                _ => return None,
            }
        }
        Some(out)
    }
}

impl fmt::Display for BitArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromIterator<bool> for BitArray {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut out = Self::empty();
        for bit in iter {
            out.append_bit(bit);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_read() {
        let mut bits = BitArray::empty();
        bits.append_bits(0b1011, 4);
        bits.append_bits(0x3F, 6);
        assert_eq!(bits.len(), 10);
        assert_eq!(bits.read_bits(0, 4), 0b1011);
        assert_eq!(bits.read_bits(4, 6), 0x3F);
        assert_eq!(bits.to_string(), "1011111111");
    }

    #[test]
    fn test_next_set_and_ranges() {
        let bits = BitArray::parse("0001100").unwrap();
        assert_eq!(bits.next_set(0), 3);
        assert_eq!(bits.next_unset(3), 5);
        assert_eq!(bits.next_set(5), 7);
        assert!(bits.is_range(0, 3, false));
        assert!(!bits.is_range(0, 4, false));
        assert!(bits.is_range(2, 2, true));
        assert!(!bits.is_range(5, 9, false));
    }

    #[test]
    fn test_scale() {
        let bits = BitArray::parse("1101000").unwrap();
        assert_eq!(bits.scale(), None);
        assert_eq!(bits.scaled(3).scale(), None);

        let modules = bits.with_scale(1.0);
        let wide = modules.scaled(3);
        assert_eq!(wide.len(), 21);
        assert_eq!(wide.scale(), Some(3.0));
        assert_eq!(wide.to_string(), "111111000111000000000");
        // equality looks at the bits only
        assert_eq!(modules, BitArray::parse("1101000").unwrap());
    }

    #[test]
    fn test_reverse() {
        let mut bits = BitArray::parse("1100101").unwrap();
        bits.reverse();
        assert_eq!(bits.to_string(), "1010011");
    }

    #[test]
    fn test_word_boundary() {
        let bits: BitArray = (0..70).map(|i| i % 3 == 0).collect();
        assert_eq!(bits.len(), 70);
        assert!(bits.get(63));
        assert!(!bits.get(64));
        assert!(bits.get(69));
    }
}
