//! Arithmetic in GF(2^m) with precomputed log/antilog tables.
//!
//! The Aztec fields are built on first use and shared read-only afterwards.

use std::sync::OnceLock;

/// Finite field GF(2^m) defined by a primitive polynomial
#[derive(Debug)]
pub struct GaloisField {
    exp: Vec<u16>,
    log: Vec<u16>,
    size: usize,
    primitive: u32,
    generator_base: usize,
}

static AZTEC_PARAM: OnceLock<GaloisField> = OnceLock::new();
static AZTEC_DATA_6: OnceLock<GaloisField> = OnceLock::new();
static AZTEC_DATA_8: OnceLock<GaloisField> = OnceLock::new();
static AZTEC_DATA_10: OnceLock<GaloisField> = OnceLock::new();
static AZTEC_DATA_12: OnceLock<GaloisField> = OnceLock::new();

impl GaloisField {
    /// Build a field of `size` elements (a power of two). `generator_base` is the
    /// exponent of the first root of Reed-Solomon generator polynomials over it.
    pub fn new(primitive: u32, size: usize, generator_base: usize) -> Self {
        debug_assert!(size.is_power_of_two() && size >= 4);
        let mut exp = vec![0u16; size];
        let mut log = vec![0u16; size];
        let mut x = 1u32;
        for slot in exp.iter_mut() {
            *slot = x as u16;
            x <<= 1;
            if x as usize >= size {
                x ^= primitive;
                x &= size as u32 - 1;
            }
        }
        for (i, &value) in exp.iter().enumerate().take(size - 1) {
            log[value as usize] = i as u16;
        }
        Self {
            exp,
            log,
            size,
            primitive,
            generator_base,
        }
    }

    /// GF(16), x^4 + x + 1: Aztec mode message
    pub fn aztec_param() -> &'static GaloisField {
        AZTEC_PARAM.get_or_init(|| GaloisField::new(0x13, 16, 1))
    }

    /// GF(64), x^6 + x + 1: Aztec data, 1-2 layers
    pub fn aztec_data_6() -> &'static GaloisField {
        AZTEC_DATA_6.get_or_init(|| GaloisField::new(0x43, 64, 1))
    }

    /// GF(256), x^8 + x^5 + x^3 + x^2 + 1: Aztec data, 3-8 layers
    pub fn aztec_data_8() -> &'static GaloisField {
        AZTEC_DATA_8.get_or_init(|| GaloisField::new(0x12D, 256, 1))
    }

    /// GF(1024), x^10 + x^3 + 1: Aztec data, 9-22 layers
    pub fn aztec_data_10() -> &'static GaloisField {
        AZTEC_DATA_10.get_or_init(|| GaloisField::new(0x409, 1024, 1))
    }

    /// GF(4096), x^12 + x^6 + x^5 + x^3 + 1: Aztec data, 23-32 layers
    pub fn aztec_data_12() -> &'static GaloisField {
        AZTEC_DATA_12.get_or_init(|| GaloisField::new(0x1069, 4096, 1))
    }

    /// Aztec field for a codeword width in bits
    pub fn for_word_size(bits: usize) -> Option<&'static GaloisField> {
        match bits {
            4 => Some(Self::aztec_param()),
            6 => Some(Self::aztec_data_6()),
            8 => Some(Self::aztec_data_8()),
            10 => Some(Self::aztec_data_10()),
            12 => Some(Self::aztec_data_12()),
            _ => None,
        }
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        self.size
    }

    /// Order of the multiplicative group
    pub fn order(&self) -> usize {
        self.size - 1
    }

    /// Primitive polynomial
    pub fn primitive(&self) -> u32 {
        self.primitive
    }

    /// Exponent of the first generator root
    pub fn generator_base(&self) -> usize {
        self.generator_base
    }

    /// alpha^n
    pub fn exp(&self, n: usize) -> u16 {
        self.exp[n % self.order()]
    }

    /// Discrete logarithm; `None` for zero
    pub fn log(&self, a: u16) -> Option<usize> {
        if a == 0 {
            None
        } else {
            Some(self.log[a as usize] as usize)
        }
    }

    /// Multiplicative inverse; `None` for zero
    pub fn inverse(&self, a: u16) -> Option<u16> {
        self.log(a).map(|l| self.exp[(self.order() - l) % self.order()])
    }

    /// Field multiplication
    pub fn mul(&self, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        let sum = self.log[a as usize] as usize + self.log[b as usize] as usize;
        self.exp[sum % self.order()]
    }

    /// a / b. Division by zero yields zero; callers check the divisor first.
    pub fn div(&self, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        let la = self.log[a as usize] as usize;
        let lb = self.log[b as usize] as usize;
        self.exp[(la + self.order() - lb) % self.order()]
    }

    /// `a` raised to `n`
    pub fn pow(&self, a: u16, n: usize) -> u16 {
        if a == 0 {
            return if n == 0 { 1 } else { 0 };
        }
        let la = self.log[a as usize] as usize;
        self.exp[(la * (n % self.order())) % self.order()]
    }

    /// Evaluate a polynomial with ascending coefficients (index = degree)
    pub fn eval_ascending(&self, poly: &[u16], x: u16) -> u16 {
        poly.iter()
            .rev()
            .fold(0u16, |acc, &coeff| self.mul(acc, x) ^ coeff)
    }

    /// Evaluate a polynomial with descending coefficients (index 0 = highest degree)
    pub fn eval_descending(&self, poly: &[u16], x: u16) -> u16 {
        poly.iter().fold(0u16, |acc, &coeff| self.mul(acc, x) ^ coeff)
    }

    /// Product of two ascending polynomials
    pub fn poly_mul(&self, a: &[u16], b: &[u16]) -> Vec<u16> {
        if a.is_empty() || b.is_empty() {
            return Vec::new();
        }
        let mut out = vec![0u16; a.len() + b.len() - 1];
        for (i, &ai) in a.iter().enumerate() {
            if ai == 0 {
                continue;
            }
            for (j, &bj) in b.iter().enumerate() {
                out[i + j] ^= self.mul(ai, bj);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_primitive(field: &GaloisField) {
        let mut seen = vec![false; field.size()];
        for i in 0..field.order() {
            let v = field.exp(i) as usize;
            assert!(v != 0 && !seen[v], "alpha^{i} repeats in GF({})", field.size());
            seen[v] = true;
        }
    }

    #[test]
    fn test_aztec_fields_are_primitive() {
        assert_primitive(GaloisField::aztec_param());
        assert_primitive(GaloisField::aztec_data_6());
        assert_primitive(GaloisField::aztec_data_8());
        assert_primitive(GaloisField::aztec_data_10());
        assert_primitive(GaloisField::aztec_data_12());
    }

    #[test]
    fn test_basic_arithmetic() {
        let gf = GaloisField::aztec_data_8();
        assert_eq!(gf.mul(0, 5), 0);
        assert_eq!(gf.div(0, 5), 0);
        assert_eq!(gf.div(123, 123), 1);
        for a in 1..256u16 {
            let inv = gf.inverse(a).unwrap();
            assert_eq!(gf.mul(a, inv), 1);
        }
        assert_eq!(gf.inverse(0), None);
    }

    #[test]
    fn test_pow_wraps_at_group_order() {
        let gf = GaloisField::aztec_param();
        assert_eq!(gf.pow(2, 15), 1);
        assert_eq!(gf.pow(2, 16), 2);
        assert_eq!(gf.pow(0, 0), 1);
        assert_eq!(gf.pow(0, 3), 0);
        assert_eq!(gf.exp(4), 0b0011); // x^4 = x + 1
    }

    #[test]
    fn test_polynomial_helpers() {
        let gf = GaloisField::aztec_data_6();
        // (1 + 2x)(1 + 3x) = 1 + (2^3)x + 6x^2
        let p = gf.poly_mul(&[1, 2], &[1, 3]);
        assert_eq!(p, vec![1, 2 ^ 3, gf.mul(2, 3)]);
        let x = 7;
        assert_eq!(
            gf.eval_ascending(&p, x),
            gf.mul(gf.eval_ascending(&[1, 2], x), gf.eval_ascending(&[1, 3], x))
        );
        let mut rev = p.clone();
        rev.reverse();
        assert_eq!(gf.eval_descending(&rev, x), gf.eval_ascending(&p, x));
    }

    #[test]
    fn test_word_size_lookup() {
        assert_eq!(GaloisField::for_word_size(10).unwrap().size(), 1024);
        assert!(GaloisField::for_word_size(7).is_none());
    }
}
