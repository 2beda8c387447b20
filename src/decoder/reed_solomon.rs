//! Reed-Solomon error and erasure correction over the GF(2^m) fields in [`GaloisField`].
//!
//! Codewords are stored highest degree first: `received[0]` is the coefficient
//! of x^(n-1) and the last `ec_count` symbols are the check symbols.

use crate::debug::trace;
use crate::decoder::galois::GaloisField;
use crate::error::CorrectionError;
use rayon::prelude::*;

/// Shape of one interleaved Reed-Solomon block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    /// Data symbols in the block
    pub data: usize,
    /// Check symbols in the block
    pub ec: usize,
}

impl BlockSpec {
    /// Total symbols in the block
    pub fn len(&self) -> usize {
        self.data + self.ec
    }

    /// True for a block with no symbols
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reed-Solomon decoder bound to one field
#[derive(Debug, Clone, Copy)]
pub struct ReedSolomonDecoder {
    field: &'static GaloisField,
}

impl ReedSolomonDecoder {
    /// Create a decoder over `field`
    pub fn new(field: &'static GaloisField) -> Self {
        Self { field }
    }

    /// Correct up to `ec_count / 2` symbol errors in place. Returns the number of
    /// symbols changed.
    ///
    /// Damage beyond capacity is normally reported as
    /// [`CorrectionError::CapacityExceeded`], but a word pushed into the radius of
    /// a different codeword is "corrected" to that codeword; nothing inside one
    /// block can tell the two apart.
    pub fn correct(&self, received: &mut [u16], ec_count: usize) -> Result<usize, CorrectionError> {
        self.correct_with_erasures(received, ec_count, &[])
    }

    /// Correct errors and erasures (known-bad positions) in place. Succeeds
    /// whenever `2 * errors + erasures <= ec_count`.
    pub fn correct_with_erasures(
        &self,
        received: &mut [u16],
        ec_count: usize,
        erasures: &[usize],
    ) -> Result<usize, CorrectionError> {
        let gf = self.field;
        let n = received.len();
        if ec_count > n {
            return Err(CorrectionError::InvalidInput(
                "more check symbols than codewords",
            ));
        }
        if n > gf.order() {
            return Err(CorrectionError::InvalidInput(
                "block longer than the field allows",
            ));
        }
        if received.iter().any(|&s| s as usize >= gf.size()) {
            return Err(CorrectionError::InvalidInput("symbol outside the field"));
        }
        if ec_count == 0 {
            return Ok(0);
        }

        let mut erasures: Vec<usize> = erasures.to_vec();
        erasures.sort_unstable();
        erasures.dedup();
        if erasures.iter().any(|&p| p >= n) {
            return Err(CorrectionError::InvalidInput("erasure position out of range"));
        }
        if erasures.len() > ec_count {
            return Err(CorrectionError::CapacityExceeded { ec_count });
        }

        let syndromes = self.syndromes(received, ec_count);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(0);
        }

        // Erasure locator: prod (1 + X_j x)
        let mut gamma = vec![1u16];
        for &pos in &erasures {
            gamma = gf.poly_mul(&gamma, &[1, self.locator(n, pos)]);
        }

        // Forney syndromes carry only the unknown errors
        let mut modified = gf.poly_mul(&gamma, &syndromes);
        modified.truncate(ec_count);
        let error_locator = self.berlekamp_massey(&modified[erasures.len()..]);
        let errors = degree(&error_locator);
        if 2 * errors + erasures.len() > ec_count {
            trace!(
                "rs: {} errors + {} erasures exceed {} check symbols",
                errors,
                erasures.len(),
                ec_count
            );
            return Err(CorrectionError::CapacityExceeded { ec_count });
        }

        let lambda = gf.poly_mul(&error_locator, &gamma);
        let positions = self.find_error_positions(&lambda, n);
        if positions.len() != degree(&lambda) {
            return Err(CorrectionError::CapacityExceeded { ec_count });
        }

        let mut omega = gf.poly_mul(&syndromes, &lambda);
        omega.truncate(ec_count);
        let values = self.find_error_values(&lambda, &omega, &positions, n)?;

        let mut changed = 0;
        for (&pos, &value) in positions.iter().zip(values.iter()) {
            if value != 0 {
                received[pos] ^= value;
                changed += 1;
            }
        }

        if self.syndromes(received, ec_count).iter().any(|&s| s != 0) {
            return Err(CorrectionError::CapacityExceeded { ec_count });
        }
        Ok(changed)
    }

    /// De-interleave `codewords` into `blocks`, correct each block on its own and
    /// return the data symbols re-assembled in block order, plus the total number
    /// of corrected symbols.
    ///
    /// Interleaving is round-robin: first the data symbols of all blocks, then the
    /// check symbols; blocks that are shorter simply drop out of later rounds.
    pub fn correct_blocks(
        &self,
        codewords: &[u16],
        blocks: &[BlockSpec],
    ) -> Result<(Vec<u16>, usize), CorrectionError> {
        let total: usize = blocks.iter().map(BlockSpec::len).sum();
        if total != codewords.len() {
            return Err(CorrectionError::InvalidInput(
                "block layout does not cover the codewords",
            ));
        }

        let mut split: Vec<Vec<u16>> = blocks.iter().map(|b| Vec::with_capacity(b.len())).collect();
        let mut cursor = codewords.iter();
        let max_data = blocks.iter().map(|b| b.data).max().unwrap_or(0);
        for round in 0..max_data {
            for (block, spec) in split.iter_mut().zip(blocks) {
                if round < spec.data {
                    block.extend(cursor.next());
                }
            }
        }
        let max_ec = blocks.iter().map(|b| b.ec).max().unwrap_or(0);
        for round in 0..max_ec {
            for (block, spec) in split.iter_mut().zip(blocks) {
                if round < spec.ec {
                    block.extend(cursor.next());
                }
            }
        }

        let corrected: Vec<(Vec<u16>, usize)> = split
            .into_par_iter()
            .zip(blocks.par_iter())
            .map(|(mut block, spec)| -> Result<(Vec<u16>, usize), CorrectionError> {
                let fixed = self.correct(&mut block, spec.ec)?;
                block.truncate(spec.data);
                Ok((block, fixed))
            })
            .collect::<Result<_, _>>()?;

        let mut data = Vec::with_capacity(blocks.iter().map(|b| b.data).sum());
        let mut fixed = 0;
        for (block, count) in corrected {
            data.extend(block);
            fixed += count;
        }
        Ok((data, fixed))
    }

    /// X = alpha^(n-1-pos), the locator of position `pos`
    fn locator(&self, n: usize, pos: usize) -> u16 {
        self.field.exp(n - 1 - pos)
    }

    /// S_j = r(alpha^(j + base)) for j in 0..ec_count
    fn syndromes(&self, received: &[u16], ec_count: usize) -> Vec<u16> {
        let gf = self.field;
        (0..ec_count)
            .map(|j| gf.eval_descending(received, gf.exp(j + gf.generator_base())))
            .collect()
    }

    /// Shortest LFSR generating `syndromes`; ascending coefficients, constant term 1
    fn berlekamp_massey(&self, syndromes: &[u16]) -> Vec<u16> {
        let gf = self.field;
        let mut sigma = vec![1u16];
        let mut prev = vec![1u16];
        let mut prev_delta = 1u16;
        let mut l = 0usize;
        let mut m = 1usize;

        for i in 0..syndromes.len() {
            let mut delta = syndromes[i];
            for j in 1..=l.min(sigma.len() - 1) {
                delta ^= gf.mul(sigma[j], syndromes[i - j]);
            }
            if delta == 0 {
                m += 1;
                continue;
            }

            let coef = gf.div(delta, prev_delta);
            let snapshot = sigma.clone();
            if sigma.len() < prev.len() + m {
                sigma.resize(prev.len() + m, 0);
            }
            for (j, &b) in prev.iter().enumerate() {
                sigma[j + m] ^= gf.mul(coef, b);
            }

            if 2 * l <= i {
                l = i + 1 - l;
                prev = snapshot;
                prev_delta = delta;
                m = 1;
            } else {
                m += 1;
            }
        }

        while sigma.len() > 1 && sigma.last() == Some(&0) {
            sigma.pop();
        }
        sigma
    }

    /// Chien search: position i is in error when lambda(X_i^-1) = 0
    fn find_error_positions(&self, lambda: &[u16], n: usize) -> Vec<usize> {
        let gf = self.field;
        (0..n)
            .filter(|&i| {
                let x_inv = gf.exp(gf.order() - (n - 1 - i) % gf.order());
                gf.eval_ascending(lambda, x_inv) == 0
            })
            .collect()
    }

    /// Forney: e = X^(1-base) * omega(X^-1) / lambda'(X^-1)
    fn find_error_values(
        &self,
        lambda: &[u16],
        omega: &[u16],
        positions: &[usize],
        n: usize,
    ) -> Result<Vec<u16>, CorrectionError> {
        let gf = self.field;
        let order = gf.order();

        // Formal derivative: only odd powers survive in characteristic 2
        let derivative: Vec<u16> = lambda
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &c)| if i % 2 == 1 { c } else { 0 })
            .collect();

        let base_shift = (1 + order - gf.generator_base() % order) % order;
        positions
            .iter()
            .map(|&pos| {
                let power = (n - 1 - pos) % order;
                let x_inv = gf.exp(order - power);
                let denominator = gf.eval_ascending(&derivative, x_inv);
                if denominator == 0 {
                    return Err(CorrectionError::CapacityExceeded {
                        ec_count: omega.len(),
                    });
                }
                let numerator = gf.eval_ascending(omega, x_inv);
                let scale = gf.exp(power * base_shift);
                Ok(gf.mul(scale, gf.div(numerator, denominator)))
            })
            .collect()
    }
}

/// Systematic Reed-Solomon encoder, the inverse of [`ReedSolomonDecoder`]
#[derive(Debug, Clone, Copy)]
pub struct ReedSolomonEncoder {
    field: &'static GaloisField,
}

impl ReedSolomonEncoder {
    /// Create an encoder over `field`
    pub fn new(field: &'static GaloisField) -> Self {
        Self { field }
    }

    /// prod (x - alpha^(i + base)), descending coefficients
    fn generator(&self, ec_count: usize) -> Vec<u16> {
        let gf = self.field;
        let mut g = vec![1u16];
        for i in 0..ec_count {
            let root = gf.exp(i + gf.generator_base());
            let mut next = vec![0u16; g.len() + 1];
            for (j, &c) in g.iter().enumerate() {
                next[j] ^= c;
                next[j + 1] ^= gf.mul(c, root);
            }
            g = next;
        }
        g
    }

    /// Check symbols for `data`
    pub fn check_symbols(&self, data: &[u16], ec_count: usize) -> Vec<u16> {
        if ec_count == 0 {
            return Vec::new();
        }
        let gf = self.field;
        let g = self.generator(ec_count);
        let mut remainder = vec![0u16; ec_count];
        for &d in data {
            let factor = d ^ remainder[0];
            remainder.rotate_left(1);
            remainder[ec_count - 1] = 0;
            for (r, &coeff) in remainder.iter_mut().zip(&g[1..]) {
                *r ^= gf.mul(coeff, factor);
            }
        }
        remainder
    }

    /// Fill the last `ec_count` symbols of `codeword` from the symbols before them
    pub fn encode_in_place(&self, codeword: &mut [u16], ec_count: usize) {
        let split = codeword.len().saturating_sub(ec_count);
        let check = self.check_symbols(&codeword[..split], ec_count);
        codeword[split..].copy_from_slice(&check);
    }

    /// Encode `data` split over `blocks` and interleave the result the way
    /// [`ReedSolomonDecoder::correct_blocks`] expects
    pub fn encode_blocks(&self, data: &[u16], blocks: &[BlockSpec]) -> Vec<u16> {
        let mut offset = 0;
        let encoded: Vec<Vec<u16>> = blocks
            .iter()
            .map(|spec| {
                let chunk = &data[offset..(offset + spec.data).min(data.len())];
                offset += spec.data;
                let mut block = chunk.to_vec();
                block.extend(self.check_symbols(chunk, spec.ec));
                block
            })
            .collect();

        let mut out = Vec::with_capacity(encoded.iter().map(Vec::len).sum());
        let max_data = blocks.iter().map(|b| b.data).max().unwrap_or(0);
        for round in 0..max_data {
            for (block, spec) in encoded.iter().zip(blocks) {
                if round < spec.data {
                    out.push(block[round]);
                }
            }
        }
        let max_ec = blocks.iter().map(|b| b.ec).max().unwrap_or(0);
        for round in 0..max_ec {
            for (block, spec) in encoded.iter().zip(blocks) {
                if round < spec.ec {
                    out.push(block[spec.data + round]);
                }
            }
        }
        out
    }
}

fn degree(poly: &[u16]) -> usize {
    poly.iter().rposition(|&c| c != 0).unwrap_or(0)
}
