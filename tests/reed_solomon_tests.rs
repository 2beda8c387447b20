//! Reed-Solomon capacity properties over the Aztec fields

use proptest::prelude::*;
use proptest::sample::Index;
use rust_barcode::CorrectionError;
use rust_barcode::decoder::galois::GaloisField;
use rust_barcode::decoder::reed_solomon::{ReedSolomonDecoder, ReedSolomonEncoder};
use std::collections::BTreeSet;

fn codeword(field: &'static GaloisField, data: &[u16], ec_count: usize) -> Vec<u16> {
    let mut word = data.to_vec();
    word.extend(ReedSolomonEncoder::new(field).check_symbols(data, ec_count));
    word
}

fn is_codeword(field: &'static GaloisField, word: &[u16], ec_count: usize) -> bool {
    let split = word.len() - ec_count;
    ReedSolomonEncoder::new(field).check_symbols(&word[..split], ec_count) == word[split..]
}

fn positions(picks: &[Index], len: usize, limit: usize) -> Vec<usize> {
    let unique: BTreeSet<usize> = picks.iter().map(|p| p.index(len)).collect();
    unique.into_iter().take(limit).collect()
}

proptest! {
    #[test]
    fn prop_corrects_within_capacity(
        data in proptest::collection::vec(0u16..64, 1..30),
        ec_count in 2usize..24,
        picks in proptest::collection::vec(any::<Index>(), 0..12),
        noise in proptest::collection::vec(1u16..64, 12),
    ) {
        let field = GaloisField::for_word_size(6).expect("GF(64)");
        let clean = codeword(field, &data, ec_count);
        let errors = positions(&picks, clean.len(), ec_count / 2);

        let mut received = clean.clone();
        for (&at, &flip) in errors.iter().zip(&noise) {
            received[at] ^= flip;
        }
        let fixed = ReedSolomonDecoder::new(field).correct(&mut received, ec_count);
        prop_assert_eq!(fixed, Ok(errors.len()));
        prop_assert_eq!(received, clean);
    }

    #[test]
    fn prop_corrects_erasures(
        data in proptest::collection::vec(0u16..256, 1..60),
        ec_count in 2usize..30,
        picks in proptest::collection::vec(any::<Index>(), 0..30),
        noise in proptest::collection::vec(1u16..256, 30),
    ) {
        let field = GaloisField::for_word_size(8).expect("GF(256)");
        let clean = codeword(field, &data, ec_count);
        let erasures = positions(&picks, clean.len(), ec_count);

        let mut received = clean.clone();
        for (&at, &flip) in erasures.iter().zip(&noise) {
            received[at] ^= flip;
        }
        let fixed = ReedSolomonDecoder::new(field)
            .correct_with_erasures(&mut received, ec_count, &erasures);
        prop_assert!(fixed.is_ok());
        prop_assert_eq!(received, clean);
    }

    #[test]
    fn prop_beyond_capacity_fails_or_lands_on_a_codeword(
        data in proptest::collection::vec(0u16..16, 2..6),
        ec_count in 2usize..8,
        noise in proptest::collection::vec(1u16..16, 8),
    ) {
        let field = GaloisField::for_word_size(4).expect("GF(16)");
        let clean = codeword(field, &data, ec_count);
        let errors = (ec_count / 2 + 1).min(clean.len());

        let mut received = clean.clone();
        for (at, &flip) in noise.iter().take(errors).enumerate() {
            received[at] ^= flip;
        }
        match ReedSolomonDecoder::new(field).correct(&mut received, ec_count) {
            Ok(_) => prop_assert!(is_codeword(field, &received, ec_count)),
            Err(err) => prop_assert_eq!(err, CorrectionError::CapacityExceeded { ec_count }),
        }
    }
}

#[test]
fn test_twelve_bit_field() {
    let field = GaloisField::for_word_size(12).expect("GF(4096)");
    let data: Vec<u16> = (0..400u16).map(|i| (i * 97) & 0x0fff).collect();
    let clean = codeword(field, &data, 120);
    let mut received = clean.clone();
    for i in 0..60 {
        received[i * 8] ^= 0x0abc;
    }
    assert_eq!(
        ReedSolomonDecoder::new(field).correct(&mut received, 120),
        Ok(60)
    );
    assert_eq!(received, clean);
}
